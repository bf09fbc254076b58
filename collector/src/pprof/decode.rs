//! Decoding of raw pprof buffers into a resolved, immutable profile.

use flate2::read::GzDecoder;
use prost::Message;
use std::collections::HashMap;
use std::io::Read;

use super::proto;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("empty profile")]
    Empty,

    #[error("gzip decompression failed: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("malformed profile: {0}")]
    Protobuf(#[from] prost::DecodeError),

    #[error("malformed profile: string_table[0] must be empty")]
    StringTableHead,

    #[error("malformed profile: string index {0} out of range")]
    StringIndex(i64),

    #[error("malformed profile: location id {0} not found")]
    UnknownLocation(u64),

    #[error("malformed profile: function id {0} not found")]
    UnknownFunction(u64),
}

/// Type and unit of one sample value column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleType {
    pub name: String,
    pub unit: String,
}

/// A code location and the functions inlined at it, innermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub functions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// One value per sample type, by position.
    pub values: Vec<i64>,
    /// Indices into [`DecodedProfile::locations`], leaf first.
    pub locations: Vec<usize>,
}

impl Sample {
    /// Value at `index`, or 0 when the sample does not carry that column.
    pub fn value(&self, index: usize) -> i64 {
        self.values.get(index).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedProfile {
    pub sample_types: Vec<SampleType>,
    pub samples: Vec<Sample>,
    pub locations: Vec<Location>,
    pub duration_nanos: i64,
}

impl DecodedProfile {
    /// Position of the first sample type named `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.sample_types.iter().position(|st| st.name == name)
    }

    /// Function names along a sample's stack, leaf first. A function that
    /// appears at several frames is yielded once per frame.
    pub fn frames<'a>(&'a self, sample: &'a Sample) -> impl Iterator<Item = &'a str> + 'a {
        sample
            .locations
            .iter()
            .flat_map(move |&i| self.locations[i].functions.iter().map(String::as_str))
    }
}

/// Decode a possibly gzip-compressed pprof buffer.
pub fn decode(data: &[u8]) -> Result<DecodedProfile, DecodeError> {
    if data.is_empty() {
        return Err(DecodeError::Empty);
    }

    let raw = if data.starts_with(&GZIP_MAGIC) {
        let mut out = Vec::new();
        GzDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(DecodeError::Decompress)?;
        out
    } else {
        data.to_vec()
    };

    let profile = proto::Profile::decode(raw.as_slice())?;
    resolve(profile)
}

fn resolve(p: proto::Profile) -> Result<DecodedProfile, DecodeError> {
    if p.string_table.first().is_some_and(|s| !s.is_empty()) {
        return Err(DecodeError::StringTableHead);
    }
    let strings = &p.string_table;
    let string = |index: i64| -> Result<String, DecodeError> {
        // an empty table still resolves index 0 to ""
        if index == 0 && strings.is_empty() {
            return Ok(String::new());
        }
        usize::try_from(index)
            .ok()
            .and_then(|i| strings.get(i))
            .cloned()
            .ok_or(DecodeError::StringIndex(index))
    };
    let value_type = |vt: &proto::ValueType| -> Result<SampleType, DecodeError> {
        Ok(SampleType {
            name: string(vt.r#type)?,
            unit: string(vt.unit)?,
        })
    };

    let sample_types = p
        .sample_type
        .iter()
        .map(value_type)
        .collect::<Result<Vec<_>, _>>()?;

    let mut functions: HashMap<u64, String> = HashMap::with_capacity(p.function.len());
    for f in &p.function {
        functions.insert(f.id, string(f.name)?);
    }

    let mut location_index: HashMap<u64, usize> = HashMap::with_capacity(p.location.len());
    let mut locations = Vec::with_capacity(p.location.len());
    for loc in &p.location {
        let mut names = Vec::with_capacity(loc.line.len());
        for line in &loc.line {
            // function_id 0 means the line has no function information
            if line.function_id == 0 {
                continue;
            }
            let name = functions
                .get(&line.function_id)
                .ok_or(DecodeError::UnknownFunction(line.function_id))?;
            names.push(name.clone());
        }
        location_index.insert(loc.id, locations.len());
        locations.push(Location { functions: names });
    }

    let samples = p
        .sample
        .into_iter()
        .map(|s| -> Result<Sample, DecodeError> {
            let locations = s
                .location_id
                .iter()
                .map(|id| {
                    location_index
                        .get(id)
                        .copied()
                        .ok_or(DecodeError::UnknownLocation(*id))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Sample {
                values: s.value,
                locations,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DecodedProfile {
        sample_types,
        samples,
        locations,
        duration_nanos: p.duration_nanos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn fixture() -> proto::Profile {
        proto::Profile {
            sample_type: vec![proto::ValueType { r#type: 1, unit: 2 }],
            sample: vec![proto::Sample {
                location_id: vec![10, 20],
                value: vec![7],
            }],
            location: vec![
                proto::Location {
                    id: 10,
                    line: vec![proto::Line { function_id: 1, line: 3 }],
                    ..Default::default()
                },
                proto::Location {
                    id: 20,
                    line: vec![
                        proto::Line { function_id: 2, line: 9 },
                        proto::Line { function_id: 0, line: 0 },
                    ],
                    ..Default::default()
                },
            ],
            function: vec![
                proto::Function { id: 1, name: 3, ..Default::default() },
                proto::Function { id: 2, name: 4, ..Default::default() },
            ],
            string_table: vec![
                String::new(),
                "samples".to_string(),
                "count".to_string(),
                "main.leaf".to_string(),
                "main.main".to_string(),
            ],
            duration_nanos: 1_000,
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_plain() {
        let bytes = fixture().encode_to_vec();
        let profile = decode(&bytes).unwrap();
        assert_eq!(profile.sample_types[0].name, "samples");
        assert_eq!(profile.sample_types[0].unit, "count");
        assert_eq!(profile.duration_nanos, 1_000);
        let sample = &profile.samples[0];
        let frames: Vec<_> = profile.frames(sample).collect();
        assert_eq!(frames, vec!["main.leaf", "main.main"]);
        assert_eq!(sample.value(0), 7);
        assert_eq!(sample.value(3), 0);
    }

    #[test]
    fn test_decode_gzip() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&fixture().encode_to_vec()).unwrap();
        let bytes = enc.finish().unwrap();
        let profile = decode(&bytes).unwrap();
        assert_eq!(profile.samples.len(), 1);
    }

    #[test]
    fn test_decode_empty() {
        assert!(matches!(decode(&[]), Err(DecodeError::Empty)));
    }

    #[test]
    fn test_decode_corrupt_gzip() {
        let bytes = [0x1f, 0x8b, 0x08, 0x00, 0xde, 0xad];
        assert!(matches!(decode(&bytes), Err(DecodeError::Decompress(_))));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode(b"definitely not a profile").is_err());
    }

    #[test]
    fn test_unknown_location() {
        let mut p = fixture();
        p.sample[0].location_id.push(99);
        let err = decode(&p.encode_to_vec()).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownLocation(99)));
    }

    #[test]
    fn test_unknown_function() {
        let mut p = fixture();
        p.location[0].line[0].function_id = 42;
        let err = decode(&p.encode_to_vec()).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownFunction(42)));
    }

    #[test]
    fn test_string_table_head_must_be_empty() {
        let mut p = fixture();
        p.string_table[0] = "oops".to_string();
        let err = decode(&p.encode_to_vec()).unwrap_err();
        assert!(matches!(err, DecodeError::StringTableHead));
    }

    #[test]
    fn test_string_index_out_of_range() {
        let mut p = fixture();
        p.function[0].name = 77;
        let err = decode(&p.encode_to_vec()).unwrap_err();
        assert!(matches!(err, DecodeError::StringIndex(77)));
    }

    #[test]
    fn test_recursive_frames_repeat() {
        let mut p = fixture();
        p.sample[0].location_id = vec![10, 20, 10];
        let profile = decode(&p.encode_to_vec()).unwrap();
        let frames: Vec<_> = profile.frames(&profile.samples[0]).collect();
        assert_eq!(frames, vec!["main.leaf", "main.main", "main.leaf"]);
    }
}
