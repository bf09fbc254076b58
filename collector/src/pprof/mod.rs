//! pprof ingestion: decode, classify and extract metrics
//!
//! Extraction is a pure function of the input bytes; nothing is retained
//! between calls.

pub mod decode;
pub mod detect;
pub mod extract;
pub mod proto;

use perfkit_shared::{MetricsRecord, ProfileKind};
use tracing::debug;

use crate::aggregate::saturating_sum;

pub use decode::{decode, DecodeError, DecodedProfile, SampleType};
pub use detect::detect_kind;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("{0} profiles cannot be extracted from pprof data")]
    UnsupportedKind(ProfileKind),
}

/// Result of extracting one pprof buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedProfile {
    pub kind: ProfileKind,
    pub duration_ns: i64,
    pub total_samples: i64,
    /// Sum of the first value column across samples.
    pub total_value: i64,
    pub metrics: MetricsRecord,
}

/// Decode `data` and build the metrics record for its kind.
///
/// `hint` bypasses detection when the caller already knows what was
/// captured.
pub fn extract_profile(
    data: &[u8],
    hint: Option<ProfileKind>,
) -> Result<ExtractedProfile, ExtractError> {
    if let Some(kind @ (ProfileKind::Gc | ProfileKind::K6)) = hint {
        return Err(ExtractError::UnsupportedKind(kind));
    }

    let profile = decode(data)?;
    let kind = hint.unwrap_or_else(|| detect_kind(&profile.sample_types));
    let metrics = extract_metrics(&profile, kind)?;

    let total_value = saturating_sum(profile.samples.iter().map(|s| s.value(0)));
    debug!(
        kind = %kind,
        samples = profile.samples.len(),
        total_value,
        detected = hint.is_none(),
        "extracted pprof profile"
    );

    Ok(ExtractedProfile {
        kind,
        duration_ns: profile.duration_nanos,
        total_samples: profile.samples.len() as i64,
        total_value,
        metrics,
    })
}

/// Run the extractor for `kind` over an already decoded profile.
pub fn extract_metrics(
    profile: &DecodedProfile,
    kind: ProfileKind,
) -> Result<MetricsRecord, ExtractError> {
    let record = match kind {
        ProfileKind::Cpu => MetricsRecord::Cpu(extract::cpu(profile)),
        ProfileKind::Heap => MetricsRecord::Heap(extract::heap(profile)),
        ProfileKind::Allocs => MetricsRecord::Allocs(extract::heap(profile)),
        ProfileKind::Mutex => MetricsRecord::Mutex(extract::mutex(profile)),
        ProfileKind::Block => MetricsRecord::Block(extract::block(profile)),
        ProfileKind::Goroutine => MetricsRecord::Goroutine(extract::goroutine(profile)),
        ProfileKind::ThreadCreate => MetricsRecord::ThreadCreate(extract::threadcreate(profile)),
        ProfileKind::Gc | ProfileKind::K6 => return Err(ExtractError::UnsupportedKind(kind)),
    };
    Ok(record)
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Small pprof buffers for tests.

    use super::proto;
    use prost::Message;

    /// Encode a profile with one single-function location per name in
    /// `funcs`; samples reference locations by position in `funcs`.
    pub fn encode(
        types: &[(&str, &str)],
        funcs: &[&str],
        samples: Vec<(Vec<i64>, Vec<usize>)>,
        duration_nanos: i64,
    ) -> Vec<u8> {
        let mut strings = vec![String::new()];
        let mut intern = |s: &str| -> i64 {
            match strings.iter().position(|x| x == s) {
                Some(i) => i as i64,
                None => {
                    strings.push(s.to_string());
                    (strings.len() - 1) as i64
                }
            }
        };

        let sample_type = types
            .iter()
            .map(|(t, u)| proto::ValueType {
                r#type: intern(t),
                unit: intern(u),
            })
            .collect();
        let function: Vec<proto::Function> = funcs
            .iter()
            .enumerate()
            .map(|(i, name)| proto::Function {
                id: i as u64 + 1,
                name: intern(name),
                ..Default::default()
            })
            .collect();
        let location = (0..funcs.len())
            .map(|i| proto::Location {
                id: i as u64 + 1,
                line: vec![proto::Line {
                    function_id: i as u64 + 1,
                    line: 1,
                }],
                ..Default::default()
            })
            .collect();
        let sample = samples
            .into_iter()
            .map(|(values, locs)| proto::Sample {
                location_id: locs.into_iter().map(|l| l as u64 + 1).collect(),
                value: values,
            })
            .collect();

        proto::Profile {
            sample_type,
            sample,
            location,
            function,
            string_table: strings,
            duration_nanos,
            ..Default::default()
        }
        .encode_to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::encode;
    use super::*;

    fn cpu_profile() -> Vec<u8> {
        encode(
            &[("samples", "count"), ("cpu", "nanoseconds")],
            &["main.work", "main.main"],
            vec![(vec![2, 20_000_000], vec![0, 1]), (vec![1, 10_000_000], vec![1])],
            5_000_000_000,
        )
    }

    #[test]
    fn test_extract_detected_cpu() {
        let out = extract_profile(&cpu_profile(), None).unwrap();
        assert_eq!(out.kind, ProfileKind::Cpu);
        assert_eq!(out.duration_ns, 5_000_000_000);
        assert_eq!(out.total_samples, 2);
        assert_eq!(out.total_value, 3);
        match out.metrics {
            MetricsRecord::Cpu(m) => assert_eq!(m.total_cpu_time_ns, 30_000_000),
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_hint_overrides_detection() {
        let bytes = encode(
            &[("alloc_objects", "count"), ("alloc_space", "bytes")],
            &["f"],
            vec![(vec![1, 64], vec![0])],
            0,
        );
        let detected = extract_profile(&bytes, None).unwrap();
        assert_eq!(detected.kind, ProfileKind::Heap);

        let hinted = extract_profile(&bytes, Some(ProfileKind::Allocs)).unwrap();
        assert_eq!(hinted.kind, ProfileKind::Allocs);
        assert_eq!(hinted.metrics.kind(), ProfileKind::Allocs);
    }

    #[test]
    fn test_threadcreate_hint() {
        let bytes = encode(&[("threadcreate", "count")], &["f"], vec![(vec![1], vec![0])], 0);
        let out = extract_profile(&bytes, Some(ProfileKind::ThreadCreate)).unwrap();
        assert!(matches!(out.metrics, MetricsRecord::ThreadCreate(ref m) if m.thread_count == 1));
    }

    #[test]
    fn test_unsupported_hints() {
        for kind in [ProfileKind::Gc, ProfileKind::K6] {
            let err = extract_profile(&cpu_profile(), Some(kind)).unwrap_err();
            assert!(matches!(err, ExtractError::UnsupportedKind(k) if k == kind));
        }
    }

    #[test]
    fn test_decode_failure_surfaces() {
        let err = extract_profile(b"\x0a\xff\xff", None).unwrap_err();
        assert!(matches!(err, ExtractError::Decode(_)));
    }

    #[test]
    fn test_overflowing_profile_extracts() {
        let bytes = encode(
            &[("cpu", "nanoseconds")],
            &["f"],
            vec![(vec![i64::MAX], vec![0]), (vec![1], vec![0])],
            0,
        );
        let out = extract_profile(&bytes, None).unwrap();
        assert_eq!(out.total_value, i64::MAX);
        assert_eq!(out.total_samples, 2);
        match out.metrics {
            MetricsRecord::Cpu(m) => assert_eq!(m.total_cpu_time_ns, i64::MAX),
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let bytes = cpu_profile();
        let a = extract_profile(&bytes, None).unwrap();
        let b = extract_profile(&bytes, None).unwrap();
        assert_eq!(a, b);
    }
}
