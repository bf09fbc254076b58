//! Building stored records from uploads
//!
//! Decoding and extraction happen here; persistence is left to the caller.

use crate::config::CollectorConfig;
use crate::k6::{extract_k6_summary, K6ParseError};
use crate::pprof::{extract_profile, ExtractError};
use crate::store::StoredProfile;
use chrono::{DateTime, Utc};
use perfkit_shared::utils::time::{default_profile_name, millis_to_nanos};
use perfkit_shared::{MetricsRecord, ProfileKind, UnknownKind};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    InvalidKind(#[from] UnknownKind),

    #[error("failed to parse pprof: {0}")]
    Extract(#[from] ExtractError),

    #[error("failed to parse k6 summary: {0}")]
    K6(#[from] K6ParseError),
}

/// Upload metadata carried in the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestParams {
    /// Explicit kind; detected from the profile when absent.
    pub kind: Option<ProfileKind>,
    pub name: Option<String>,
    pub project: Option<String>,
    pub session: Option<String>,
    pub source: Option<String>,
    pub tags: Vec<String>,
    pub cumulative: bool,
}

impl IngestParams {
    /// Parse `type`, `name`, `project`, `session`, `source`, repeated `tag`
    /// and `cumulative=true`. Empty values count as absent.
    pub fn from_query(query: Option<&str>) -> Result<Self, IngestError> {
        let mut params = Self::default();
        let Some(query) = query else {
            return Ok(params);
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            let value = value.into_owned();
            match key.as_ref() {
                "type" => params.kind = Some(value.parse()?),
                "name" => params.name = Some(value),
                "project" => params.project = Some(value),
                "session" => params.session = Some(value),
                "source" => params.source = Some(value),
                "tag" => params.tags.push(value),
                "cumulative" => params.cumulative = value == "true",
                _ => {}
            }
        }
        Ok(params)
    }

    fn tags(&self, config: &CollectorConfig) -> Vec<String> {
        config
            .default_tags
            .iter()
            .chain(self.tags.iter())
            .cloned()
            .collect()
    }
}

/// Extract a pprof upload into a record ready to save.
pub fn pprof_record(
    params: &IngestParams,
    body: Vec<u8>,
    config: &CollectorConfig,
    now: DateTime<Utc>,
) -> Result<StoredProfile, IngestError> {
    let extracted = extract_profile(&body, params.kind)?;
    let kind = extracted.kind;

    Ok(StoredProfile {
        id: uuid::Uuid::new_v4().to_string(),
        created_at: now,
        name: params
            .name
            .clone()
            .unwrap_or_else(|| default_profile_name(kind.as_str(), now)),
        kind,
        project: params.project.clone().unwrap_or_else(|| config.project.clone()),
        session: params.session.clone(),
        tags: params.tags(config),
        source: params.source.clone(),
        raw_size: body.len(),
        is_cumulative: params.cumulative || kind.is_cumulative(),
        duration_ns: extracted.duration_ns,
        total_samples: extracted.total_samples,
        total_value: extracted.total_value,
        metrics: extracted.metrics,
        raw: body,
    })
}

/// Parse a k6 summary upload into a record ready to save.
pub fn k6_record(
    params: &IngestParams,
    body: Vec<u8>,
    config: &CollectorConfig,
    now: DateTime<Utc>,
) -> Result<StoredProfile, IngestError> {
    let extracted = extract_k6_summary(&body)?;
    let kind = ProfileKind::K6;

    Ok(StoredProfile {
        id: uuid::Uuid::new_v4().to_string(),
        created_at: now,
        name: params
            .name
            .clone()
            .unwrap_or_else(|| default_profile_name(kind.as_str(), now)),
        kind,
        project: params.project.clone().unwrap_or_else(|| config.project.clone()),
        session: params.session.clone(),
        tags: params.tags(config),
        source: params.source.clone(),
        raw_size: body.len(),
        is_cumulative: false,
        duration_ns: extracted.duration_ms.map(millis_to_nanos).unwrap_or(0),
        total_samples: 0,
        total_value: 0,
        metrics: MetricsRecord::K6(extracted.metrics),
        raw: body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> CollectorConfig {
        CollectorConfig {
            project: "shop".to_string(),
            default_tags: vec!["ci".to_string()],
            ..CollectorConfig::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap()
    }

    #[test]
    fn test_params_from_query() {
        let params = IngestParams::from_query(Some(
            "type=heap&name=before%20load&session=s1&tag=a&tag=b&cumulative=true&project=",
        ))
        .unwrap();
        assert_eq!(params.kind, Some(ProfileKind::Heap));
        assert_eq!(params.name.as_deref(), Some("before load"));
        assert_eq!(params.session.as_deref(), Some("s1"));
        assert_eq!(params.project, None);
        assert_eq!(params.tags, vec!["a", "b"]);
        assert!(params.cumulative);
    }

    #[test]
    fn test_params_reject_unknown_kind() {
        let err = IngestParams::from_query(Some("type=disk")).unwrap_err();
        assert_eq!(err.to_string(), "invalid profile type: disk");
    }

    #[test]
    fn test_params_without_query() {
        assert_eq!(IngestParams::from_query(None).unwrap(), IngestParams::default());
    }

    #[test]
    fn test_k6_record_defaults() {
        let body = br#"{"root_group":{"duration":2500},"metrics":{"http_reqs":{"values":{"count":10,"rate":4}}}}"#;
        let params = IngestParams {
            tags: vec!["run1".to_string()],
            ..IngestParams::default()
        };
        let record = k6_record(&params, body.to_vec(), &config(), now()).unwrap();
        assert_eq!(record.kind, ProfileKind::K6);
        assert_eq!(record.name, "k6-20240301-123005");
        assert_eq!(record.project, "shop");
        assert_eq!(record.tags, vec!["ci", "run1"]);
        assert_eq!(record.duration_ns, 2_500_000_000);
        assert_eq!(record.raw_size, body.len());
        match record.metrics {
            MetricsRecord::K6(m) => assert_eq!(m.total_requests, Some(10)),
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_k6_record_rejects_malformed_json() {
        let err = k6_record(&IngestParams::default(), b"{".to_vec(), &config(), now()).unwrap_err();
        assert!(matches!(err, IngestError::K6(_)));
    }

    #[test]
    fn test_pprof_record_rejects_garbage() {
        let err = pprof_record(&IngestParams::default(), Vec::new(), &config(), now()).unwrap_err();
        assert!(matches!(err, IngestError::Extract(_)));
    }

    #[test]
    fn test_pprof_record_cumulative_from_kind() {
        let body = crate::pprof::fixtures::encode(
            &[("contentions", "count"), ("delay", "nanoseconds")],
            &["f"],
            vec![(vec![1, 100], vec![0])],
            0,
        );
        let params = IngestParams {
            kind: Some(ProfileKind::Block),
            project: Some("api".to_string()),
            ..IngestParams::default()
        };
        let record = pprof_record(&params, body, &config(), now()).unwrap();
        assert_eq!(record.kind, ProfileKind::Block);
        assert!(record.is_cumulative);
        assert_eq!(record.project, "api");
        assert_eq!(record.name, "block-20240301-123005");
        assert_eq!(record.total_value, 1);
    }
}
