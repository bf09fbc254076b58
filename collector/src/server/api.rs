//! REST API.
//! Serves ingestion, listing, lookup and comparison of profiles as JSON with CORS.

use super::AppState;
use crate::ingest::{self, IngestParams};
use crate::metrics::{COMPARE_TOTAL, INGEST_BYTES, INGEST_DURATION, INGEST_TOTAL};
use crate::store::{ProfileFilter, StoreError, StoredProfile};
use chrono::Utc;
use hyper::body::HttpBody;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, CONTENT_DISPOSITION, CONTENT_TYPE,
};
use hyper::{Body, Method, Request, Response, StatusCode};
use perfkit_shared::{compare_records, CompareError, ProfileKind};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

fn json_response<T: Serialize>(body: &T, status: StatusCode) -> Response<Body> {
    let (body, status) = match serde_json::to_vec(body) {
        Ok(bytes) => (bytes, status),
        Err(e) => {
            tracing::error!("response serialization failed: {}", e);
            (
                br#"{"error":"response serialization failed"}"#.to_vec(),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    };
    let mut res = Response::new(Body::from(body));
    *res.status_mut() = status;
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    add_cors_headers(res)
}

fn error_response(message: impl std::fmt::Display, status: StatusCode) -> Response<Body> {
    json_response(&serde_json::json!({ "error": message.to_string() }), status)
}

fn cors_preflight() -> Response<Body> {
    let mut res = Response::new(Body::empty());
    *res.status_mut() = StatusCode::NO_CONTENT;
    let headers = res.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    res
}

fn add_cors_headers(mut res: Response<Body>) -> Response<Body> {
    res.headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    res
}

fn store_error(e: StoreError) -> Response<Body> {
    let status = match e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    error_response(e, status)
}

fn query_map(req: &Request<Body>) -> HashMap<String, String> {
    req.uri()
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Non-empty query value.
fn param<'a>(query: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    query.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

fn kind_param(query: &HashMap<String, String>) -> Result<Option<ProfileKind>, Response<Body>> {
    param(query, "type")
        .map(|t| t.parse::<ProfileKind>())
        .transpose()
        .map_err(|e| error_response(e, StatusCode::BAD_REQUEST))
}

#[derive(Debug)]
enum BodyError {
    TooLarge(usize),
    Read(hyper::Error),
}

/// Collect a request body, refusing anything over `limit` bytes.
async fn read_body(mut body: Body, limit: usize) -> Result<Vec<u8>, BodyError> {
    let mut out = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk.map_err(BodyError::Read)?;
        if out.len() + chunk.len() > limit {
            return Err(BodyError::TooLarge(limit));
        }
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Upload {
    Pprof,
    K6,
}

impl Upload {
    fn as_str(&self) -> &'static str {
        match self {
            Upload::Pprof => "pprof",
            Upload::K6 => "k6",
        }
    }
}

pub async fn handle_api(req: Request<Body>, state: &AppState) -> Response<Body> {
    if req.method() == Method::OPTIONS {
        return cors_preflight();
    }

    let (path, method) = (req.uri().path().to_string(), req.method().clone());

    match (method, path.as_str()) {
        (Method::POST, "/api/pprof/ingest") => ingest(req, state, Upload::Pprof).await,
        (Method::POST, "/api/k6/ingest") => ingest(req, state, Upload::K6).await,
        (Method::GET, "/api/profiles") => list_profiles(&req, state).await,
        (Method::GET, "/api/profiles/compare") => compare(&req, state).await,
        (Method::GET, "/api/sessions") => match state.store.sessions().await {
            Ok(sessions) => json_response(&sessions, StatusCode::OK),
            Err(e) => store_error(e),
        },
        (Method::GET, p) => {
            if let Some(id) = p.strip_prefix("/api/profiles/").filter(|id| !id.contains('/')) {
                return get_profile(&req, state, id).await;
            }
            if let Some(name) = p
                .strip_prefix("/api/sessions/")
                .and_then(|rest| rest.strip_suffix("/profiles"))
            {
                let name = percent_encoding::percent_decode_str(name).decode_utf8_lossy();
                return session_profiles(state, &name).await;
            }
            error_response(format!("no route for {}", p), StatusCode::NOT_FOUND)
        }
        (_, p) => error_response(
            format!("method not allowed on {}", p),
            StatusCode::METHOD_NOT_ALLOWED,
        ),
    }
}

async fn ingest(req: Request<Body>, state: &AppState, upload: Upload) -> Response<Body> {
    let params = match IngestParams::from_query(req.uri().query()) {
        Ok(p) => p,
        Err(e) => {
            INGEST_TOTAL.with_label_values(&["unknown", "rejected"]).inc();
            return error_response(e, StatusCode::BAD_REQUEST);
        }
    };
    let kind_label = match upload {
        Upload::K6 => ProfileKind::K6.as_str(),
        Upload::Pprof => params.kind.map_or("detect", |k| k.as_str()),
    };

    let body = match read_body(req.into_body(), state.config.max_upload_bytes()).await {
        Ok(b) => b,
        Err(BodyError::TooLarge(limit)) => {
            INGEST_TOTAL.with_label_values(&[kind_label, "too_large"]).inc();
            return error_response(
                format!("upload exceeds {} bytes", limit),
                StatusCode::PAYLOAD_TOO_LARGE,
            );
        }
        Err(BodyError::Read(e)) => {
            INGEST_TOTAL.with_label_values(&[kind_label, "rejected"]).inc();
            return error_response(format!("failed to read body: {}", e), StatusCode::BAD_REQUEST);
        }
    };
    let size = body.len();

    let started = Instant::now();
    let now = Utc::now();
    let built = match upload {
        Upload::Pprof => ingest::pprof_record(&params, body, &state.config, now),
        Upload::K6 => ingest::k6_record(&params, body, &state.config, now),
    };
    INGEST_DURATION
        .with_label_values(&[upload.as_str()])
        .observe(started.elapsed().as_secs_f64());

    let record = match built {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(upload = upload.as_str(), size, "ingestion rejected: {}", e);
            INGEST_TOTAL.with_label_values(&[kind_label, "rejected"]).inc();
            return error_response(e, StatusCode::BAD_REQUEST);
        }
    };

    let (id, kind, name) = (record.id.clone(), record.kind, record.name.clone());
    if let Err(e) = state.store.save(record).await {
        tracing::error!("failed to save profile: {}", e);
        INGEST_TOTAL.with_label_values(&[kind.as_str(), "error"]).inc();
        return error_response("failed to save profile", StatusCode::INTERNAL_SERVER_ERROR);
    }

    INGEST_TOTAL.with_label_values(&[kind.as_str(), "ok"]).inc();
    INGEST_BYTES.inc_by(size as f64);
    tracing::info!(%id, %kind, size, "profile ingested");

    json_response(
        &serde_json::json!({
            "id": id,
            "kind": kind,
            "name": name,
            "message": "Profile ingested successfully",
        }),
        StatusCode::OK,
    )
}

async fn list_profiles(req: &Request<Body>, state: &AppState) -> Response<Body> {
    let query = query_map(req);
    let kind = match kind_param(&query) {
        Ok(k) => k,
        Err(res) => return res,
    };

    let mut filter = ProfileFilter {
        kind,
        project: param(&query, "project").map(str::to_string),
        session: param(&query, "session").map(str::to_string),
        ..ProfileFilter::default()
    };
    if let Some(n) = param(&query, "limit").and_then(|v| v.parse::<usize>().ok()) {
        if n > 0 {
            filter.limit = n;
        }
    }
    if let Some(n) = param(&query, "offset").and_then(|v| v.parse::<usize>().ok()) {
        filter.offset = n;
    }

    match state.store.list(&filter).await {
        Ok(profiles) => json_response(&profiles, StatusCode::OK),
        Err(e) => store_error(e),
    }
}

async fn get_profile(req: &Request<Body>, state: &AppState, id: &str) -> Response<Body> {
    let profile = match state.store.get(id).await {
        Ok(p) => p,
        Err(e) => return store_error(e),
    };

    if param(&query_map(req), "raw") == Some("true") {
        let disposition = HeaderValue::from_str(&format!(
            "attachment; filename=\"{}.pb.gz\"",
            profile.name
        ))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"profile.pb.gz\""));
        let mut res = Response::new(Body::from(profile.raw));
        res.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        res.headers_mut().insert(CONTENT_DISPOSITION, disposition);
        return add_cors_headers(res);
    }

    json_response(&profile, StatusCode::OK)
}

async fn session_profiles(state: &AppState, name: &str) -> Response<Body> {
    match state.store.list(&ProfileFilter::session(name)).await {
        Ok(profiles) => json_response(&profiles, StatusCode::OK),
        Err(e) => store_error(e),
    }
}

/// Profiles selected for comparison, by capture time ascending.
async fn comparison_set(
    query: &HashMap<String, String>,
    state: &AppState,
) -> Result<Vec<StoredProfile>, Response<Body>> {
    let mut profiles = if let Some(ids) = param(query, "ids") {
        let ids: Vec<&str> = ids.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
        if ids.len() < 2 {
            return Err(compare_error(CompareError::InsufficientInput { got: ids.len() }));
        }
        let mut profiles = Vec::with_capacity(ids.len());
        for id in ids {
            match state.store.get(id).await {
                Ok(p) => profiles.push(p),
                Err(e) => {
                    COMPARE_TOTAL.with_label_values(&["not_found"]).inc();
                    return Err(store_error(e));
                }
            }
        }
        profiles
    } else if let Some(session) = param(query, "session") {
        let kind = kind_param(query)?;
        let filter = ProfileFilter {
            kind,
            ..ProfileFilter::session(session)
        };
        let mut profiles = state.store.list(&filter).await.map_err(store_error)?;
        profiles.reverse();
        profiles
    } else {
        COMPARE_TOTAL.with_label_values(&["bad_request"]).inc();
        return Err(error_response(
            "missing ids or session parameter",
            StatusCode::BAD_REQUEST,
        ));
    };

    profiles.sort_by_key(|p| p.created_at);
    Ok(profiles)
}

fn compare_error(e: CompareError) -> Response<Body> {
    COMPARE_TOTAL.with_label_values(&["bad_request"]).inc();
    error_response(e, StatusCode::BAD_REQUEST)
}

async fn compare(req: &Request<Body>, state: &AppState) -> Response<Body> {
    let query = query_map(req);
    let mut profiles = match comparison_set(&query, state).await {
        Ok(p) => p,
        Err(res) => return res,
    };

    let records: Vec<_> = profiles.iter().map(|p| &p.metrics).collect();
    let report = match compare_records(&records) {
        Ok(r) => r,
        Err(e) => return compare_error(e),
    };

    for p in &mut profiles {
        p.raw = Vec::new();
    }
    COMPARE_TOTAL.with_label_values(&["ok"]).inc();
    tracing::debug!(kind = %report.kind, profiles = profiles.len(), "comparison computed");

    json_response(
        &serde_json::json!({ "profiles": profiles, "report": report }),
        StatusCode::OK,
    )
}
