//! HTTP server: /api routes plus /healthz, /readyz and /metrics

use super::api;
use super::AppState;
use crate::metrics;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Instant;

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, state: AppState, shutdown: F) -> Result<(), hyper::Error>
where
    F: Future<Output = ()>,
{
    let make_svc = make_service_fn(move |_| {
        let state = state.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(handle(req, &state).await) }
            }))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_svc);
    tracing::info!("perfkit collector listening on http://{}", server.local_addr());
    server.with_graceful_shutdown(shutdown).await
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut res = Response::new(Body::from(body));
    *res.status_mut() = status;
    res
}

/// Route one request.
pub async fn handle(req: Request<Body>, state: &AppState) -> Response<Body> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match path.as_str() {
        "/healthz" => text_response(StatusCode::OK, "ok\n"),

        "/readyz" => match state.store.ping().await {
            Ok(()) => text_response(StatusCode::OK, "ready\n"),
            Err(e) => {
                tracing::warn!("readiness check failed: {}", e);
                text_response(StatusCode::SERVICE_UNAVAILABLE, "not ready\n")
            }
        },

        "/metrics" => {
            let mut res = Response::new(Body::from(metrics::encode_metrics()));
            res.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            res
        }

        p if p.starts_with("/api/") => api::handle_api(req, state).await,

        _ => text_response(StatusCode::NOT_FOUND, "not found\n"),
    };

    tracing::debug!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}
