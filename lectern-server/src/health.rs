//! Health endpoints.
//!
//! | path | body |
//! |------|------|
//! | `GET /health` | liveness: status, timestamp, uptime, version |
//! | `GET /health/detailed` | adds queue status and environment presence; 503 when unhealthy |
//! | `GET /health/email-queue` | queue status with a timestamp |

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use http::{Method, Request, Response, StatusCode, header};
use http_body_util::Full;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use lectern_queue::QueueStatus;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailedHealth {
    status: &'static str,
    timestamp: String,
    uptime: f64,
    response_time: String,
    email_queue: QueueStatus,
    environment: BTreeMap<String, bool>,
    version: &'static str,
    app_environment: String,
    platform: &'static str,
}

#[derive(Debug, Serialize)]
struct QueueReport {
    #[serde(flatten)]
    status: QueueStatus,
    timestamp: String,
}

/// Route a request to its health handler.
pub fn respond<B>(req: &Request<B>, state: &AppState) -> Response<Full<Bytes>> {
    if req.method() != Method::GET {
        return json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &json!({"error": "Method not allowed", "status": 405}),
        );
    }

    let path = req.uri().path().trim_end_matches('/');
    debug!(path, "Health request");

    match path {
        "/health" => basic(state),
        "/health/detailed" => detailed(state),
        "/health/email-queue" => email_queue(state),
        _ => json_response(
            StatusCode::NOT_FOUND,
            &json!({"error": "Not found", "status": 404, "path": req.uri().path()}),
        ),
    }
}

fn basic(state: &AppState) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &json!({
            "status": "healthy",
            "timestamp": now(),
            "uptime": state.uptime().as_secs_f64(),
            "version": state.version,
        }),
    )
}

fn detailed(state: &AppState) -> Response<Full<Bytes>> {
    let started = Instant::now();

    let environment = state.env_presence();
    let missing: Vec<&str> = state
        .required_env
        .iter()
        .copied()
        .filter(|name| !environment.get(*name).copied().unwrap_or(false))
        .collect();
    let healthy = missing.is_empty();

    let report = DetailedHealth {
        status: if healthy { "healthy" } else { "unhealthy" },
        timestamp: now(),
        uptime: state.uptime().as_secs_f64(),
        response_time: format!("{}ms", started.elapsed().as_millis()),
        email_queue: state.queue.status(),
        environment,
        version: state.version,
        app_environment: state.environment.clone(),
        platform: std::env::consts::OS,
    };

    if healthy {
        info!(status = report.status, response_time = %report.response_time, "Health check performed");
        json_response(StatusCode::OK, &report)
    } else {
        warn!(missing = ?missing, "Health check failed: required variables missing");
        json_response(StatusCode::SERVICE_UNAVAILABLE, &report)
    }
}

fn email_queue(state: &AppState) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &QueueReport {
            status: state.queue.status(),
            timestamp: now(),
        },
    )
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let (status, body) = match serde_json::to_vec(body) {
        Ok(body) => (status, body),
        Err(e) => {
            warn!(error = %e, "Failed to serialize health response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"error":"Internal server error","status":500}"#.to_vec(),
            )
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}
