//! HTTP surface the executor exposes to the scheduler
//!
//! Routes `/run`, `/kill`, `/log`, `/beat` and `/idleBeat`, plus an
//! unauthenticated `/health` endpoint for load balancers. Protocol replies
//! always use HTTP 200 with the result code carried in the JSON body, which
//! is what the scheduler parses.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::{error, warn};

use shared::api::{
    callback_body, endpoints, headers, ApiResponse, IdleBeatReq, KillReq, LogReq, LogRes,
    LogResContent, RunReq, FAILURE_CODE,
};

use crate::lifecycle::{DispatchReply, Executor};

/// Application state shared across all endpoint handlers
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<Executor>,
}

/// Build the executor's router. Called once at startup.
pub fn create_router(executor: Arc<Executor>) -> Router {
    // Glue sources can carry whole scripts, but nothing near this size
    const MAX_REQUEST_SIZE: usize = 2 * 1024 * 1024;

    Router::new()
        // Unauthenticated liveness probe for load balancers and
        // orchestrators; the scheduler itself uses /beat.
        .route("/health", get(health_check))
        .route(endpoints::RUN, post(handle_run))
        .route(endpoints::KILL, post(handle_kill))
        .route(endpoints::LOG, post(handle_log))
        .route(endpoints::BEAT, post(handle_beat))
        .route(endpoints::IDLE_BEAT, post(handle_idle_beat))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_SIZE))
        .with_state(AppState { executor })
}

/// Validate the access token header against the configured value.
///
/// A blank configured token disables the check. Comparison is constant-time
/// so the token cannot be probed character by character.
fn authorized(request_headers: &HeaderMap, expected: &str) -> bool {
    use subtle::ConstantTimeEq;

    if expected.is_empty() {
        return true;
    }

    let provided = request_headers
        .get(headers::ACCESS_TOKEN)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    provided.len() == expected.len()
        && bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
}

fn reject_token() -> Response {
    warn!("Rejecting scheduler call with a wrong or missing access token");
    Json(ApiResponse::failure("The access token is wrong")).into_response()
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "job-executor",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// `/run`: admit one dispatch.
///
/// The body is decoded by hand so an unparsable dispatch still gets the
/// callback-shaped inline failure the scheduler expects, rather than a
/// framework-level rejection.
async fn handle_run(
    State(state): State<AppState>,
    request_headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&request_headers, &state.executor.config().access_token) {
        return reject_token();
    }

    let req: RunReq = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to parse dispatch request body");
            return Json(callback_body(&RunReq::default(), FAILURE_CODE, "params err"))
                .into_response();
        }
    };

    match state.executor.dispatch(req) {
        DispatchReply::Accepted => Json(ApiResponse::success()).into_response(),
        DispatchReply::Rejected(failure) => Json(failure).into_response(),
    }
}

async fn handle_kill(
    State(state): State<AppState>,
    request_headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&request_headers, &state.executor.config().access_token) {
        return reject_token();
    }

    let req: KillReq = serde_json::from_slice(&body).unwrap_or_default();
    Json(state.executor.kill(req.job_id)).into_response()
}

async fn handle_log(
    State(state): State<AppState>,
    request_headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&request_headers, &state.executor.config().access_token) {
        return reject_token();
    }

    let req: LogReq = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to parse log request body");
            return Json(LogRes {
                code: FAILURE_CODE,
                msg: "params err".to_string(),
                content: LogResContent::default(),
            })
            .into_response();
        }
    };

    Json(state.executor.log_pull(&req)).into_response()
}

/// `/beat`: pure liveness probe, unconditional success.
async fn handle_beat(State(state): State<AppState>, request_headers: HeaderMap) -> Response {
    if !authorized(&request_headers, &state.executor.config().access_token) {
        return reject_token();
    }

    Json(ApiResponse::success()).into_response()
}

async fn handle_idle_beat(
    State(state): State<AppState>,
    request_headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&request_headers, &state.executor.config().access_token) {
        return reject_token();
    }

    let req: IdleBeatReq = serde_json::from_slice(&body).unwrap_or_default();
    Json(state.executor.idle_beat(req.job_id)).into_response()
}
