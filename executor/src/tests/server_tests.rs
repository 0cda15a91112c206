//! Router-level tests for the executor's HTTP surface

use super::support::{ok_job, run_req, test_executor, test_executor_with, wait_until};
use crate::server::create_router;
use crate::tasklog::LogHandler;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use shared::api::{endpoints, headers, LogRes, LogResContent, FAILURE_CODE, SUCCESS_CODE};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt; // for `oneshot`

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_beat_replies_success() {
    let (executor, _scheduler) = test_executor().await;
    let app = create_router(executor);

    let response = app.oneshot(post_request(endpoints::BEAT, "")).await.unwrap();
    let json = response_json(response).await;
    assert_eq!(json["code"], 200);
}

#[tokio::test]
async fn test_health_check() {
    let (executor, _scheduler) = test_executor().await;
    let app = create_router(executor);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let json = response_json(app.oneshot(request).await.unwrap()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "job-executor");
}

#[tokio::test]
async fn test_access_token_enforced() {
    let (executor, _scheduler) = test_executor_with(|config| {
        config.access_token = "s3cret".to_string();
    })
    .await;
    let app = create_router(executor);

    // Missing token
    let json = response_json(
        app.clone()
            .oneshot(post_request(endpoints::BEAT, ""))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(json["code"], 500);
    assert_eq!(json["msg"], "The access token is wrong");

    // Wrong token
    let request = Request::builder()
        .method(Method::POST)
        .uri(endpoints::BEAT)
        .header(headers::ACCESS_TOKEN, "guess")
        .body(Body::empty())
        .unwrap();
    let json = response_json(app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(json["code"], 500);

    // Correct token
    let request = Request::builder()
        .method(Method::POST)
        .uri(endpoints::BEAT)
        .header(headers::ACCESS_TOKEN, "s3cret")
        .body(Body::empty())
        .unwrap();
    let json = response_json(app.oneshot(request).await.unwrap()).await;
    assert_eq!(json["code"], 200);
}

#[tokio::test]
async fn test_run_malformed_body_returns_inline_failure() {
    let (executor, scheduler) = test_executor().await;
    let app = create_router(executor);

    let response = app
        .oneshot(post_request(endpoints::RUN, "{not json"))
        .await
        .unwrap();
    let json = response_json(response).await;

    // Callback-shaped single-element array, no task created
    assert!(json.is_array());
    assert_eq!(json[0]["executeResult"]["code"], 500);
    assert_eq!(json[0]["executeResult"]["msg"], "params err");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(scheduler.callback_count(), 0);
}

#[tokio::test]
async fn test_run_accepts_and_reports_via_callback() {
    let (executor, scheduler) = test_executor().await;
    executor.register("h1", ok_job);
    let app = create_router(Arc::clone(&executor));

    let body = serde_json::to_string(&run_req(7, 100, "h1")).unwrap();
    let json = response_json(app.oneshot(post_request(endpoints::RUN, &body)).await.unwrap()).await;
    assert_eq!(json["code"], 200);

    assert!(wait_until(|| scheduler.callback_for(100).is_some(), Duration::from_secs(2)).await);
    assert_eq!(
        scheduler.callback_for(100).unwrap().execute_result.code,
        SUCCESS_CODE
    );
}

#[tokio::test]
async fn test_kill_unknown_job_fails() {
    let (executor, _scheduler) = test_executor().await;
    let app = create_router(executor);

    let response = app
        .oneshot(post_request(endpoints::KILL, r#"{"jobId": 1}"#))
        .await
        .unwrap();
    let json = response_json(response).await;
    assert_eq!(json["code"], 500);
    assert_eq!(json["msg"], "Task kill err");
}

#[tokio::test]
async fn test_idle_beat_for_idle_job() {
    let (executor, _scheduler) = test_executor().await;
    let app = create_router(executor);

    let response = app
        .oneshot(post_request(endpoints::IDLE_BEAT, r#"{"jobId": 99}"#))
        .await
        .unwrap();
    let json = response_json(response).await;
    assert_eq!(json["code"], 200);
}

#[tokio::test]
async fn test_log_without_handler_returns_benign_page() {
    let (executor, _scheduler) = test_executor().await;
    let app = create_router(executor);

    let body = r#"{"logId": 1, "logDateTim": 1700000000000, "fromLineNum": 3}"#;
    let response = app.oneshot(post_request(endpoints::LOG, body)).await.unwrap();
    let json = response_json(response).await;

    assert_eq!(json["code"], 200);
    assert_eq!(json["content"]["fromLineNum"], 3);
    assert_eq!(json["content"]["isEnd"], true);
}

#[tokio::test]
async fn test_log_with_installed_handler() {
    let (executor, _scheduler) = test_executor().await;
    let handler: LogHandler = Arc::new(|req| LogRes {
        code: SUCCESS_CODE,
        msg: String::new(),
        content: LogResContent {
            from_line_num: req.from_line_num,
            to_line_num: req.from_line_num + 1,
            log_content: format!("lines for dispatch {}", req.log_id),
            is_end: false,
        },
    });
    executor.set_log_handler(handler);
    let app = create_router(executor);

    let body = r#"{"logId": 42, "fromLineNum": 1}"#;
    let json = response_json(app.oneshot(post_request(endpoints::LOG, body)).await.unwrap()).await;

    assert_eq!(json["content"]["logContent"], "lines for dispatch 42");
    assert_eq!(json["content"]["toLineNum"], 2);
    assert_eq!(json["content"]["isEnd"], false);
}

#[tokio::test]
async fn test_log_malformed_body() {
    let (executor, _scheduler) = test_executor().await;
    let app = create_router(executor);

    let response = app.oneshot(post_request(endpoints::LOG, "{oops")).await.unwrap();
    let json = response_json(response).await;
    assert_eq!(json["code"], FAILURE_CODE);
}
