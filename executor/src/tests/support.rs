//! Shared fixtures for executor tests
//!
//! Provides a mock scheduler listening on an ephemeral loopback port that
//! records every registry, deregistration and callback POST it receives,
//! plus helpers for building executors and dispatch requests against it.

use axum::{routing::post, Json, Router};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shared::api::{endpoints, ApiResponse, CallbackParam, RegistryParam, RunReq};
use shared::ExecutorConfig;

use crate::handler::JobContext;
use crate::lifecycle::Executor;

/// In-process stand-in for the central scheduler.
pub struct MockScheduler {
    pub addr: SocketAddr,
    callbacks: Arc<Mutex<Vec<Vec<CallbackParam>>>>,
    registrations: Arc<Mutex<Vec<RegistryParam>>>,
    removals: Arc<Mutex<Vec<RegistryParam>>>,
}

impl MockScheduler {
    pub async fn start() -> Self {
        let callbacks: Arc<Mutex<Vec<Vec<CallbackParam>>>> = Arc::default();
        let registrations: Arc<Mutex<Vec<RegistryParam>>> = Arc::default();
        let removals: Arc<Mutex<Vec<RegistryParam>>> = Arc::default();

        let router = {
            let callbacks = Arc::clone(&callbacks);
            let registrations = Arc::clone(&registrations);
            let removals = Arc::clone(&removals);

            Router::new()
                .route(
                    endpoints::CALLBACK,
                    post(move |Json(body): Json<Vec<CallbackParam>>| {
                        let callbacks = Arc::clone(&callbacks);
                        async move {
                            callbacks.lock().unwrap().push(body);
                            Json(ApiResponse::success())
                        }
                    }),
                )
                .route(
                    endpoints::REGISTRY,
                    post(move |Json(body): Json<RegistryParam>| {
                        let registrations = Arc::clone(&registrations);
                        async move {
                            registrations.lock().unwrap().push(body);
                            Json(ApiResponse::success())
                        }
                    }),
                )
                .route(
                    endpoints::REGISTRY_REMOVE,
                    post(move |Json(body): Json<RegistryParam>| {
                        let removals = Arc::clone(&removals);
                        async move {
                            removals.lock().unwrap().push(body);
                            Json(ApiResponse::success())
                        }
                    }),
                )
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            addr,
            callbacks,
            registrations,
            removals,
        }
    }

    pub fn server_addr(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// All callback elements received so far, flattened across batches.
    pub fn callbacks(&self) -> Vec<CallbackParam> {
        self.callbacks
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks().len()
    }

    /// The callback for one dispatch, if it has arrived.
    pub fn callback_for(&self, log_id: i64) -> Option<CallbackParam> {
        self.callbacks().into_iter().find(|c| c.log_id == log_id)
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }

    pub fn removals(&self) -> Vec<RegistryParam> {
        self.removals.lock().unwrap().clone()
    }
}

/// Executor configuration pointing at the mock scheduler.
pub fn test_config(server_addr: String) -> ExecutorConfig {
    ExecutorConfig {
        server_addr,
        access_token: String::new(),
        executor_ip: "127.0.0.1".to_string(),
        executor_port: "9999".to_string(),
        registry_key: "test-executor".to_string(),
        timeout_seconds: 5,
        log_dir: None,
        concurrent_execute: false,
        drain_timeout_seconds: None,
    }
}

pub async fn test_executor() -> (Arc<Executor>, MockScheduler) {
    test_executor_with(|_| {}).await
}

pub async fn test_executor_with<F>(customize: F) -> (Arc<Executor>, MockScheduler)
where
    F: FnOnce(&mut ExecutorConfig),
{
    let scheduler = MockScheduler::start().await;
    let mut config = test_config(scheduler.server_addr());
    customize(&mut config);
    let executor = Arc::new(Executor::new(config).unwrap());
    (executor, scheduler)
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

/// A dispatch request with the given identifiers; other fields default.
pub fn run_req(job_id: i64, log_id: i64, handler: &str) -> RunReq {
    RunReq {
        job_id,
        log_id,
        executor_handler: handler.to_string(),
        log_date_time: 1_700_000_000_000,
        ..Default::default()
    }
}

/// Handler that succeeds immediately.
pub async fn ok_job(_ctx: JobContext) -> anyhow::Result<String> {
    Ok("ok".to_string())
}

/// Handler that sleeps for the milliseconds given in the dispatch params
/// (default 500), deliberately ignoring its cancellation token.
pub async fn busy_job(ctx: JobContext) -> anyhow::Result<String> {
    let millis: u64 = ctx.params().parse().unwrap_or(500);
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Ok("done".to_string())
}
