//! Executor lifecycle: dispatch admission, kill, busy probes, drain
//!
//! This module owns the state machine from a parsed dispatch request to the
//! completion callback. Admission (the read-modify step over the
//! running-task table) is serialized by one executor-wide lock; the handler
//! itself always runs outside that lock in its own tokio task.

use anyhow::Context as _;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use shared::api::{
    callback_body, ApiResponse, BlockStrategy, CallbackParam, LogReq, LogRes, RegistryParam,
    RunReq, FAILURE_CODE,
};
use shared::ExecutorConfig;

use crate::handler::{HandlerRegistry, JobContext};
use crate::registration;
use crate::remote::SchedulerClient;
use crate::running::{RunningTable, TaskInstance};
use crate::server;
use crate::task;
use crate::tasklog::{default_log_response, LogHandler};

/// Reply to a `/run` admission.
///
/// An accepted dispatch is acknowledged generically; the scheduler learns
/// the final outcome through the completion callback. Admission failures
/// carry the callback-shaped failure payload inline instead.
#[derive(Debug, PartialEq)]
pub enum DispatchReply {
    Accepted,
    Rejected(Vec<CallbackParam>),
}

/// One executor instance; its lifetime equals the process.
///
/// Hosts the handler registry and the running-task table, accepts dispatches
/// from the scheduler, and reports outcomes back.
pub struct Executor {
    config: ExecutorConfig,
    /// Bind + advertise address, `ip:port`
    address: String,
    registry: HandlerRegistry,
    running: RunningTable,
    /// Serializes dispatch and kill admission; never held during handler
    /// execution
    admission: Mutex<()>,
    accepting: AtomicBool,
    client: Arc<SchedulerClient>,
    log_handler: RwLock<Option<LogHandler>>,
}

impl Executor {
    /// Create an executor from a validated configuration.
    ///
    /// Resolves the advertise address and builds the scheduler HTTP client;
    /// nothing is bound or registered until [`Executor::run`].
    pub fn new(config: ExecutorConfig) -> shared::Result<Self> {
        config.validate()?;
        let address = format!("{}:{}", config.resolved_ip(), config.executor_port);
        let client = Arc::new(SchedulerClient::new(&config)?);

        Ok(Self {
            config,
            address,
            registry: HandlerRegistry::new(),
            running: RunningTable::new(),
            admission: Mutex::new(()),
            accepting: AtomicBool::new(true),
            client,
            log_handler: RwLock::new(None),
        })
    }

    /// Register a handler under `name`. Idempotent, last write wins.
    pub fn register<F, Fut>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        self.registry.register(name, handler)
    }

    /// Install the handler serving `/log` requests. Without one, a benign
    /// "no log" response is returned.
    pub fn set_log_handler(&self, handler: LogHandler) {
        *self.log_handler.write().unwrap() = Some(handler);
    }

    /// The `ip:port` this executor binds and advertises
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The URL published to the scheduler registry
    pub fn registry_value(&self) -> String {
        format!("http://{}", self.address)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Number of currently running tasks
    pub fn running_len(&self) -> usize {
        self.running.len()
    }

    pub(crate) fn running(&self) -> &RunningTable {
        &self.running
    }

    pub(crate) fn scheduler_client(&self) -> &Arc<SchedulerClient> {
        &self.client
    }

    /// Refuse all further dispatches. Called at the start of shutdown.
    pub fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    /// The slot a dispatch occupies for block-strategy purposes: the job id,
    /// or `jobId-logId` when every dispatch gets its own slot.
    fn running_key(&self, job_id: i64, log_id: i64) -> String {
        if self.config.concurrent_execute {
            format!("{}-{}", job_id, log_id)
        } else {
            job_id.to_string()
        }
    }

    /// Admit one dispatch.
    ///
    /// Resolves the block strategy against the running-task table under the
    /// admission lock, inserts the new task instance, and spawns its worker.
    /// The reply is written before the handler produces any result.
    pub fn dispatch(self: &Arc<Self>, req: RunReq) -> DispatchReply {
        if !self.accepting.load(Ordering::SeqCst) {
            warn!(
                job_id = req.job_id,
                log_id = req.log_id,
                "Rejecting dispatch, executor is shutting down"
            );
            return DispatchReply::Rejected(callback_body(
                &req,
                FAILURE_CODE,
                "executor is shutting down",
            ));
        }

        let Some(handler) = self.registry.lookup(&req.executor_handler) else {
            error!(
                job_id = req.job_id,
                handler = %req.executor_handler,
                "Dispatch for a handler that is not registered"
            );
            return DispatchReply::Rejected(callback_body(
                &req,
                FAILURE_CODE,
                "Task not registered",
            ));
        };

        let job_id = req.job_id;
        let log_id = req.log_id;
        let key = self.running_key(job_id, log_id);
        let cancel = CancellationToken::new();

        {
            let _admission = self.admission.lock().unwrap();

            if let Some(existing) = self.running.get(&key) {
                if req.executor_block_strategy == BlockStrategy::CoverEarly {
                    info!(
                        job_id,
                        covered_log_id = existing.log_id,
                        log_id,
                        "Covering earlier dispatch"
                    );
                    existing.cancel.cancel();
                    self.running.remove(&key);
                } else {
                    warn!(
                        job_id,
                        log_id,
                        strategy = ?req.executor_block_strategy,
                        "Rejecting dispatch, job slot is occupied"
                    );
                    return DispatchReply::Rejected(callback_body(
                        &req,
                        FAILURE_CODE,
                        "There are tasks running",
                    ));
                }
            }

            self.running.insert(
                key.clone(),
                TaskInstance {
                    job_id,
                    log_id,
                    handler_name: req.executor_handler.clone(),
                    cancel: cancel.clone(),
                },
            );

            task::spawn_worker(Arc::clone(self), handler, req, key, cancel);
        }

        info!(job_id, log_id, "Dispatch accepted");
        DispatchReply::Accepted
    }

    /// Kill the task occupying the job-level slot.
    ///
    /// Cancellation alone delivers the kill; the running worker observes it
    /// and runs its normal completion path. In concurrent-execute mode a
    /// kill cannot address one specific run of the job.
    pub fn kill(&self, job_id: i64) -> ApiResponse {
        let _admission = self.admission.lock().unwrap();
        match self.running.remove(&job_id.to_string()) {
            Some(instance) => {
                info!(job_id, log_id = instance.log_id, "Killing running task");
                instance.cancel.cancel();
                ApiResponse::success()
            }
            None => {
                warn!(job_id, "Kill requested for a task that is not running");
                ApiResponse::failure("Task kill err")
            }
        }
    }

    /// Busy probe used by scheduler routing: success iff the job-level slot
    /// is free at the time the admission lock is held.
    pub fn idle_beat(&self, job_id: i64) -> ApiResponse {
        let _admission = self.admission.lock().unwrap();
        if self.running.contains(&job_id.to_string()) {
            ApiResponse::failure("Task is busy")
        } else {
            ApiResponse::success()
        }
    }

    /// Serve a `/log` page through the installed log handler.
    pub fn log_pull(&self, req: &LogReq) -> LogRes {
        let handler = self.log_handler.read().unwrap().clone();
        match handler {
            Some(handler) => handler(req),
            None => default_log_response(req),
        }
    }

    /// Bind the HTTP surface, start the registration loop, and serve until
    /// `shutdown` completes; then deregister and drain running tasks.
    pub async fn run(
        self: Arc<Self>,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> shared::Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.address)
            .await
            .with_context(|| {
                format!(
                    "Failed to bind executor listener to {}. \
                     Check if the port is already in use or requires elevated permissions.",
                    self.address
                )
            })?;
        info!(address = %self.address, "Executor listening for scheduler dispatches");

        let registration_cancel = CancellationToken::new();
        let registry_param = RegistryParam::executor(
            self.config.registry_key.clone(),
            self.registry_value(),
        );
        let registration_handle = registration::spawn_registration_loop(
            Arc::clone(&self.client),
            registry_param,
            registration_cancel.clone(),
        );

        let app = server::create_router(Arc::clone(&self));

        // Flip the admission flag as soon as the shutdown signal fires, so
        // dispatches racing the graceful connection drain are refused.
        let executor = Arc::clone(&self);
        let shutdown = async move {
            shutdown.await;
            info!("Shutdown signal received, refusing new dispatches");
            executor.stop_accepting();
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!("Executor server error: {}", e))?;

        self.stop_accepting();

        info!("Stopping registration loop");
        registration_cancel.cancel();
        if let Err(e) = registration_handle.await {
            error!(error = %e, "Registration loop task failed");
        }

        self.drain().await;
        Ok(())
    }

    /// Wait until the running-task table is empty, logging the remaining
    /// count every second. A configured drain timeout caps the wait.
    pub async fn drain(&self) {
        let mut waited_seconds = 0u64;
        loop {
            let remaining = self.running.len();
            if remaining == 0 {
                info!("All running tasks drained");
                return;
            }
            if let Some(cap) = self.config.drain_timeout_seconds {
                if waited_seconds >= cap {
                    warn!(
                        remaining,
                        cap_seconds = cap,
                        "Drain timeout reached, abandoning remaining tasks"
                    );
                    return;
                }
            }
            info!(remaining, "Waiting for running tasks to finish");
            tokio::time::sleep(Duration::from_secs(1)).await;
            waited_seconds += 1;
        }
    }
}
