//! Handler registry and the context passed to running handlers
//!
//! A handler is a user-supplied async function registered under a name. The
//! registry only maps names to functions; live occurrences are tracked
//! separately in the running-task table, so registrations survive any number
//! of task runs.

use futures_util::future::BoxFuture;
use shared::api::RunReq;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

/// Context handed to a handler for one dispatch.
///
/// Carries a snapshot of the dispatch parameters and the task's cancellation
/// handle. Handlers that run for longer than a few seconds should observe
/// [`JobContext::cancelled`] so kills and cover-early takeovers interrupt
/// them promptly.
#[derive(Debug, Clone)]
pub struct JobContext {
    job_id: i64,
    log_id: i64,
    log_date_time: i64,
    params: String,
    broadcast_index: i64,
    broadcast_total: i64,
    cancel: CancellationToken,
}

impl JobContext {
    pub(crate) fn new(req: &RunReq, cancel: CancellationToken) -> Self {
        Self {
            job_id: req.job_id,
            log_id: req.log_id,
            log_date_time: req.log_date_time,
            params: req.executor_params.clone(),
            broadcast_index: req.broadcast_index,
            broadcast_total: req.broadcast_total,
            cancel,
        }
    }

    pub fn job_id(&self) -> i64 {
        self.job_id
    }

    pub fn log_id(&self) -> i64 {
        self.log_id
    }

    /// Trigger time of this dispatch in epoch milliseconds
    pub fn log_date_time(&self) -> i64 {
        self.log_date_time
    }

    /// Opaque parameter string configured on the job definition
    pub fn params(&self) -> &str {
        &self.params
    }

    /// Shard index of this executor for broadcast jobs
    pub fn broadcast_index(&self) -> i64 {
        self.broadcast_index
    }

    /// Total shard count for broadcast jobs
    pub fn broadcast_total(&self) -> i64 {
        self.broadcast_total
    }

    /// Completes when the task is killed, covered by a newer dispatch, or
    /// its deadline fires.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Type-erased handler function: one dispatch in, result message out.
///
/// `Ok(msg)` reports success with `msg` as the execution message; `Err`
/// reports failure with the error text. Panics are caught by the worker and
/// reported as failures too.
pub type JobHandlerFn =
    Arc<dyn Fn(JobContext) -> BoxFuture<'static, anyhow::Result<String>> + Send + Sync>;

/// Maps handler names to task functions.
///
/// Registration is idempotent with last-write-wins semantics; lookups
/// vastly outnumber writes.
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, JobHandlerFn>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register `handler` under `name`, replacing any previous registration.
    pub fn register<F, Fut>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        let boxed: JobHandlerFn = Arc::new(move |ctx| Box::pin(handler(ctx)));
        self.handlers.write().unwrap().insert(name.into(), boxed);
    }

    pub fn lookup(&self, name: &str) -> Option<JobHandlerFn> {
        self.handlers.read().unwrap().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.read().unwrap().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().unwrap().is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
