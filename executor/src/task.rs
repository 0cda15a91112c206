//! Task worker: runs one handler invocation and reports its outcome
//!
//! The handler runs in its own spawned task so a panic is caught at the join
//! boundary instead of unwinding through the executor. A monitor selects
//! over handler completion, the optional dispatch deadline, and external
//! cancellation; the first signal wins, so the outcome is reported even when
//! a handler ignores its cancellation token.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use shared::api::{RunReq, FAILURE_CODE, SUCCESS_CODE, TIMEOUT_CODE};

use crate::handler::{JobContext, JobHandlerFn};
use crate::lifecycle::Executor;

/// Final result of one dispatch, as reported to the scheduler.
pub(crate) struct TaskOutcome {
    pub code: i64,
    pub msg: String,
}

/// Spawn the worker for an accepted dispatch.
///
/// On every exit path the worker releases the cancellation token, removes
/// its running-table entry (compare-and-remove, so a slot already taken over
/// by a newer dispatch is left alone), and then POSTs exactly one completion
/// callback.
pub(crate) fn spawn_worker(
    executor: Arc<Executor>,
    handler: JobHandlerFn,
    req: RunReq,
    running_key: String,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let outcome = run_monitored(handler, &req, cancel.clone()).await;
        cancel.cancel();
        executor.running().remove_if_log(&running_key, req.log_id);
        executor
            .scheduler_client()
            .callback(&req, outcome.code, &outcome.msg)
            .await;
    });
}

/// Run the handler under the monitor. First signal wins: handler result,
/// deadline, or external cancellation.
async fn run_monitored(
    handler: JobHandlerFn,
    req: &RunReq,
    cancel: CancellationToken,
) -> TaskOutcome {
    let ctx = JobContext::new(req, cancel.clone());
    let mut handle = tokio::spawn(handler(ctx));

    let has_deadline = req.executor_timeout > 0;
    let deadline = tokio::time::Instant::now()
        + Duration::from_secs(if has_deadline {
            req.executor_timeout as u64
        } else {
            0
        });
    let deadline_sleep = tokio::time::sleep_until(deadline);
    tokio::pin!(deadline_sleep);

    tokio::select! {
        result = &mut handle => outcome_from_join(req, result),
        _ = cancel.cancelled() => {
            // Kill or cover-early. The handler may keep running detached;
            // its slot is already free and its eventual result is discarded.
            info!(
                job_id = req.job_id,
                log_id = req.log_id,
                "Task cancelled before completion"
            );
            TaskOutcome {
                code: FAILURE_CODE,
                msg: "job cancelled".to_string(),
            }
        }
        _ = &mut deadline_sleep, if has_deadline => {
            warn!(
                job_id = req.job_id,
                log_id = req.log_id,
                timeout_seconds = req.executor_timeout,
                "Task exceeded its dispatch timeout"
            );
            cancel.cancel();
            TaskOutcome {
                code: TIMEOUT_CODE,
                msg: "job execute timeout".to_string(),
            }
        }
    }
}

fn outcome_from_join(
    req: &RunReq,
    result: Result<anyhow::Result<String>, JoinError>,
) -> TaskOutcome {
    match result {
        Ok(Ok(msg)) => {
            info!(
                job_id = req.job_id,
                log_id = req.log_id,
                "Task completed successfully"
            );
            TaskOutcome {
                code: SUCCESS_CODE,
                msg,
            }
        }
        Ok(Err(e)) => {
            error!(
                job_id = req.job_id,
                log_id = req.log_id,
                error = %e,
                "Task handler returned an error"
            );
            TaskOutcome {
                code: FAILURE_CODE,
                msg: e.to_string(),
            }
        }
        Err(join_error) if join_error.is_panic() => {
            let cause = panic_message(join_error.into_panic());
            error!(
                job_id = req.job_id,
                log_id = req.log_id,
                cause = %cause,
                "Task handler panicked"
            );
            TaskOutcome {
                code: FAILURE_CODE,
                msg: format!("task panic:{}", cause),
            }
        }
        Err(join_error) => {
            error!(
                job_id = req.job_id,
                log_id = req.log_id,
                error = %join_error,
                "Task handler was aborted"
            );
            TaskOutcome {
                code: FAILURE_CODE,
                msg: "job cancelled".to_string(),
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
