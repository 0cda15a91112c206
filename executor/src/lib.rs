//! Executor agent for a distributed job-scheduling fabric
//!
//! The executor participates in a job fabric driven by a central scheduler:
//! the scheduler owns timing, retries and routing, while this crate owns the
//! local task lifecycle. It exposes the dispatch HTTP surface the scheduler
//! calls (`/run`, `/kill`, `/log`, `/beat`, `/idleBeat`), runs each accepted
//! dispatch in its own tokio task under cancellation, reports completion
//! through the scheduler's callback endpoint, and keeps a registration lease
//! alive so the scheduler can route work here.
//!
//! Embedders create an [`Executor`] from an [`shared::ExecutorConfig`],
//! register named handlers, and call [`Executor::run`].

pub mod handler;
pub mod lifecycle;
pub mod registration;
pub mod remote;
pub mod running;
pub mod server;
mod task;
pub mod tasklog;

pub use handler::{HandlerRegistry, JobContext, JobHandlerFn};
pub use lifecycle::{DispatchReply, Executor};
pub use remote::SchedulerClient;
pub use server::create_router;
pub use tasklog::{default_log_response, LogHandler};

#[cfg(test)]
mod tests;
