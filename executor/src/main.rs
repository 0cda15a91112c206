//! Job executor agent
//!
//! Binary entry point: loads the executor configuration, initializes
//! logging, registers the bundled demo handlers, and runs the agent until a
//! shutdown signal arrives. Real deployments embed the `executor` library
//! and register their own handlers instead of the demos.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use executor::{Executor, JobContext};
use shared::ExecutorConfig;

/// Command-line arguments for the executor
#[derive(Parser, Debug)]
#[command(name = "executor")]
#[command(about = "Job executor agent that runs scheduler-dispatched tasks", long_about = None)]
struct CliArgs {
    /// Path to the executor configuration file (executor.toml)
    #[arg(value_name = "CONFIG_FILE")]
    config_file: PathBuf,

    /// Override the scheduler base URL from the config file
    #[arg(long = "server-addr", value_name = "URL")]
    server_addr: Option<String>,

    /// Override the access token from the config file
    #[arg(long = "access-token", value_name = "TOKEN")]
    access_token: Option<String>,

    /// Override the advertised IP from the config file
    #[arg(long = "executor-ip", value_name = "IP")]
    executor_ip: Option<String>,

    /// Override the listen port from the config file
    #[arg(long = "executor-port", value_name = "PORT")]
    executor_port: Option<String>,

    /// Override the registry key from the config file
    #[arg(long = "registry-key", value_name = "NAME")]
    registry_key: Option<String>,
}

fn apply_overrides(config: &mut ExecutorConfig, args: &CliArgs) {
    if let Some(server_addr) = &args.server_addr {
        config.server_addr = server_addr.clone();
    }
    if let Some(access_token) = &args.access_token {
        config.access_token = access_token.clone();
    }
    if let Some(executor_ip) = &args.executor_ip {
        config.executor_ip = executor_ip.clone();
    }
    if let Some(executor_port) = &args.executor_port {
        config.executor_port = executor_port.clone();
    }
    if let Some(registry_key) = &args.registry_key {
        config.registry_key = registry_key.clone();
    }
}

/// Initialize the `tracing` subscriber.
///
/// With a configured log directory, logs go to a daily-rolling JSON file
/// through a non-blocking writer; the returned guard must live until exit so
/// buffered lines are flushed. Without one, logs go to stdout.
fn init_tracing(config: &ExecutorConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("executor=info,shared=info"));

    match &config.log_dir {
        Some(log_dir) => {
            let file_appender = tracing_appender::rolling::daily(log_dir, "executor.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(non_blocking)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
            None
        }
    }
}

#[tokio::main]
async fn main() {
    let cli_args = CliArgs::parse();

    let mut config = match ExecutorConfig::from_file(&cli_args.config_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Failed to load configuration from {}: {:#}",
                cli_args.config_file.display(),
                e
            );
            std::process::exit(1);
        }
    };
    apply_overrides(&mut config, &cli_args);
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration after overrides: {:#}", e);
        std::process::exit(1);
    }

    let _log_guard = init_tracing(&config);
    info!(
        config_file = %cli_args.config_file.display(),
        server_addr = %config.server_addr,
        registry_key = %config.registry_key,
        concurrent_execute = config.concurrent_execute,
        "Job executor starting up"
    );

    let executor = match Executor::new(config) {
        Ok(executor) => Arc::new(executor),
        Err(e) => {
            error!(error = %e, "Failed to initialize executor");
            std::process::exit(1);
        }
    };

    executor.register("echo", echo_job);
    executor.register("sleep", sleep_job);
    info!(
        address = %executor.address(),
        "Registered demo handlers: echo, sleep"
    );

    // Graceful shutdown on SIGTERM/SIGINT so the scheduler sees a clean
    // deregistration instead of an expiring lease.
    let shutdown_signal = async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
            let mut sigint =
                signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM");
                },
                _ = sigint.recv() => {
                    info!("Received SIGINT");
                },
            }
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
            info!("Received Ctrl+C");
        }
    };

    if let Err(e) = Arc::clone(&executor).run(shutdown_signal).await {
        error!(error = %e, "Executor terminated with an error");
        std::process::exit(1);
    }

    info!("Executor shutdown complete");
}

/// Demo handler: echoes the dispatch params back as the result message.
async fn echo_job(ctx: JobContext) -> anyhow::Result<String> {
    let trigger_delay_ms =
        shared::utils::current_timestamp_millis() as i64 - ctx.log_date_time();
    info!(
        job_id = ctx.job_id(),
        log_id = ctx.log_id(),
        params = %ctx.params(),
        trigger_delay_ms,
        "echo job invoked"
    );
    Ok(format!("echo: {}", ctx.params()))
}

/// Demo handler: sleeps for the number of seconds given in the dispatch
/// params, stopping early when the task is killed or covered.
async fn sleep_job(ctx: JobContext) -> anyhow::Result<String> {
    let seconds: u64 = ctx
        .params()
        .trim()
        .parse()
        .context("sleep job params must be a number of seconds")?;

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {
            Ok(format!("slept {}s", seconds))
        }
        _ = ctx.cancelled() => {
            info!(job_id = ctx.job_id(), log_id = ctx.log_id(), "sleep job interrupted");
            Ok("sleep interrupted".to_string())
        }
    }
}
