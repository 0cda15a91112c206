//! Tests for the registration loop and scheduler client

use super::support::{test_config, wait_until, MockScheduler};
use crate::registration::spawn_registration_loop;
use crate::remote::SchedulerClient;
use shared::api::{RegistryParam, RunReq, SUCCESS_CODE};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_registration_fires_immediately_and_deregisters_on_shutdown() {
    let scheduler = MockScheduler::start().await;
    let client = Arc::new(SchedulerClient::new(&test_config(scheduler.server_addr())).unwrap());
    let param = RegistryParam::executor("test-executor", "http://127.0.0.1:9999");

    let shutdown = CancellationToken::new();
    let handle = spawn_registration_loop(Arc::clone(&client), param.clone(), shutdown.clone());

    // First lease refresh fires on the immediate tick, not 20s later
    assert!(
        wait_until(|| scheduler.registration_count() >= 1, Duration::from_secs(2)).await,
        "registration must fire immediately on start"
    );
    assert!(scheduler.removals().is_empty());

    shutdown.cancel();
    handle.await.unwrap();

    let removals = scheduler.removals();
    assert_eq!(removals.len(), 1);
    assert_eq!(removals[0], param);
    assert_eq!(removals[0].registry_group, "EXECUTOR");
}

#[tokio::test]
async fn test_callback_survives_unreachable_scheduler() {
    // Nothing listens on this port; the callback must be logged and
    // swallowed, never propagated.
    let config = test_config("http://127.0.0.1:9".to_string());
    let client = SchedulerClient::new(&config).unwrap();

    let req = RunReq {
        job_id: 1,
        log_id: 2,
        ..Default::default()
    };
    client.callback(&req, SUCCESS_CODE, "ok").await;
}

#[tokio::test]
async fn test_registration_survives_unreachable_scheduler() {
    let config = test_config("http://127.0.0.1:9".to_string());
    let client = Arc::new(SchedulerClient::new(&config).unwrap());
    let param = RegistryParam::executor("test-executor", "http://127.0.0.1:9999");

    let shutdown = CancellationToken::new();
    let handle = spawn_registration_loop(Arc::clone(&client), param, shutdown.clone());

    // Let the immediate tick fail, then make sure the loop is still alive
    // enough to observe shutdown and exit cleanly.
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("registration loop must keep running through transport failures")
        .unwrap();
}
