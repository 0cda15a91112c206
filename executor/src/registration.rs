//! Registration loop
//!
//! Keeps this executor visible to the scheduler: the scheduler treats
//! registrations as a lease that expires after roughly 30 seconds, so the
//! loop refreshes it every 20. Failures never abort the loop; the next tick
//! retries naturally. On shutdown the loop deregisters once, best effort.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use shared::api::RegistryParam;

use crate::remote::SchedulerClient;

/// Lease refresh cadence; comfortably inside the scheduler's expiry window.
pub const REGISTRY_INTERVAL: Duration = Duration::from_secs(20);

/// Spawn the long-lived registration task.
///
/// The first registration fires immediately, then one per interval tick.
/// Cancelling `shutdown` stops the loop and posts a single deregistration.
pub fn spawn_registration_loop(
    client: Arc<SchedulerClient>,
    param: RegistryParam,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            registry_key = %param.registry_key,
            registry_value = %param.registry_value,
            "Starting registration loop"
        );

        let mut interval = tokio::time::interval(REGISTRY_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    client.registry(&param).await;
                }
                _ = shutdown.cancelled() => {
                    info!("Registration loop received shutdown signal");
                    break;
                }
            }
        }

        client.registry_remove(&param).await;
    })
}
