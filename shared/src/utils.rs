//! Utility functions for the job executor
//!
//! Local address discovery and time helpers shared by the executor crate.

use std::net::UdpSocket;
use std::time::{SystemTime, UNIX_EPOCH};

/// Detect the primary IPv4 address of this host.
///
/// Opens a UDP socket towards a public address (no packet is sent) and reads
/// the local address the OS picked for the route. Falls back to loopback
/// when the host has no route, so a disconnected machine still binds.
pub fn local_ipv4() -> String {
    let detected = UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip().to_string());

    match detected {
        Ok(ip) => ip,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to detect local IPv4 address, using loopback");
            "127.0.0.1".to_string()
        }
    }
}

/// Get current Unix timestamp in milliseconds
pub fn current_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
