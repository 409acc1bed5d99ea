//! Throughput testing through the external iperf3 binary.
//!
//! [`Client`] and [`Server`] are thin parameter holders around
//! `iperf3 --client` / `iperf3 --server`; [`iperf`] decodes the client's JSON
//! result and [`report`] turns it into a summary.

pub mod client;
pub mod iperf;
pub mod report;
pub mod server;

pub use client::Client;
pub use iperf::Iperf3Result;
pub use report::ThroughputSummary;
pub use server::Server;

use crate::error::{LinkTestError, Result};

pub const LOCALHOST: &str = "127.0.0.1";
pub const DEFAULT_IPERF_PORT: u16 = 5201;
pub const DEFAULT_DURATION_SECS: u64 = 60;

/// Reject hostnames/addresses iperf3 would read as an option or that are not
/// plausible host names.
pub fn validate_target(target: &str) -> Result<()> {
    let valid = !target.is_empty()
        && !target.starts_with('-')
        && target
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':' || c == '%');
    if valid {
        Ok(())
    } else {
        Err(LinkTestError::InvalidTarget {
            target: target.to_string(),
        })
    }
}
