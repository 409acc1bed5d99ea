//! linktester -- network link quality testing.
//!
//! Measures throughput between two hosts with iperf3 while watching the NIC
//! error and drop counters reported by `ethtool`. A link passes when none of
//! the watched counters moved during the test.

pub mod config;
pub mod error;
pub mod link;
pub mod stats;
pub mod system;
pub mod throughput;

pub use error::{LinkTestError, Result};

/// Process exit code for a degraded link or a broken test environment.
pub const EXIT_LINK_PROBLEM: u8 = 100;
