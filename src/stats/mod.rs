//! NIC error counter capture from `ethtool --statistics`.
//!
//! `ethtool` prints a header followed by `key: value` lines:
//!
//! ```text
//! NIC statistics:
//!      tx_packets: 237892
//!      rx_packets: 415812
//!      tx_errors: 0
//!      rx_errors: 0
//!      rx_missed: 0
//!      align_errors: 0
//!      tx_single_collisions: 0
//!      tx_aborted: 0
//!      tx_underrun: 0
//! ```
//!
//! Only a fixed allow-list of error/drop counters is retained; traffic
//! counters and driver-specific extras are ignored.

pub mod compare;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{LinkTestError, Result};

pub use compare::{compare, Comparison, CounterComparator};

// ---------------------------------------------------------------------------
// CounterKey
// ---------------------------------------------------------------------------

/// The error and drop counters a link test watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterKey {
    TxErrors,
    RxErrors,
    RxMissed,
    AlignErrors,
    TxAborted,
    TxUnderrun,
    RxDropped,
    TxDropped,
    RxCrc,
}

impl CounterKey {
    pub const ALL: [CounterKey; 9] = [
        CounterKey::TxErrors,
        CounterKey::RxErrors,
        CounterKey::RxMissed,
        CounterKey::AlignErrors,
        CounterKey::TxAborted,
        CounterKey::TxUnderrun,
        CounterKey::RxDropped,
        CounterKey::TxDropped,
        CounterKey::RxCrc,
    ];

    /// Counter name as printed by `ethtool`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TxErrors => "tx_errors",
            Self::RxErrors => "rx_errors",
            Self::RxMissed => "rx_missed",
            Self::AlignErrors => "align_errors",
            Self::TxAborted => "tx_aborted",
            Self::TxUnderrun => "tx_underrun",
            Self::RxDropped => "rx_dropped",
            Self::TxDropped => "tx_dropped",
            Self::RxCrc => "rx_crc",
        }
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Returned for counter names outside the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCounter;

impl FromStr for CounterKey {
    type Err = UnknownCounter;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or(UnknownCounter)
    }
}

// ---------------------------------------------------------------------------
// CounterSnapshot
// ---------------------------------------------------------------------------

/// Point-in-time capture of the watched counters. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    counters: BTreeMap<CounterKey, u64>,
    captured_at: DateTime<Utc>,
}

impl CounterSnapshot {
    pub fn new(counters: BTreeMap<CounterKey, u64>) -> Self {
        Self {
            counters,
            captured_at: Utc::now(),
        }
    }

    pub fn get(&self, key: CounterKey) -> Option<u64> {
        self.counters.get(&key).copied()
    }

    pub fn contains(&self, key: CounterKey) -> bool {
        self.counters.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CounterKey, u64)> + '_ {
        self.counters.iter().map(|(k, v)| (*k, *v))
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

impl FromIterator<(CounterKey, u64)> for CounterSnapshot {
    fn from_iter<I: IntoIterator<Item = (CounterKey, u64)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse `ethtool --statistics` output into a snapshot.
///
/// Lines are split on the first `:`. Lines without one, or with nothing after
/// it (the `NIC statistics:` header), are skipped, as are counters outside the
/// allow-list. A watched counter with a non-numeric value is an error. When a
/// counter appears twice the last value wins.
pub fn parse_statistics(text: &str) -> Result<CounterSnapshot> {
    let mut counters = BTreeMap::new();

    for line in text.lines() {
        let Some((raw_key, raw_value)) = line.split_once(':') else {
            continue;
        };
        let value = raw_value.trim();
        if value.is_empty() {
            continue;
        }
        let Ok(key) = raw_key.trim().parse::<CounterKey>() else {
            trace!(key = raw_key.trim(), "ignoring counter");
            continue;
        };
        let count = value.parse::<u64>().map_err(|_| LinkTestError::InvalidCounter {
            key,
            value: value.to_string(),
        })?;
        counters.insert(key, count);
    }

    Ok(CounterSnapshot::new(counters))
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

/// Captures counter snapshots for one interface by running `ethtool`.
pub struct EthtoolCapture {
    ethtool_path: String,
    interface: String,
}

impl EthtoolCapture {
    pub fn new(ethtool_path: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            ethtool_path: ethtool_path.into(),
            interface: interface.into(),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Run `ethtool --statistics <interface>` and parse the result.
    pub async fn capture(&self) -> Result<CounterSnapshot> {
        let stdout = crate::system::run_command_async(
            &self.ethtool_path,
            &["--statistics", self.interface.as_str()],
        )
        .await?;
        let snapshot = parse_statistics(&stdout)?;
        debug!(
            interface = %self.interface,
            counters = snapshot.len(),
            "captured NIC statistics"
        );
        Ok(snapshot)
    }
}
