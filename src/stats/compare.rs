//! Before/after comparison of counter snapshots.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::{CounterKey, CounterSnapshot};
use crate::error::{LinkTestError, Result};

/// Counters that moved between two snapshots, with their absolute deltas.
/// Empty means the link stayed clean.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Comparison {
    deltas: BTreeMap<CounterKey, u64>,
}

impl Comparison {
    pub fn is_clean(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn get(&self, key: CounterKey) -> Option<u64> {
        self.deltas.get(&key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CounterKey, u64)> + '_ {
        self.deltas.iter().map(|(k, v)| (*k, *v))
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Compare `first` against `second`.
///
/// Every counter in `first` must be present in `second`; counters only in
/// `second` are ignored. The check is deliberately one-directional: `first`
/// is the reference capture.
pub fn compare(first: &CounterSnapshot, second: &CounterSnapshot) -> Result<Comparison> {
    let mut deltas = BTreeMap::new();
    for (key, before) in first.iter() {
        let after = second
            .get(key)
            .ok_or(LinkTestError::MissingKey { key, value: before })?;
        let diff = before.abs_diff(after);
        if diff > 0 {
            deltas.insert(key, diff);
        }
    }
    Ok(Comparison { deltas })
}

/// Holds a reference snapshot and compares later captures against it.
#[derive(Debug, Clone)]
pub struct CounterComparator {
    reference: CounterSnapshot,
}

impl CounterComparator {
    pub fn new(reference: CounterSnapshot) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> &CounterSnapshot {
        &self.reference
    }

    pub fn compare(&self, other: &CounterSnapshot) -> Result<Comparison> {
        compare(&self.reference, other)
    }
}
