//! Measurement statistics
//!
//! [`StatsCollector`] owns the histogram while shots run; [`StatsTable`] is
//! the immutable view handed to callers. Worker threads each fill a local
//! collector and merge at the end.

use qexec_core::{OutcomeKey, QexecError};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Histogram of outcome keys
///
/// Serializes as a map from bit string (e.g. `"011"`) to count; a shot that
/// measured nothing is keyed by the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsTable {
    counts: HashMap<OutcomeKey, u64>,
}

impl StatsTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for `key` (0 if never seen)
    pub fn get(&self, key: &OutcomeKey) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// No key recorded
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Iterate over (key, count) in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&OutcomeKey, u64)> + '_ {
        self.counts.iter().map(|(k, &c)| (k, c))
    }

    /// Relative frequency of `key`
    pub fn probability(&self, key: &OutcomeKey) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.get(key) as f64 / total as f64
    }

    /// Most frequent key; ties go to the smallest key
    pub fn most_frequent(&self) -> Option<(&OutcomeKey, u64)> {
        self.iter()
            .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then_with(|| kb.cmp(ka)))
    }

    /// Entries sorted by key
    pub fn sorted(&self) -> Vec<(&OutcomeKey, u64)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    fn add(&mut self, key: OutcomeKey, count: u64) {
        *self.counts.entry(key).or_insert(0) += count;
    }
}

impl FromIterator<(OutcomeKey, u64)> for StatsTable {
    fn from_iter<I: IntoIterator<Item = (OutcomeKey, u64)>>(iter: I) -> Self {
        let mut table = StatsTable::new();
        for (key, count) in iter {
            table.add(key, count);
        }
        table
    }
}

/// One `bits count` line per key, sorted by key
impl fmt::Display for StatsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, count) in self.sorted() {
            writeln!(f, "{} {}", key, count)?;
        }
        Ok(())
    }
}

impl Serialize for StatsTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.sorted();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, count) in entries {
            map.serialize_entry(&key.to_string(), &count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for StatsTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = StatsTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from bit string to count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<StatsTable, A::Error> {
                let mut table = StatsTable::new();
                while let Some((bits, count)) = access.next_entry::<String, u64>()? {
                    let key = OutcomeKey::parse(&bits)
                        .map_err(|e: QexecError| <A::Error as serde::de::Error>::custom(e))?;
                    table.add(key, count);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// Mutable accumulator behind a run
#[derive(Debug, Clone, Default)]
pub struct StatsCollector {
    table: StatsTable,
}

impl StatsCollector {
    /// Empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `key`
    pub fn record(&mut self, key: OutcomeKey) {
        self.table.add(key, 1);
    }

    /// Copy of the current histogram
    pub fn snapshot(&self) -> StatsTable {
        self.table.clone()
    }

    /// Fold another collector's counts into this one
    pub fn merge(&mut self, other: StatsCollector) {
        if self.table.is_empty() {
            self.table = other.table;
            return;
        }
        for (key, count) in other.table.counts {
            self.table.add(key, count);
        }
    }

    /// Number of recorded shots
    pub fn total(&self) -> u64 {
        self.table.total()
    }

    /// Finish collecting
    pub fn into_table(self) -> StatsTable {
        self.table
    }
}

// ============================================================================
// Tests
// ============================================================================
