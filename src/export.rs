use crate::monitor::Monitor;
use crate::store::Sample;
use std::collections::BTreeMap;

/// Process name -> samples, oldest first. Serializes to the `/metrics` body.
pub type MetricsSnapshot = BTreeMap<String, Vec<Sample>>;

/// Point-in-time copy of every series.
///
/// Each series is copied under its own lock, so a slow export never holds up
/// collection of unrelated processes.
pub fn snapshot_all(monitor: &Monitor) -> MetricsSnapshot {
    monitor
        .entries()
        .into_iter()
        .map(|(name, series)| (name, series.snapshot()))
        .collect()
}
