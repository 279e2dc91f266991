//! Bounded per-process sample history and the counter state behind rate metrics.

use crate::catalog::{Metric, MetricKind};
use crate::collectors::RawValues;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Samples kept per series; older ones are evicted first.
pub const MAX_SAMPLES: usize = 300;

/// One tick's emitted values. A metric missing from `values` had no value on
/// that tick, which is different from a measured zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sample {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub values: BTreeMap<Metric, i64>,
}

#[derive(Debug, Default)]
pub struct SeriesState {
    samples: VecDeque<Sample>,
    previous_raw: HashMap<Metric, u64>,
    initialized: bool,
}

impl SeriesState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process was not running on this tick.
    ///
    /// Counter history is kept, but the next observation will not emit deltas
    /// so no rate spans the gap.
    pub fn record_absence(&mut self, timestamp: i64) {
        self.initialized = false;
        self.push(timestamp, BTreeMap::new());
    }

    /// The process was found and `raw` holds what could be read from it.
    pub fn record_observation(&mut self, timestamp: i64, raw: &RawValues, requested: &[Metric]) {
        let mut values = BTreeMap::new();

        for &metric in requested {
            let Some(&current) = raw.get(&metric) else {
                continue;
            };
            let emitted = match metric.kind() {
                MetricKind::Absolute => i64::try_from(current).ok(),
                MetricKind::CumulativeDelta if self.initialized => self
                    .previous_raw
                    .get(&metric)
                    // A counter reset after a restart shows up as a negative delta.
                    .map(|&prev| current.wrapping_sub(prev) as i64),
                MetricKind::CumulativeDelta => None,
            };
            if let Some(value) = emitted {
                values.insert(metric, value);
            }
        }

        self.previous_raw
            .extend(raw.iter().map(|(&metric, &value)| (metric, value)));
        self.initialized = true;
        self.push(timestamp, values);
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn push(&mut self, timestamp: i64, values: BTreeMap<Metric, i64>) {
        // Keep timestamps non-decreasing even if the wall clock steps back.
        let timestamp = match self.samples.back() {
            Some(last) => timestamp.max(last.timestamp),
            None => timestamp,
        };
        self.samples.push_back(Sample { timestamp, values });
        while self.samples.len() > MAX_SAMPLES {
            self.samples.pop_front();
        }
    }
}

/// A `SeriesState` behind its own lock.
///
/// The lock is only held for an append or a copy, never across I/O.
#[derive(Debug, Default)]
pub struct Series {
    state: Mutex<SeriesState>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_absence(&self, timestamp: i64) {
        self.lock().record_absence(timestamp);
    }

    pub fn record_observation(&self, timestamp: i64, raw: &RawValues, requested: &[Metric]) {
        self.lock().record_observation(timestamp, raw, requested);
    }

    /// Independent copy of the current samples, oldest first.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.lock().samples().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, SeriesState> {
        // A panic elsewhere while holding the lock cannot leave a sample half
        // written, so the data is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(Metric, u64)]) -> RawValues {
        pairs.iter().copied().collect()
    }

    const CPU_RSS: [Metric; 2] = [Metric::Cpu, Metric::Rss];

    #[test]
    fn test_first_observation_omits_delta() {
        let mut state = SeriesState::new();
        state.record_observation(1, &raw(&[(Metric::Cpu, 15), (Metric::Rss, 200)]), &CPU_RSS);

        let sample = state.samples().last().unwrap();
        assert_eq!(sample.values.get(&Metric::Cpu), None);
        assert_eq!(sample.values[&Metric::Rss], 200);
        assert!(state.is_initialized());
    }

    #[test]
    fn test_consecutive_observations_emit_exact_delta() {
        let mut state = SeriesState::new();
        state.record_observation(1, &raw(&[(Metric::Cpu, 15)]), &CPU_RSS);
        state.record_observation(2, &raw(&[(Metric::Cpu, 18)]), &CPU_RSS);

        let sample = state.samples().last().unwrap();
        assert_eq!(sample.values[&Metric::Cpu], 3);
    }

    #[test]
    fn test_absence_rebaselines() {
        let mut state = SeriesState::new();
        state.record_observation(1, &raw(&[(Metric::Cpu, 15)]), &CPU_RSS);
        state.record_absence(2);
        assert!(!state.is_initialized());
        state.record_observation(3, &raw(&[(Metric::Cpu, 500)]), &CPU_RSS);

        let samples: Vec<_> = state.samples().collect();
        assert!(samples[1].values.is_empty());
        assert_eq!(samples[2].values.get(&Metric::Cpu), None);

        state.record_observation(4, &raw(&[(Metric::Cpu, 510)]), &CPU_RSS);
        assert_eq!(state.samples().last().unwrap().values[&Metric::Cpu], 10);
    }

    #[test]
    fn test_metric_missing_on_previous_tick_has_no_delta() {
        let mut state = SeriesState::new();
        state.record_observation(1, &raw(&[(Metric::Rss, 1)]), &CPU_RSS);
        state.record_observation(2, &raw(&[(Metric::Cpu, 40)]), &CPU_RSS);
        assert_eq!(state.samples().last().unwrap().values.get(&Metric::Cpu), None);
    }

    #[test]
    fn test_counter_reset_gives_negative_delta() {
        let mut state = SeriesState::new();
        state.record_observation(1, &raw(&[(Metric::Cpu, 100)]), &CPU_RSS);
        state.record_observation(2, &raw(&[(Metric::Cpu, 4)]), &CPU_RSS);
        assert_eq!(state.samples().last().unwrap().values[&Metric::Cpu], -96);
    }

    #[test]
    fn test_absolute_passthrough() {
        let mut state = SeriesState::new();
        state.record_observation(1, &raw(&[(Metric::Rss, 12345)]), &CPU_RSS);
        assert_eq!(state.samples().last().unwrap().values[&Metric::Rss], 12345);
    }

    #[test]
    fn test_unrequested_metric_is_not_emitted() {
        let mut state = SeriesState::new();
        state.record_observation(1, &raw(&[(Metric::Vsize, 9)]), &CPU_RSS);
        assert!(state.samples().last().unwrap().values.is_empty());
    }

    #[test]
    fn test_capacity_is_bounded() {
        let mut state = SeriesState::new();
        for t in 0..(MAX_SAMPLES as i64 + 50) {
            if t % 7 == 0 {
                state.record_absence(t);
            } else {
                state.record_observation(t, &raw(&[(Metric::Cpu, t as u64)]), &CPU_RSS);
            }
            assert!(state.len() <= MAX_SAMPLES);
        }
        assert_eq!(state.len(), MAX_SAMPLES);
        assert_eq!(state.samples().next().unwrap().timestamp, 50);
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let mut state = SeriesState::new();
        state.record_absence(1_000);
        state.record_absence(900);
        state.record_absence(1_100);
        let stamps: Vec<i64> = state.samples().map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec![1_000, 1_000, 1_100]);
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let series = Series::new();
        series.record_observation(1, &raw(&[(Metric::Rss, 1)]), &CPU_RSS);
        let snapshot = series.snapshot();
        series.record_absence(2);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(series.snapshot().len(), 2);
    }

    #[test]
    fn test_sample_json_shape() {
        let sample = Sample {
            timestamp: 1_700_000_000_000,
            values: [(Metric::Cpu, 3), (Metric::Rss, 210)].into_iter().collect(),
        };
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"timestamp": 1_700_000_000_000i64, "values": {"cpu": 3, "rss": 210}})
        );
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        use std::sync::Arc;
        use std::thread;

        let series = Arc::new(Series::new());
        let writer = {
            let series = Arc::clone(&series);
            thread::spawn(move || {
                for t in 0..1_000 {
                    series.record_observation(t, &raw(&[(Metric::Cpu, t as u64)]), &CPU_RSS);
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let series = Arc::clone(&series);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let snap = series.snapshot();
                        assert!(snap.len() <= MAX_SAMPLES);
                        assert!(snap.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(series.snapshot().len(), MAX_SAMPLES);
    }
}
