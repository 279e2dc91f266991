//! Monitoring context and the periodic collector loop.

use crate::catalog::Metric;
use crate::collectors::{read_counters, SourceReader};
use crate::resolver::ProcessResolver;
use crate::store::Series;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

/// Everything the collector and the exporter share: the metric selection and
/// one series per monitored executable name.
#[derive(Debug)]
pub struct Monitor {
    metrics: Arc<[Metric]>,
    series: RwLock<BTreeMap<String, Arc<Series>>>,
}

/// One monitored name as resolved for the current tick.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub pid: Option<u32>,
    pub series: Arc<Series>,
}

impl Monitor {
    /// Register `names` for collection of the metrics named in `metric_names`.
    ///
    /// Names are trimmed and deduplicated. Metric names the catalog does not
    /// know are dropped with a warning.
    pub fn new<N, M>(names: &[N], metric_names: &[M]) -> Self
    where
        N: AsRef<str>,
        M: AsRef<str>,
    {
        let metrics = Metric::parse_selection(metric_names);
        if metrics.is_empty() {
            warn!("no known metrics selected, samples will carry no values");
        }
        Self::with_metrics(names, metrics)
    }

    pub fn with_metrics<N: AsRef<str>>(names: &[N], metrics: Vec<Metric>) -> Self {
        let monitor = Self {
            metrics: metrics.into(),
            series: RwLock::new(BTreeMap::new()),
        };
        for name in names {
            monitor.register(name.as_ref().trim());
        }
        monitor
    }

    fn register(&self, name: &str) {
        if name.is_empty() {
            return;
        }
        let mut series = self.series.write().unwrap_or_else(|e| e.into_inner());
        series
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Series::new()));
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn names(&self) -> Vec<String> {
        self.read_series().keys().cloned().collect()
    }

    pub fn series(&self, name: &str) -> Option<Arc<Series>> {
        self.read_series().get(name).cloned()
    }

    /// Handles to every series. The registry lock is released on return, so
    /// callers lock each series on its own.
    pub fn entries(&self) -> Vec<(String, Arc<Series>)> {
        self.read_series()
            .iter()
            .map(|(name, series)| (name.clone(), Arc::clone(series)))
            .collect()
    }

    /// Refresh the process table and resolve the pid of every monitored name.
    pub fn resolve_targets(&self, resolver: &mut dyn ProcessResolver) -> Vec<Target> {
        resolver.refresh();
        self.entries()
            .into_iter()
            .map(|(name, series)| {
                let pid = resolver.resolve(&name).filter(|&pid| pid != 0);
                Target { name, pid, series }
            })
            .collect()
    }

    fn read_series(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Arc<Series>>> {
        self.series.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Collect one tick for already resolved targets, one task per name, and wait
/// for all of them.
pub async fn collect_targets(
    metrics: Arc<[Metric]>,
    reader: &Arc<dyn SourceReader>,
    targets: Vec<Target>,
) {
    let mut tasks = JoinSet::new();
    for target in targets {
        let reader = Arc::clone(reader);
        let metrics = Arc::clone(&metrics);
        tasks.spawn(async move { collect_target(reader.as_ref(), &metrics, target).await });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "collection task failed");
        }
    }
}

async fn collect_target(reader: &dyn SourceReader, metrics: &[Metric], target: Target) {
    let timestamp = now_millis();
    match target.pid {
        None => {
            trace!(name = %target.name, "process not running");
            target.series.record_absence(timestamp);
        }
        Some(pid) => {
            let raw = read_counters(reader, pid, metrics).await;
            trace!(name = %target.name, pid, values = raw.len(), "read counters");
            target.series.record_observation(timestamp, &raw, metrics);
        }
    }
}

/// A full tick: resolve every name, then collect.
pub async fn collect_once(
    monitor: &Monitor,
    resolver: &mut dyn ProcessResolver,
    reader: &Arc<dyn SourceReader>,
) {
    let targets = monitor.resolve_targets(resolver);
    collect_targets(Arc::clone(&monitor.metrics), reader, targets).await;
}

/// Tick forever at `interval`.
///
/// Process table refreshes are blocking, so resolution runs on the blocking
/// pool; a tick never overlaps the previous one.
pub async fn run<R>(
    monitor: Arc<Monitor>,
    resolver: R,
    reader: Arc<dyn SourceReader>,
    interval: Duration,
) where
    R: ProcessResolver + 'static,
{
    let resolver = Arc::new(Mutex::new(resolver));
    let mut tick = tokio::time::interval(interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tick.tick().await;
        let t0 = Instant::now();

        let resolved = {
            let monitor = Arc::clone(&monitor);
            let resolver = Arc::clone(&resolver);
            tokio::task::spawn_blocking(move || {
                let mut resolver = resolver.lock().unwrap_or_else(|e| e.into_inner());
                monitor.resolve_targets(&mut *resolver)
            })
            .await
        };

        let targets = match resolved {
            Ok(targets) => targets,
            Err(e) => {
                error!(error = %e, "process resolution panicked");
                continue;
            }
        };

        let running = targets.iter().filter(|t| t.pid.is_some()).count();
        let total = targets.len();
        collect_targets(Arc::clone(&monitor.metrics), &reader, targets).await;

        debug!(
            running,
            total,
            latency_us = t0.elapsed().as_micros() as u64,
            "tick complete"
        );
    }
}

/// Start the background collector for `monitor`.
pub fn start<R>(
    monitor: Arc<Monitor>,
    resolver: R,
    reader: Arc<dyn SourceReader>,
    interval: Duration,
) -> JoinHandle<()>
where
    R: ProcessResolver + 'static,
{
    info!(
        names = ?monitor.names(),
        metrics = ?monitor.metrics(),
        interval_ms = interval.as_millis() as u64,
        "starting collector"
    );
    tokio::spawn(run(monitor, resolver, reader, interval))
}
