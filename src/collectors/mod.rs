pub mod io;
pub mod memory;
pub mod stat;
pub mod status;

use crate::catalog::{Metric, Source};
use crate::errors::CollectorError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// Raw counter values of one tick, keyed by the metric they feed.
pub type RawValues = BTreeMap<Metric, u64>;

#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Read the full content of one kernel source for `pid`.
    async fn read_source(&self, pid: u32, source: Source) -> Result<String, CollectorError>;

    /// Human readable location of a source, used in errors and logs.
    fn location(&self, pid: u32, source: Source) -> String {
        format!("/proc/{}/{}", pid, source)
    }
}

/// Parsed view of one source that can answer for the metrics it carries.
pub trait Counters {
    fn value(&self, metric: Metric) -> Option<u64>;
}

/// Reads sources straight from a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, pid: u32, source: Source) -> PathBuf {
        self.root.join(pid.to_string()).join(source.file_name())
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new("/proc")
    }
}

#[async_trait]
impl SourceReader for ProcFs {
    async fn read_source(&self, pid: u32, source: Source) -> Result<String, CollectorError> {
        let path = self.path_for(pid, source);
        let bytes = fs::read(&path)
            .await
            .map_err(|e| CollectorError::ProcReadError {
                path: path.display().to_string(),
                source: e,
            })?;
        // `comm` is truncated by bytes and may end mid character, or be
        // arbitrary bytes set through prctl.
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn location(&self, pid: u32, source: Source) -> String {
        self.path_for(pid, source).display().to_string()
    }
}

/// Parse `content` as `source` and pull out the requested metrics.
pub fn extract(
    source: Source,
    content: &str,
    path: &str,
    metrics: &[Metric],
) -> Result<RawValues, CollectorError> {
    let counters: Box<dyn Counters> = match source {
        Source::Stat => Box::new(stat::StatCounters::parse(content, path)?),
        Source::Statm => Box::new(memory::StatmCounters::parse(content, path)?),
        Source::Status => Box::new(status::StatusCounters::parse(content, path)?),
        Source::Io => Box::new(io::IoCounters::parse(content, path)?),
    };

    Ok(metrics
        .iter()
        .filter(|m| m.source() == source)
        .filter_map(|&m| counters.value(m).map(|v| (m, v)))
        .collect())
}

/// Read every source the requested metrics need, once each, for one pid.
///
/// A source that cannot be read or parsed only drops its own metrics; the
/// other sources are still collected.
pub async fn read_counters(reader: &dyn SourceReader, pid: u32, metrics: &[Metric]) -> RawValues {
    let mut raw = RawValues::new();

    for source in Source::ALL {
        let wanted: Vec<Metric> = metrics
            .iter()
            .copied()
            .filter(|m| m.source() == source)
            .collect();
        if wanted.is_empty() {
            continue;
        }

        let path = reader.location(pid, source);
        let result = match reader.read_source(pid, source).await {
            Ok(content) => extract(source, &content, &path, &wanted),
            Err(e) => Err(e),
        };

        match result {
            Ok(values) => raw.extend(values),
            Err(e) => debug!(pid, %source, error = %e, "omitting metrics for unavailable source"),
        }
    }

    raw
}
