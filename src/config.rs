use crate::errors::ConfigError;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "proc-monitor", version, about)]
pub struct Config {
    /// Comma-separated list of process names to monitor.
    #[arg(
        long,
        env = "PROC_MONITOR_PROCESSES",
        value_delimiter = ',',
        default_value = "python2"
    )]
    pub processes: Vec<String>,

    /// Comma-separated list of metrics to collect.
    /// Unknown names are ignored.
    #[arg(
        long,
        env = "PROC_MONITOR_METRICS",
        value_delimiter = ',',
        default_value = "cpu,vsize,rss"
    )]
    pub metrics: Vec<String>,

    /// Address the dashboard and JSON API listen on.
    #[arg(long, env = "PROC_MONITOR_LISTEN", default_value = "0.0.0.0:8090")]
    pub listen: String,

    /// Collection interval in milliseconds.
    #[arg(long, env = "PROC_MONITOR_COLLECT_INTERVAL_MS", default_value_t = 1000)]
    pub collect_interval_ms: u64,

    /// Mount point of procfs.
    #[arg(long, env = "PROC_MONITOR_PROC_ROOT", default_value = "/proc")]
    pub proc_root: PathBuf,

    /// Enable JSON structured logging.
    #[arg(long, env = "PROC_MONITOR_JSON_LOGS", default_value_t = false)]
    pub json_logs: bool,
}

impl Config {
    /// Trimmed, non-empty, deduplicated process names in the given order.
    pub fn process_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.processes.iter().map(|n| n.trim()) {
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    pub fn collect_interval(&self) -> Duration {
        Duration::from_millis(self.collect_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.process_names().is_empty() {
            return Err(ConfigError::NoProcesses);
        }
        if self.collect_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}
