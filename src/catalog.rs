//! Static registry of the metrics a monitored process can report.

use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Kernel accounting file a metric is extracted from, relative to `/proc/<pid>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Stat,
    Statm,
    Status,
    Io,
}

impl Source {
    pub const ALL: [Source; 4] = [Source::Stat, Source::Statm, Source::Status, Source::Io];

    pub fn file_name(self) -> &'static str {
        match self {
            Source::Stat => "stat",
            Source::Statm => "statm",
            Source::Status => "status",
            Source::Io => "io",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Reported as read.
    Absolute,
    /// Monotonic counter; reported as the difference from the previous tick.
    CumulativeDelta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cpu,
    Minflt,
    Majflt,
    Vsize,
    Rss,
    Shared,
    Threads,
    Swap,
    Ctxsw,
    Rchar,
    Wchar,
}

/// Serializable view of one catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct MetricDescriptor {
    pub name: &'static str,
    pub label: &'static str,
    pub source: Source,
    pub kind: MetricKind,
}

impl Metric {
    /// Catalog order. Selections and emitted samples follow it.
    pub const ALL: [Metric; 11] = [
        Metric::Cpu,
        Metric::Minflt,
        Metric::Majflt,
        Metric::Vsize,
        Metric::Rss,
        Metric::Shared,
        Metric::Threads,
        Metric::Swap,
        Metric::Ctxsw,
        Metric::Rchar,
        Metric::Wchar,
    ];

    pub const DEFAULT_SELECTION: [Metric; 3] = [Metric::Cpu, Metric::Vsize, Metric::Rss];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Cpu => "cpu",
            Metric::Minflt => "minflt",
            Metric::Majflt => "majflt",
            Metric::Vsize => "vsize",
            Metric::Rss => "rss",
            Metric::Shared => "shared",
            Metric::Threads => "threads",
            Metric::Swap => "swap",
            Metric::Ctxsw => "ctxsw",
            Metric::Rchar => "rchar",
            Metric::Wchar => "wchar",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Cpu => "CPU (ticks/interval)",
            Metric::Minflt => "Minor faults (per interval)",
            Metric::Majflt => "Major faults (per interval)",
            Metric::Vsize => "Virtual size (pages)",
            Metric::Rss => "Resident set (pages)",
            Metric::Shared => "Shared pages",
            Metric::Threads => "Threads",
            Metric::Swap => "Swap (kB)",
            Metric::Ctxsw => "Context switches (per interval)",
            Metric::Rchar => "Chars read (per interval)",
            Metric::Wchar => "Chars written (per interval)",
        }
    }

    pub fn source(self) -> Source {
        match self {
            Metric::Cpu | Metric::Minflt | Metric::Majflt => Source::Stat,
            Metric::Vsize | Metric::Rss | Metric::Shared => Source::Statm,
            Metric::Threads | Metric::Swap | Metric::Ctxsw => Source::Status,
            Metric::Rchar | Metric::Wchar => Source::Io,
        }
    }

    pub fn kind(self) -> MetricKind {
        match self {
            Metric::Vsize | Metric::Rss | Metric::Shared | Metric::Threads | Metric::Swap => {
                MetricKind::Absolute
            }
            Metric::Cpu
            | Metric::Minflt
            | Metric::Majflt
            | Metric::Ctxsw
            | Metric::Rchar
            | Metric::Wchar => MetricKind::CumulativeDelta,
        }
    }

    pub fn from_name(name: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.name() == name)
    }

    pub fn descriptor(self) -> MetricDescriptor {
        MetricDescriptor {
            name: self.name(),
            label: self.label(),
            source: self.source(),
            kind: self.kind(),
        }
    }

    /// Map configured names onto the catalog.
    ///
    /// Unknown names are dropped with a warning rather than rejected, so a typo
    /// in the metric list never stops collection of the remaining metrics.
    /// The result is deduplicated and in catalog order.
    pub fn parse_selection<S: AsRef<str>>(names: &[S]) -> Vec<Metric> {
        let mut selected = Vec::new();
        for raw in names {
            let name = raw.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            match Metric::from_name(name) {
                Some(metric) => selected.push(metric),
                None => warn!(metric = name, "ignoring unknown metric name"),
            }
        }
        selected.sort();
        selected.dedup();
        selected
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_catalog() {
        for metric in Metric::ALL {
            assert_eq!(Metric::from_name(metric.name()), Some(metric));
        }
        assert_eq!(Metric::from_name("bogus"), None);
    }

    #[test]
    fn test_all_is_in_declaration_order() {
        let mut sorted = Metric::ALL;
        sorted.sort();
        assert_eq!(sorted, Metric::ALL);
    }

    #[test]
    fn test_parse_selection_drops_unknown_and_duplicates() {
        let selected = Metric::parse_selection(&["rss", " cpu", "nope", "rss", ""]);
        assert_eq!(selected, vec![Metric::Cpu, Metric::Rss]);
    }

    #[test]
    fn test_parse_selection_all_unknown_is_empty() {
        assert!(Metric::parse_selection(&["cpuu", "rsss"]).is_empty());
    }

    #[test]
    fn test_kinds_match_counter_semantics() {
        assert_eq!(Metric::Cpu.kind(), MetricKind::CumulativeDelta);
        assert_eq!(Metric::Rss.kind(), MetricKind::Absolute);
        assert_eq!(Metric::Rchar.source(), Source::Io);
        assert_eq!(Metric::Threads.source(), Source::Status);
    }

    #[test]
    fn test_metric_serializes_as_wire_name() {
        let json = serde_json::to_string(&Metric::Ctxsw).unwrap();
        assert_eq!(json, "\"ctxsw\"");
        let descriptor = serde_json::to_value(Metric::Cpu.descriptor()).unwrap();
        assert_eq!(descriptor["kind"], "cumulative_delta");
        assert_eq!(descriptor["source"], "stat");
    }
}
