use super::Counters;
use crate::catalog::Metric;
use crate::errors::CollectorError;

/// Cumulative counters from `/proc/<pid>/stat`.
///
/// Each field is optional: a missing or non-numeric field only removes the
/// metrics derived from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatCounters {
    pub minflt: Option<u64>,
    pub majflt: Option<u64>,
    pub utime: Option<u64>,
    pub stime: Option<u64>,
}

// Offsets into the fields that follow the closing paren of `comm`.
// The first of those is `state` (field 3 in proc(5) numbering).
const MINFLT_IDX: usize = 7;
const MAJFLT_IDX: usize = 9;
const UTIME_IDX: usize = 11;
const STIME_IDX: usize = 12;

impl StatCounters {
    /// Parse stat content. `comm` can contain spaces and parens, so the
    /// numeric fields start after the last `)`.
    pub fn parse(content: &str, path: &str) -> Result<Self, CollectorError> {
        let close_paren = content.rfind(')').ok_or_else(|| CollectorError::ParseError {
            path: path.into(),
            field: "comm".into(),
            raw: content.trim().to_string(),
        })?;

        let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();
        let field = |idx: usize| fields.get(idx).and_then(|s| s.parse::<u64>().ok());

        Ok(StatCounters {
            minflt: field(MINFLT_IDX),
            majflt: field(MAJFLT_IDX),
            utime: field(UTIME_IDX),
            stime: field(STIME_IDX),
        })
    }

    /// Total CPU ticks spent in user and kernel mode.
    pub fn cpu_ticks(&self) -> Option<u64> {
        self.utime?.checked_add(self.stime?)
    }
}

impl Counters for StatCounters {
    fn value(&self, metric: Metric) -> Option<u64> {
        match metric {
            Metric::Cpu => self.cpu_ticks(),
            Metric::Minflt => self.minflt,
            Metric::Majflt => self.majflt,
            _ => None,
        }
    }
}
