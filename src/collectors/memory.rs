use super::Counters;
use crate::catalog::Metric;
use crate::errors::CollectorError;

/// Memory summary from `/proc/<pid>/statm`, in pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatmCounters {
    pub size: Option<u64>,
    pub resident: Option<u64>,
    pub shared: Option<u64>,
}

impl StatmCounters {
    /// Parse the single whitespace-delimited statm line.
    pub fn parse(content: &str, path: &str) -> Result<Self, CollectorError> {
        let parts: Vec<&str> = content.split_whitespace().collect();
        if parts.is_empty() {
            return Err(CollectorError::ParseError {
                path: path.into(),
                field: "size".into(),
                raw: "empty file".into(),
            });
        }

        let field = |idx: usize| parts.get(idx).and_then(|s| s.parse::<u64>().ok());

        Ok(StatmCounters {
            size: field(0),
            resident: field(1),
            shared: field(2),
        })
    }
}

impl Counters for StatmCounters {
    fn value(&self, metric: Metric) -> Option<u64> {
        match metric {
            Metric::Vsize => self.size,
            Metric::Rss => self.resident,
            Metric::Shared => self.shared,
            _ => None,
        }
    }
}
