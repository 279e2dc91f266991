use super::Counters;
use crate::catalog::Metric;
use crate::errors::CollectorError;
use std::collections::HashMap;

/// Selected fields of `/proc/<pid>/status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCounters {
    pub threads: Option<u64>,
    /// kB
    pub vm_swap: Option<u64>,
    pub voluntary_ctxt_switches: Option<u64>,
    pub nonvoluntary_ctxt_switches: Option<u64>,
}

impl StatusCounters {
    /// Parse `key:\tvalue` lines. Memory values carry a trailing `kB` unit,
    /// only the leading number is kept.
    pub fn parse(content: &str, path: &str) -> Result<Self, CollectorError> {
        let fields = Self::parse_fields(content);
        if fields.is_empty() {
            return Err(CollectorError::ParseError {
                path: path.into(),
                field: "status".into(),
                raw: content.trim().to_string(),
            });
        }

        let number = |key: &str| -> Option<u64> {
            fields
                .get(key)
                .and_then(|v| v.split_whitespace().next())
                .and_then(|v| v.parse().ok())
        };

        Ok(StatusCounters {
            threads: number("Threads"),
            vm_swap: number("VmSwap"),
            voluntary_ctxt_switches: number("voluntary_ctxt_switches"),
            nonvoluntary_ctxt_switches: number("nonvoluntary_ctxt_switches"),
        })
    }

    fn parse_fields(content: &str) -> HashMap<&str, &str> {
        content
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim(), value.trim()))
            .collect()
    }

    pub fn context_switches(&self) -> Option<u64> {
        self.voluntary_ctxt_switches?
            .checked_add(self.nonvoluntary_ctxt_switches?)
    }
}

impl Counters for StatusCounters {
    fn value(&self, metric: Metric) -> Option<u64> {
        match metric {
            Metric::Threads => self.threads,
            Metric::Swap => self.vm_swap,
            Metric::Ctxsw => self.context_switches(),
            _ => None,
        }
    }
}
