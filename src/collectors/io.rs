use super::Counters;
use crate::catalog::Metric;
use crate::errors::CollectorError;

/// Character I/O counters from `/proc/<pid>/io`.
///
/// Every line is exactly two fields, `key:` and a number; `rchar` is the
/// first line and `wchar` the second.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoCounters {
    pub rchar: Option<u64>,
    pub wchar: Option<u64>,
}

impl IoCounters {
    pub fn parse(content: &str, path: &str) -> Result<Self, CollectorError> {
        let mut io = IoCounters::default();
        let mut seen = 0;

        for line in content.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let [key, value] = parts.as_slice() else {
                continue;
            };
            let Some(key) = key.strip_suffix(':') else {
                continue;
            };
            seen += 1;
            let value = value.parse::<u64>().ok();
            match key {
                "rchar" => io.rchar = value,
                "wchar" => io.wchar = value,
                _ => {}
            }
        }

        if seen == 0 {
            return Err(CollectorError::ParseError {
                path: path.into(),
                field: "rchar".into(),
                raw: content.trim().to_string(),
            });
        }
        Ok(io)
    }
}

impl Counters for IoCounters {
    fn value(&self, metric: Metric) -> Option<u64> {
        match metric {
            Metric::Rchar => self.rchar,
            Metric::Wchar => self.wchar,
            _ => None,
        }
    }
}
