use thiserror::Error;

//create types errors for easy testability

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("failed to read {path}: {source}")]
    ProcReadError {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {field} from {path}: {raw}")]
    ParseError {
        path: String,
        field: String,
        raw: String,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no process names given to monitor")]
    NoProcesses,

    #[error("collection interval must be greater than zero")]
    ZeroInterval,
}
