use std::path::PathBuf;
use thiserror::Error;

/// A log line that could not be decoded into a request event.
#[derive(Debug, Error)]
#[error("malformed log line {line} in {}: {source}", file.display())]
pub struct DecodeError {
    pub file: PathBuf,
    /// 1-based line number inside the (decompressed) file
    pub line: u64,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("failed to open GeoIP database at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: maxminddb::MaxMindDbError,
    },
    #[error("GeoIP lookup failed for {ip}: {reason}")]
    Lookup { ip: String, reason: String },
    #[error("not an IP address: {0:?}")]
    InvalidAddress(String),
}

/// Anything that aborts an aggregation pass.
///
/// A failed pass never yields partial statistics; the cache hands the same
/// error to every caller that waited on the pass.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("log directory {} is unavailable: {reason}", path.display())]
    SourceUnavailable { path: PathBuf, reason: String },
    #[error("failed to read log file {}: {source}", path.display())]
    LogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Geo(#[from] GeoError),
    #[error("failed to serialize statistics: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error("aggregation task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
