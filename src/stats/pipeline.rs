use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::classify::GeoDatabase;
use crate::error::PipelineResult;
use crate::ingest::{LogFile, LogSource, RequestEvent};
use crate::stats::aggregator::aggregate;
use crate::stats::models::Statistics;

/// Something that can produce a fresh statistics tree on demand
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Run one complete aggregation pass
    async fn collect(&self) -> PipelineResult<Statistics>;
}

/// Decodes every log file in a directory and aggregates the result
#[derive(Clone)]
pub struct LogPipeline {
    source: LogSource,
    geo: Arc<dyn GeoDatabase>,
}

impl LogPipeline {
    pub fn new(source: LogSource, geo: Arc<dyn GeoDatabase>) -> Self {
        Self { source, geo }
    }

    /// Run one pass on the current thread. Blocks on file I/O.
    pub fn run(&self) -> PipelineResult<Statistics> {
        let started = Instant::now();
        let directory = self.source.directory().display().to_string();
        info!("Parsing access logs in {}", directory);

        let files = self.source.files()?;
        let mut log_size_bytes = 0;

        let events = files.iter().flat_map(
            |path| -> Box<dyn Iterator<Item = PipelineResult<RequestEvent>>> {
                match LogFile::open(path) {
                    Ok(file) => {
                        debug!(
                            "Reading {} ({} bytes)",
                            file.path().display(),
                            file.size_bytes()
                        );
                        log_size_bytes += file.size_bytes();
                        Box::new(file.events())
                    }
                    Err(e) => Box::new(std::iter::once(Err(e))),
                }
            },
        );
        let mut stats = aggregate(events, &directory, self.geo.as_ref())?;

        stats.log_size_bytes = log_size_bytes;
        stats.parse_duration_seconds = started.elapsed().as_secs_f64();

        info!(
            "Parsed {} lines from {} files ({} hosts) in {:.3}s",
            stats.log_lines,
            files.len(),
            stats.hosts.len(),
            stats.parse_duration_seconds
        );
        Ok(stats)
    }
}

#[async_trait]
impl StatsSource for LogPipeline {
    async fn collect(&self) -> PipelineResult<Statistics> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.run()).await?
    }
}
