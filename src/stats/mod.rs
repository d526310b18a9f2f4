//! Aggregation of decoded request events into the statistics tree

pub mod aggregator;
pub mod models;
pub mod pipeline;

pub use aggregator::{aggregate, Aggregator};
pub use models::{HostCounter, MetricBucket, Statistics, VisitorKey};
pub use pipeline::{LogPipeline, StatsSource};
