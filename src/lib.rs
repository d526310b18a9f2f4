pub mod api;
pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod ingest;
pub mod stats;
