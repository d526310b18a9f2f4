//! Access-log ingestion: locating log files and decoding their lines

pub mod entry;
pub mod source;

pub use entry::RequestEvent;
pub use source::{LogFile, LogSource};
