//! Data model of one aggregation pass

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::classify::headers::strip_port;
use crate::ingest::RequestEvent;

/// Label -> occurrences
pub type Counter = BTreeMap<String, u64>;

/// Number of status classes tracked per path (`status / 100`, capped at 5)
pub const STATUS_CLASSES: usize = 6;

/// Seconds in an hour bucket
pub const HOUR_SECS: i64 = 3600;

/// Root of the statistics tree
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub log_directory: String,
    /// Size on disk of every scanned log file
    pub log_size_bytes: u64,
    pub log_lines: u64,
    pub parse_duration_seconds: f64,
    #[serde(rename = "firstStampUnix")]
    pub first_stamp: f64,
    #[serde(rename = "lastStampUnix")]
    pub last_stamp: f64,
    /// Keyed by host name without port
    pub hosts: BTreeMap<String, HostCounter>,
}

impl Statistics {
    pub fn new(log_directory: impl Into<String>) -> Self {
        Self {
            log_directory: log_directory.into(),
            ..Default::default()
        }
    }

    /// Widen the observed time range to include `timestamp`.
    /// An unset (zero) bound is always replaced.
    pub fn widen(&mut self, timestamp: f64) {
        if self.first_stamp == 0.0 || timestamp < self.first_stamp {
            self.first_stamp = timestamp;
        }
        if self.last_stamp == 0.0 || timestamp > self.last_stamp {
            self.last_stamp = timestamp;
        }
    }
}

/// Everything observed for one host
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostCounter {
    pub total: MetricBucket,
    /// Keyed by unix time rounded down to the hour
    pub hourly: BTreeMap<i64, MetricBucket>,
    /// Bot visitors by browser name
    pub bot_visitors: Counter,
    /// Non-bot visitors by device class
    pub devices: Counter,
    pub browsers: Counter,
    pub operating_systems: Counter,
    pub preferred_languages: Counter,
    pub encodings: Counter,
    pub countries: Counter,
    pub methods: Counter,
    pub protocols: Counter,
    /// TLS protocol -> cipher suite -> requests
    pub tls: BTreeMap<String, Counter>,
    pub content_types: Counter,
    pub referers: Counter,
    pub statuses: BTreeMap<u16, u64>,
    /// Path -> requests per status class
    pub locations: BTreeMap<String, [u64; STATUS_CLASSES]>,
}

/// Request metrics for one scope (a host's whole window, or one hour of it)
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricBucket {
    #[serde(rename = "totalRequests")]
    pub requests: u64,
    #[serde(rename = "totalLatency")]
    pub latency: f64,
    #[serde(rename = "totalSentBytes")]
    pub sent_bytes: u64,
    #[serde(rename = "uniqueVisitors")]
    pub visitors: u64,
    #[serde(skip)]
    observed: HashSet<VisitorKey>,
    #[serde(skip)]
    observed_bots: HashSet<VisitorKey>,
}

impl MetricBucket {
    pub fn record_request(&mut self, size: u64, duration: f64) {
        self.requests += 1;
        self.sent_bytes += size;
        self.latency += duration;
    }

    /// Whether `key` has already been classified in this bucket, as either
    /// a visitor or a bot
    pub fn has_seen(&self, key: &VisitorKey) -> bool {
        self.observed.contains(key) || self.observed_bots.contains(key)
    }

    pub fn mark_visitor(&mut self, key: VisitorKey) {
        if self.observed.insert(key) {
            self.visitors += 1;
        }
    }

    pub fn mark_bot(&mut self, key: VisitorKey) {
        self.observed_bots.insert(key);
    }

    pub fn observed(&self) -> impl Iterator<Item = &VisitorKey> {
        self.observed.iter()
    }

    pub fn observed_bots(&self) -> impl Iterator<Item = &VisitorKey> {
        self.observed_bots.iter()
    }
}

/// Identity of a unique visitor: remote IP without port plus the raw
/// first `User-Agent` value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisitorKey {
    pub ip: String,
    pub agent: String,
}

impl VisitorKey {
    pub fn new(ip: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            agent: agent.into(),
        }
    }

    pub fn from_event(event: &RequestEvent) -> Self {
        Self::new(strip_port(&event.remote_address), event.first_user_agent())
    }
}

/// Start of the hour containing `timestamp` (whole unix seconds)
pub fn hour_bucket(timestamp: f64) -> i64 {
    let secs = timestamp.floor() as i64;
    secs - secs.rem_euclid(HOUR_SECS)
}

/// Index into a path's status-class counter; 0 covers cancelled/invalid
/// statuses and everything from 500 up lands in 5
pub fn status_class(status: u16) -> usize {
    usize::from(status / 100).min(STATUS_CLASSES - 1)
}
