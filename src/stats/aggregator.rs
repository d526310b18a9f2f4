//! Folds request events into per-host, per-hour statistics
//!
//! Visitor facts (device, browser, OS, language, encodings) are derived once
//! per visitor per bucket, at first sight. Country lookups are deferred until
//! every event has been folded so each distinct IP is resolved only once.

use std::collections::HashMap;
use tracing::debug;

use crate::classify::geoip::{country_for_ip, CountryLookup, GeoDatabase};
use crate::classify::headers::{
    cipher_suite_name, content_type, preferred_language, strip_port, supported_encodings,
    tls_protocol_name,
};
use crate::classify::{UserAgentClassifier, UserAgentFacts};
use crate::error::{GeoError, PipelineResult};
use crate::ingest::RequestEvent;
use crate::stats::models::{hour_bucket, status_class, Counter, Statistics, VisitorKey};

/// Accumulates the statistics of one pass
pub struct Aggregator {
    stats: Statistics,
    classifier: UserAgentClassifier,
}

impl Aggregator {
    pub fn new(log_directory: impl Into<String>) -> Self {
        Self {
            stats: Statistics::new(log_directory),
            classifier: UserAgentClassifier::new(),
        }
    }

    /// Fold one event into the statistics
    pub fn add(&mut self, event: &RequestEvent) {
        self.stats.log_lines += 1;
        self.stats.widen(event.timestamp);

        let classifier = &self.classifier;
        let host = self
            .stats
            .hosts
            .entry(strip_port(&event.host).to_string())
            .or_default();

        let key = VisitorKey::from_event(event);
        // Classified lazily: only needed when a bucket has not seen the visitor
        let mut facts: Option<UserAgentFacts> = None;

        host.total.record_request(event.size, event.duration);
        if !host.total.has_seen(&key) {
            let ua = facts.get_or_insert_with(|| classifier.classify(&key.agent));
            if ua.is_bot() {
                bump(&mut host.bot_visitors, &ua.browser);
                host.total.mark_bot(key.clone());
            } else {
                bump(&mut host.devices, ua.device_class());
                bump(&mut host.browsers, &ua.browser);
                bump(&mut host.operating_systems, &ua.os);
                bump(
                    &mut host.preferred_languages,
                    preferred_language(&event.accept_language),
                );
                for encoding in supported_encodings(&event.accept_encoding) {
                    bump(&mut host.encodings, &encoding);
                }
                host.total.mark_visitor(key.clone());
            }
        }

        let bucket = host.hourly.entry(hour_bucket(event.timestamp)).or_default();
        bucket.record_request(event.size, event.duration);
        if !bucket.has_seen(&key) {
            let ua = facts.get_or_insert_with(|| classifier.classify(&key.agent));
            if ua.is_bot() {
                bucket.mark_bot(key);
            } else {
                bucket.mark_visitor(key);
            }
        }

        let ciphers = host
            .tls
            .entry(tls_protocol_name(event.tls_version).to_string())
            .or_default();
        bump(ciphers, &cipher_suite_name(event.tls_cipher));

        bump(&mut host.content_types, content_type(&event.content_type));
        if let Some(referer) = event.referer.first() {
            bump(&mut host.referers, referer);
        }

        host.locations.entry(event.path.clone()).or_default()[status_class(event.status)] += 1;
        *host.statuses.entry(event.status).or_default() += 1;

        bump(&mut host.methods, &event.method);
        bump(&mut host.protocols, &event.protocol);
    }

    /// Resolve the country of every visitor seen and return the finished tree.
    ///
    /// Any failed lookup fails the whole pass.
    pub fn finish(mut self, geo: &dyn CountryLookup) -> Result<Statistics, GeoError> {
        let mut resolved: HashMap<String, String> = HashMap::new();

        for (name, host) in self.stats.hosts.iter_mut() {
            let visitors = host.total.observed().chain(host.total.observed_bots());
            for key in visitors {
                if !resolved.contains_key(&key.ip) {
                    let country = country_for_ip(geo, &key.ip)?;
                    resolved.insert(key.ip.clone(), country);
                }
                bump(&mut host.countries, &resolved[&key.ip]);
            }
            debug!(
                "Resolved countries for {} visitors of {}",
                host.countries.values().sum::<u64>(),
                name
            );
        }

        debug!("Resolved {} distinct visitor IPs", resolved.len());
        Ok(self.stats)
    }
}

/// Fold a sequence of decoded events into statistics.
///
/// The first error in `events` aborts the pass. The geolocation database is
/// opened only after every event has been folded and is closed on return.
pub fn aggregate<I>(
    events: I,
    log_directory: &str,
    geo: &dyn GeoDatabase,
) -> PipelineResult<Statistics>
where
    I: IntoIterator<Item = PipelineResult<RequestEvent>>,
{
    let mut aggregator = Aggregator::new(log_directory);
    for event in events {
        aggregator.add(&event?);
    }

    let lookup = geo.open()?;
    Ok(aggregator.finish(lookup.as_ref())?)
}

fn bump(counter: &mut Counter, label: &str) {
    match counter.get_mut(label) {
        Some(count) => *count += 1,
        None => {
            counter.insert(label.to_string(), 1);
        }
    }
}
