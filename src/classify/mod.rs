//! Visitor classification: user agents, header values and geolocation
//!
//! Everything here is free of shared state and safe to call from any thread.

pub mod geoip;
pub mod headers;
pub mod user_agent;

pub use geoip::{country_for_ip, CountryLookup, GeoDatabase, GeoIpService, MaxMindDatabase};
pub use user_agent::{UserAgentClassifier, UserAgentFacts, VisitorKind};
