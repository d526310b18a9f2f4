//! Country lookup using MaxMind GeoLite2/GeoIP2 MMDB
//!
//! The database is opened once per aggregation pass through a
//! [`GeoDatabase`] and dropped when the pass ends.

use maxminddb::{geoip2, Mmap, Reader};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::error::GeoError;

const UNKNOWN: &str = "Unknown";

/// Resolves IP addresses to country names
pub trait CountryLookup {
    /// English country name for `ip`, `None` when the database has no entry
    fn country(&self, ip: IpAddr) -> Result<Option<String>, GeoError>;
}

/// Opens a [`CountryLookup`] for the duration of one pass
pub trait GeoDatabase: Send + Sync {
    fn open(&self) -> Result<Box<dyn CountryLookup>, GeoError>;
}

/// Country name for a visitor address, `"Unknown"` if the database knows it
/// but has no name for it. Failures to parse or look up the address are errors.
pub fn country_for_ip(lookup: &dyn CountryLookup, ip: &str) -> Result<String, GeoError> {
    let addr: IpAddr = ip
        .parse()
        .map_err(|_| GeoError::InvalidAddress(ip.to_string()))?;

    match lookup.country(addr)? {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Ok(UNKNOWN.to_string()),
    }
}

/// MaxMind Country (or City) database on disk
#[derive(Debug, Clone)]
pub struct MaxMindDatabase {
    path: PathBuf,
}

impl MaxMindDatabase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl GeoDatabase for MaxMindDatabase {
    fn open(&self) -> Result<Box<dyn CountryLookup>, GeoError> {
        Ok(Box::new(GeoIpService::open(&self.path)?))
    }
}

/// Memory-mapped MaxMind reader
pub struct GeoIpService {
    reader: Reader<Mmap>,
}

impl GeoIpService {
    pub fn open(path: &std::path::Path) -> Result<Self, GeoError> {
        let reader = unsafe { Reader::open_mmap(path) }.map_err(|source| GeoError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self { reader })
    }
}

impl CountryLookup for GeoIpService {
    fn country(&self, ip: IpAddr) -> Result<Option<String>, GeoError> {
        let lookup_error = |e: maxminddb::MaxMindDbError| GeoError::Lookup {
            ip: ip.to_string(),
            reason: e.to_string(),
        };

        // A City database is a superset of Country, so this decodes either
        let result = self.reader.lookup(ip).map_err(lookup_error)?;
        let country = result.decode::<geoip2::Country>().map_err(lookup_error)?;

        Ok(country.and_then(|c| c.country.names.english.map(|s| s.to_string())))
    }
}
