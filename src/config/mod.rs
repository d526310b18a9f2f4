use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub logs: LogsConfig,
    pub geoip: GeoIpConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub frontend: FrontendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    /// Directory holding the access logs
    pub directory: PathBuf,
    /// Glob matched against file names inside `directory`
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIpConfig {
    /// MaxMind GeoLite2/GeoIP2 Country or City database
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Path to directory containing static frontend files
    /// If None, uses embedded frontend
    pub static_dir: Option<String>,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Config {
    pub const DEFAULT_LOG_DIRECTORY: &'static str = "/var/log/caddy";
    pub const DEFAULT_LOG_PATTERN: &'static str = "*.log*";
    pub const DEFAULT_PORT: u16 = 5734;
    pub const DEFAULT_CACHE_SECS: u64 = 10;

    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let directory = std::env::var("LOGS")
            .unwrap_or_else(|_| Self::DEFAULT_LOG_DIRECTORY.to_string())
            .into();
        let pattern =
            std::env::var("LOG_PATTERN").unwrap_or_else(|_| Self::DEFAULT_LOG_PATTERN.to_string());

        let db_path = std::env::var("GEO").unwrap_or_default().into();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match std::env::var("PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("PORT must be a port number, got {value:?}"))?,
            Err(_) => Self::DEFAULT_PORT,
        };

        let ttl_secs = match std::env::var("CACHE") {
            Ok(value) => value
                .parse::<u64>()
                .with_context(|| format!("CACHE must be a number of seconds, got {value:?}"))?,
            Err(_) => Self::DEFAULT_CACHE_SECS,
        };

        let static_dir = std::env::var("FRONTEND_STATIC_DIR").ok();

        Ok(Config {
            logs: LogsConfig { directory, pattern },
            geoip: GeoIpConfig { db_path },
            server: ServerConfig { host, port },
            cache: CacheConfig { ttl_secs },
            frontend: FrontendConfig { static_dir },
        })
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cache.ttl_secs < 1 {
            bail!("Invalid cache time: must be at least 1 second");
        }
        if self.server.port < 1024 {
            bail!("Invalid port number {}: must be 1024-65535", self.server.port);
        }
        if self.geoip.db_path.as_os_str().is_empty() {
            bail!("No GeoIP database specified (set GEO or --geo)");
        }
        if self.logs.pattern.is_empty() {
            bail!("Log file pattern must not be empty");
        }
        Ok(())
    }
}
