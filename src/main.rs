use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use logstat::api;
use logstat::cache::StatsCache;
use logstat::classify::MaxMindDatabase;
use logstat::config::Config;
use logstat::ingest::LogSource;
use logstat::stats::LogPipeline;

/// Serve statistics aggregated from Caddy access logs
#[derive(Parser)]
#[command(name = "logstat", version, about, long_about = None)]
struct Cli {
    /// Directory where the access logs are stored [env: LOGS]
    #[arg(long)]
    logs: Option<PathBuf>,
    /// Glob for log file names inside the log directory [env: LOG_PATTERN]
    #[arg(long)]
    pattern: Option<String>,
    /// MaxMind GeoLite2 Country database (.mmdb) [env: GEO]
    #[arg(long)]
    geo: Option<PathBuf>,
    /// Address to listen on [env: HOST]
    #[arg(long)]
    host: Option<String>,
    /// Port to serve the web interface on [env: PORT]
    #[arg(long)]
    port: Option<u16>,
    /// Seconds to keep parse results before discarding them [env: CACHE]
    #[arg(long)]
    cache: Option<u64>,
    /// Serve the frontend from this directory instead of the embedded copy [env: FRONTEND_STATIC_DIR]
    #[arg(long)]
    static_dir: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(logs) = self.logs {
            config.logs.directory = logs;
        }
        if let Some(pattern) = self.pattern {
            config.logs.pattern = pattern;
        }
        if let Some(geo) = self.geo {
            config.geoip.db_path = geo;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(cache) = self.cache {
            config.cache.ttl_secs = cache;
        }
        if self.static_dir.is_some() {
            config.frontend.static_dir = self.static_dir;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration; flags win over the environment
    let mut config = Config::from_env()?;
    Cli::parse().apply(&mut config);
    config.validate()?;
    info!("Loaded configuration");

    let source = LogSource::new(&config.logs.directory, config.logs.pattern.clone());
    let geo = Arc::new(MaxMindDatabase::new(&config.geoip.db_path));
    let pipeline = Arc::new(LogPipeline::new(source, geo));
    let cache = Arc::new(StatsCache::new(pipeline, config.cache.ttl()));

    info!(
        "Reading logs matching {:?} in {} (results cached for {:?})",
        config.logs.pattern,
        config.logs.directory.display(),
        cache.ttl()
    );
    info!("Using GeoIP database {}", config.geoip.db_path.display());
    if let Some(ref static_dir) = config.frontend.static_dir {
        info!("Serving frontend from directory: {}", static_dir);
    } else {
        info!("Serving embedded frontend");
    }

    let router = api::create_router(cache, config.frontend.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("   - Statistics available at http://{}/data", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
