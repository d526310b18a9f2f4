//! Single-flight, time-bounded cache of the serialized statistics
//!
//! At most one aggregation pass runs at a time. Callers arriving while a pass
//! is in flight wait for it and share its result (or its error); a finished
//! result is served until its time-to-live, counted from the moment it was
//! stored, runs out. Failed passes are never stored.
//!
//! A pass runs on its own task behind a gate, so a caller that goes away
//! (for example a disconnected HTTP client) neither cancels it nor lets a
//! second pass start beside it.

use bytes::Bytes;
use moka::future::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::{PipelineError, PipelineResult};
use crate::stats::StatsSource;

pub struct StatsCache {
    /// Producer of fresh statistics
    source: Arc<dyn StatsSource>,
    /// Holds at most one entry: the JSON of the last successful pass
    cache: Cache<(), Bytes>,
    /// Held for the whole of a pass
    gate: Arc<Mutex<()>>,
    ttl: Duration,
}

impl StatsCache {
    pub fn new(source: Arc<dyn StatsSource>, ttl: Duration) -> Self {
        let cache = Cache::builder().time_to_live(ttl).build();
        Self {
            source,
            cache,
            gate: Arc::new(Mutex::new(())),
            ttl,
        }
    }

    /// Serialized statistics, computing them if nothing fresh is cached
    pub async fn produce_json(&self) -> Result<Bytes, Arc<PipelineError>> {
        if let Some(json) = self.cache.get(&()).await {
            debug!("Serving cached statistics");
            return Ok(json);
        }

        let pass = Pass {
            source: self.source.clone(),
            cache: self.cache.clone(),
            gate: self.gate.clone(),
            ttl: self.ttl,
        };
        self.cache
            .try_get_with((), async move { tokio::spawn(pass.run()).await? })
            .await
    }

    /// Drop the cached result so the next caller starts a new pass
    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// One detached aggregation pass
struct Pass {
    source: Arc<dyn StatsSource>,
    cache: Cache<(), Bytes>,
    gate: Arc<Mutex<()>>,
    ttl: Duration,
}

impl Pass {
    async fn run(self) -> PipelineResult<Bytes> {
        let _gate = self.gate.lock_owned().await;

        // An earlier pass may have finished while we waited for the gate
        if let Some(json) = self.cache.get(&()).await {
            debug!("Statistics became available while waiting for a running pass");
            return Ok(json);
        }

        debug!("No cached statistics, starting a new pass");
        let started = Instant::now();

        let result = self.source.collect().await.and_then(|stats| {
            serde_json::to_vec_pretty(&stats).map_err(PipelineError::Serialization)
        });

        match result {
            Ok(json) => {
                info!(
                    "Cached {} bytes of statistics for {:?} (pass took {:?})",
                    json.len(),
                    self.ttl,
                    started.elapsed()
                );
                let json = Bytes::from(json);
                // Stored here too, in case every caller of this pass went away
                self.cache.insert((), json.clone()).await;
                Ok(json)
            }
            Err(e) => {
                error!("Failed to produce statistics: {}", e);
                Err(e)
            }
        }
    }
}
