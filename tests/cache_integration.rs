//! Result cache integration tests
//!
//! These tests verify that concurrent requests share a single aggregation
//! pass, that failures reach every waiter without being cached, that a
//! caller going away mid-pass does not start another one, and that results
//! expire after their time-to-live.

use async_trait::async_trait;
use logstat::cache::StatsCache;
use logstat::error::{PipelineError, PipelineResult};
use logstat::stats::{Statistics, StatsSource};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counts passes; every pass reports its own number in `log_lines`
struct CountingSource {
    passes: AtomicUsize,
    delay: Duration,
    failing: AtomicBool,
}

impl CountingSource {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            passes: AtomicUsize::new(0),
            delay,
            failing: AtomicBool::new(false),
        })
    }

    fn passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatsSource for CountingSource {
    async fn collect(&self) -> PipelineResult<Statistics> {
        let pass = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;

        if self.failing.load(Ordering::SeqCst) {
            return Err(PipelineError::SourceUnavailable {
                path: PathBuf::from("/var/log/caddy"),
                reason: format!("pass {pass} failed"),
            });
        }

        let mut stats = Statistics::new("/var/log/caddy");
        stats.log_lines = pass as u64;
        Ok(stats)
    }
}

fn log_lines(json: &[u8]) -> u64 {
    let value: serde_json::Value = serde_json::from_slice(json).unwrap();
    value["logLines"].as_u64().unwrap()
}

#[tokio::test]
async fn test_concurrent_callers_share_one_pass() {
    let source = CountingSource::new(Duration::from_millis(200));
    let cache = Arc::new(StatsCache::new(source.clone(), Duration::from_secs(60)));

    let mut handles = vec![];
    for _ in 0..16 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move { cache.produce_json().await }));
    }

    let mut results = vec![];
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(source.passes(), 1, "Only one pass should have run");
    assert!(results.iter().all(|json| json == &results[0]));
    assert_eq!(log_lines(&results[0]), 1);
}

#[tokio::test]
async fn test_fresh_result_is_reused() {
    let source = CountingSource::new(Duration::ZERO);
    let cache = StatsCache::new(source.clone(), Duration::from_secs(60));

    let first = cache.produce_json().await.unwrap();
    let second = cache.produce_json().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(source.passes(), 1);
}

#[tokio::test]
async fn test_result_expires_after_ttl() {
    let source = CountingSource::new(Duration::ZERO);
    let cache = StatsCache::new(source.clone(), Duration::from_millis(300));
    assert_eq!(cache.ttl(), Duration::from_millis(300));

    let first = cache.produce_json().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let cached = cache.produce_json().await.unwrap();
    assert_eq!(first, cached);
    assert_eq!(source.passes(), 1);

    tokio::time::sleep(Duration::from_millis(400)).await;
    let refreshed = cache.produce_json().await.unwrap();
    assert_eq!(source.passes(), 2);
    assert_eq!(log_lines(&refreshed), 2);
}

#[tokio::test]
async fn test_failure_is_shared_and_not_cached() {
    let source = CountingSource::new(Duration::from_millis(200));
    source.failing.store(true, Ordering::SeqCst);
    let cache = Arc::new(StatsCache::new(source.clone(), Duration::from_secs(60)));

    let mut handles = vec![];
    for _ in 0..8 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move { cache.produce_json().await }));
    }

    let mut errors = vec![];
    for handle in handles {
        errors.push(handle.await.unwrap().unwrap_err());
    }

    assert_eq!(source.passes(), 1);
    assert!(errors.iter().all(|e| Arc::ptr_eq(e, &errors[0])));
    assert!(matches!(
        errors[0].as_ref(),
        PipelineError::SourceUnavailable { .. }
    ));

    // The next caller starts a new pass instead of seeing the old error
    source.failing.store(false, Ordering::SeqCst);
    let json = cache.produce_json().await.unwrap();
    assert_eq!(source.passes(), 2);
    assert_eq!(log_lines(&json), 2);
}

#[tokio::test]
async fn test_invalidate_forces_new_pass() {
    let source = CountingSource::new(Duration::ZERO);
    let cache = StatsCache::new(source.clone(), Duration::from_secs(60));

    cache.produce_json().await.unwrap();
    cache.invalidate().await;
    let json = cache.produce_json().await.unwrap();

    assert_eq!(source.passes(), 2);
    assert_eq!(log_lines(&json), 2);
}

/// Blocks a worker thread for the whole pass and tracks overlapping passes
struct BlockingSource {
    passes: AtomicUsize,
    running: Arc<AtomicUsize>,
    max_running: Arc<AtomicUsize>,
}

#[async_trait]
impl StatsSource for BlockingSource {
    async fn collect(&self) -> PipelineResult<Statistics> {
        let pass = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        let running = self.running.clone();
        let max_running = self.max_running.clone();

        tokio::task::spawn_blocking(move || {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            max_running.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(400));
            running.fetch_sub(1, Ordering::SeqCst);
        })
        .await?;

        let mut stats = Statistics::new("/var/log/caddy");
        stats.log_lines = pass as u64;
        Ok(stats)
    }
}

#[tokio::test]
async fn test_dropped_caller_does_not_start_second_pass() {
    let source = Arc::new(BlockingSource {
        passes: AtomicUsize::new(0),
        running: Arc::new(AtomicUsize::new(0)),
        max_running: Arc::new(AtomicUsize::new(0)),
    });
    let cache = Arc::new(StatsCache::new(source.clone(), Duration::from_secs(60)));

    let leader = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.produce_json().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let waiter = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.produce_json().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The leader's client disconnects mid-pass
    leader.abort();
    assert!(leader.await.unwrap_err().is_cancelled());

    let json = waiter.await.unwrap().unwrap();
    assert_eq!(log_lines(&json), 1);
    assert_eq!(source.passes.load(Ordering::SeqCst), 1, "Only one pass should have run");
    assert_eq!(source.max_running.load(Ordering::SeqCst), 1);

    // The finished pass is cached even though its first caller is gone
    let again = cache.produce_json().await.unwrap();
    assert_eq!(again, json);
    assert_eq!(source.passes.load(Ordering::SeqCst), 1);
}
