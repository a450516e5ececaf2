//! Content-addressed two-tier Cache (spec.md §4.3): a hot in-process LRU
//! (L1) backed by a local file store (L2), with at-most-one-concurrent-fetch
//! deduplication via a per-key in-flight table, in the style of the
//! `in_flight_requests: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>` pattern
//! used for request coalescing elsewhere in the corpus.

mod lru;

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::sync::Mutex;

use crate::models::CacheStats;
use lru::LruCache;

const GZIP_THRESHOLD_BYTES: usize = 1000;

#[derive(Clone)]
pub struct Cache {
    l1: Arc<Mutex<LruCache<String>>>,
    l2_dir: Option<PathBuf>,
    default_ttl: Duration,
    stats: Arc<Mutex<CacheStats>>,
    in_flight: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl Cache {
    pub fn new(l1_capacity: usize, l2_dir: Option<PathBuf>, default_ttl: Duration) -> Self {
        if let Some(dir) = &l2_dir {
            let _ = std::fs::create_dir_all(dir);
        }
        Self {
            l1: Arc::new(Mutex::new(LruCache::new(l1_capacity))),
            l2_dir,
            default_ttl,
            stats: Arc::new(Mutex::new(CacheStats::default())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn l2_path(&self, key: &str) -> Option<(PathBuf, PathBuf)> {
        let dir = self.l2_dir.as_ref()?;
        let digest = format!("{:x}", md5::compute(key.as_bytes()));
        Some((dir.join(format!("{digest}.json")), dir.join(format!("{digest}.json.gz"))))
    }

    /// `get`: check L1; on miss check L2; on L2 hit, promote into L1.
    pub async fn get(&self, key: &str) -> Option<String> {
        if let Some(v) = self.l1.lock().await.get(key) {
            self.bump(|s| s.hits += 1).await;
            return Some(v);
        }

        match self.get_l2(key) {
            Some(value) => {
                tracing::info!(key, "cache L2 hit, promoting to L1");
                let evictions_delta = {
                    let mut l1 = self.l1.lock().await;
                    let before = l1.evictions;
                    l1.put(key.to_string(), value.clone(), self.default_ttl);
                    l1.evictions - before
                };
                self.bump(|s| {
                    s.hits += 1;
                    s.evictions += evictions_delta;
                })
                .await;
                Some(value)
            }
            None => {
                self.bump(|s| s.misses += 1).await;
                None
            }
        }
    }

    pub async fn put(&self, key: &str, value: String, ttl: Duration) {
        let evictions_delta = {
            let mut l1 = self.l1.lock().await;
            let before = l1.evictions;
            l1.put(key.to_string(), value.clone(), ttl);
            l1.evictions - before
        };
        if let Err(e) = self.put_l2(key, &value) {
            tracing::warn!("cache L2 write failed for key {key}: {e:#}; degrading to L1-only");
        }
        self.bump(|s| {
            s.writes += 1;
            s.evictions += evictions_delta;
        })
        .await;
    }

    /// Deduplicates concurrent misses for the same key: only one caller
    /// actually invokes `fetch_fn`; all others wait for its result.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, ttl: Duration, fetch_fn: F) -> anyhow::Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<String>>,
    {
        if let Some(v) = self.get(key).await {
            return Ok(v);
        }

        let lock = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let _guard = lock.lock().await;

        // Another waiter may have populated the cache while we waited for
        // the per-key lock.
        if let Some(v) = self.get(key).await {
            self.in_flight.lock().await.remove(key);
            return Ok(v);
        }

        let result = fetch_fn().await;
        self.in_flight.lock().await.remove(key);

        match result {
            Ok(value) => {
                self.put(key, value.clone(), ttl).await;
                Ok(value)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn stats(&self) -> CacheStats {
        self.stats.lock().await.clone()
    }

    async fn bump(&self, f: impl FnOnce(&mut CacheStats)) {
        let mut stats = self.stats.lock().await;
        f(&mut stats);
    }

    fn get_l2(&self, key: &str) -> Option<String> {
        let (plain, gz) = self.l2_path(key)?;
        // Readers prefer the .gz variant when both exist.
        if gz.exists() {
            if !self.is_fresh(&gz) {
                return None;
            }
            return read_gz(&gz).ok();
        }
        if plain.exists() {
            if !self.is_fresh(&plain) {
                return None;
            }
            return std::fs::read_to_string(&plain).ok();
        }
        None
    }

    fn is_fresh(&self, path: &Path) -> bool {
        let Ok(meta) = std::fs::metadata(path) else {
            return false;
        };
        let Ok(modified) = meta.modified() else {
            return true;
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        age <= self.default_ttl
    }

    fn put_l2(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let Some((plain, gz)) = self.l2_path(key) else {
            return Ok(());
        };
        if value.len() > GZIP_THRESHOLD_BYTES {
            write_atomic_gz(&gz, value)?;
            let _ = std::fs::remove_file(&plain);
        } else {
            write_atomic(&plain, value)?;
            let _ = std::fs::remove_file(&gz);
        }
        Ok(())
    }
}

fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    let tmp = tmp_path(path);
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn write_atomic_gz(path: &Path, contents: &str) -> anyhow::Result<()> {
    let tmp = tmp_path(path);
    {
        let file = std::fs::File::create(&tmp)?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(contents.as_bytes())?;
        encoder.finish()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    path.with_extension(format!("tmp.{unique}"))
}

fn read_gz(path: &Path) -> anyhow::Result<String> {
    let file = std::fs::File::open(path)?;
    let mut decoder = GzDecoder::new(file);
    let mut out = String::new();
    decoder.read_to_string(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "adstxt-cache-test-{:?}-{}",
            std::thread::current().id(),
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos()
        ));
        dir
    }

    #[tokio::test]
    async fn put_then_get_hits_l1() {
        let cache = Cache::new(10, None, Duration::from_secs(60));
        cache.put("k", "v".to_string(), Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await, Some("v".to_string()));
        assert_eq!(cache.stats().await.hits, 1);
    }

    #[tokio::test]
    async fn miss_is_counted() {
        let cache = Cache::new(10, None, Duration::from_secs(60));
        assert_eq!(cache.get("missing").await, None);
        assert_eq!(cache.stats().await.misses, 1);
    }

    #[tokio::test]
    async fn l2_round_trip_small_and_large_payloads() {
        let dir = temp_dir();
        let cache = Cache::new(1, Some(dir.clone()), Duration::from_secs(60));

        cache.put("small", "tiny".to_string(), Duration::from_secs(60)).await;
        let large_value = "x".repeat(5000);
        cache.put("large", large_value.clone(), Duration::from_secs(60)).await;

        // Force L1 eviction of both by inserting more than capacity allows,
        // so reads must come from L2.
        cache.put("filler", "y".to_string(), Duration::from_secs(60)).await;

        let fresh_cache = Cache::new(10, Some(dir.clone()), Duration::from_secs(60));
        assert_eq!(fresh_cache.get("small").await, Some("tiny".to_string()));
        assert_eq!(fresh_cache.get("large").await, Some(large_value));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn get_or_fetch_dedups_concurrent_misses() {
        let cache = Cache::new(10, None, Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("shared-key", Duration::from_secs(60), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok("computed".to_string())
                    })
                    .await
            }));
        }

        for h in handles {
            assert_eq!(h.await.unwrap().unwrap(), "computed");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
