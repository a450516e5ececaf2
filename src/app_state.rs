//! Process-wide singletons shared across request handlers (spec.md §9):
//! the cache, rate limiter, fetcher, worker pool, analyzer, and config all
//! live here behind cheap-to-clone handles, mirroring the teacher's
//! `AppState` pattern (just with more than one shared resource).

use std::sync::Arc;
use std::time::Duration;

use crate::analyzer::worker_pool::WorkerPool;
use crate::analyzer::Analyzer;
use crate::cache::Cache;
use crate::config::Config;
use crate::fetcher::Fetcher;
use crate::orchestrator::Orchestrator;
use crate::rate_limiter::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Cache,
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let cache_dir = if config.cache_dir.trim().is_empty() {
            None
        } else {
            Some(std::path::PathBuf::from(&config.cache_dir))
        };
        let cache = Cache::new(
            config.cache_l1_capacity,
            cache_dir,
            Duration::from_secs(config.cache_default_ttl_secs),
        );

        let rate_limiter = RateLimiter::new();
        let fetcher = Fetcher::new(
            rate_limiter,
            cache.clone(),
            config.fetch_timeout_secs,
            config.fetch_max_retries,
        )?;

        let pool = Arc::new(WorkerPool::new(config.worker_min, config.worker_max));
        let analyzer = Arc::new(Analyzer::new(pool, Duration::from_secs(config.worker_task_timeout_secs)));

        let orchestrator = Orchestrator::new(fetcher, analyzer, config.clone());

        Ok(Self { config, cache, orchestrator })
    }
}
