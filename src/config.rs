use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub max_bundle_ids: usize,
    pub max_search_terms: usize,
    pub max_body_bytes: usize,

    pub cache_dir: String,
    pub cache_l1_capacity: usize,
    pub cache_default_ttl_secs: u64,

    pub worker_min: usize,
    pub worker_max: usize,
    pub worker_task_timeout_secs: u64,

    pub fetch_max_bytes: usize,
    pub fetch_timeout_secs: u64,
    pub fetch_max_retries: u32,

    pub batch_deadline_secs: u64,
    pub stream_deadline_secs: u64,

    pub rust_log: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn load() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        let config = Self {
            port: env_or("PORT", 8080),
            max_bundle_ids: env_or("MAX_BUNDLE_IDS", 200),
            max_search_terms: env_or("MAX_SEARCH_TERMS", 5),
            max_body_bytes: env_or("MAX_BODY_BYTES", 1024 * 1024),

            cache_dir: env::var("CACHE_DIR").unwrap_or_else(|_| "./.cache".to_string()),
            cache_l1_capacity: env_or("CACHE_L1_CAPACITY", 2000),
            cache_default_ttl_secs: env_or("CACHE_TTL_SECS", 3600),

            worker_min: env_or("WORKER_MIN", std::cmp::max(2, cpus / 2)),
            worker_max: env_or("WORKER_MAX", std::cmp::max(4, cpus)),
            worker_task_timeout_secs: env_or("WORKER_TASK_TIMEOUT_SECS", 30),

            fetch_max_bytes: env_or("FETCH_MAX_BYTES", 20 * 1024 * 1024),
            fetch_timeout_secs: env_or("FETCH_TIMEOUT_SECS", 15),
            fetch_max_retries: env_or("FETCH_MAX_RETRIES", 3),

            batch_deadline_secs: env_or("BATCH_DEADLINE_SECS", 120),
            stream_deadline_secs: env_or("STREAM_DEADLINE_SECS", 300),

            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };

        if config.worker_max == 0 {
            panic!("WORKER_MAX must be greater than 0");
        }
        if config.max_bundle_ids == 0 {
            panic!("MAX_BUNDLE_IDS must be greater than 0");
        }

        config
    }

    pub fn concurrency(&self) -> usize {
        self.worker_max * 2
    }
}
