//! Fetcher (spec.md §4.4): performs outbound HTTP GETs with Cache
//! short-circuiting, Rate Limiter admission, retries, and a bounded
//! response size, modeled on the `reqwest::Client` setup used throughout
//! the teacher's indexers (`news-indexer/src/bin/fetch_appstore.rs`).

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::cache::Cache;
use crate::errors::FetchErrorKind;
use crate::models::StoreKind;
use crate::rate_limiter::RateLimiter;
use crate::utils::user_agent::UserAgentPool;

pub struct FetchOptions {
    pub ttl: Duration,
    pub max_bytes: usize,
}

#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    rate_limiter: RateLimiter,
    cache: Cache,
    user_agents: Arc<UserAgentPool>,
    max_retries: u32,
}

impl Fetcher {
    pub fn new(rate_limiter: RateLimiter, cache: Cache, timeout_secs: u64, max_retries: u32) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(50)
            .build()?;
        Ok(Self {
            client,
            rate_limiter,
            cache,
            user_agents: Arc::new(UserAgentPool::new()),
            max_retries,
        })
    }

    pub async fn fetch(&self, url: &str, kind: StoreKind, opts: FetchOptions) -> Result<String, FetchErrorKind> {
        if let Some(cached) = self.cache.get(url).await {
            return Ok(cached);
        }

        let body = self.fetch_uncached(url, kind, opts.max_bytes).await?;
        self.cache.put(url, body.clone(), opts.ttl).await;
        Ok(body)
    }

    async fn fetch_uncached(&self, url: &str, kind: StoreKind, max_bytes: usize) -> Result<String, FetchErrorKind> {
        let mut attempt = 0u32;
        let mut retry_after: Option<Duration> = None;

        loop {
            self.rate_limiter.acquire(kind).await;

            if let Some(wait) = retry_after.take() {
                tokio::time::sleep(wait).await;
            }

            let result = self.try_once(url, max_bytes).await;

            match result {
                Ok(body) => {
                    self.rate_limiter.report_success(kind).await;
                    return Ok(body);
                }
                Err(AttemptError::Retryable { status, retry_after: ra }) => {
                    self.rate_limiter.report_error(kind, status).await;
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Err(status
                            .map(FetchErrorKind::HttpError)
                            .unwrap_or_else(|| FetchErrorKind::Network("exhausted retries".into())));
                    }
                    retry_after = Some(ra.unwrap_or_else(|| backoff_delay(attempt)));
                }
                Err(AttemptError::Terminal(e)) => {
                    self.rate_limiter.report_error(kind, status_of(&e)).await;
                    return Err(e);
                }
            }
        }
    }

    async fn try_once(&self, url: &str, max_bytes: usize) -> Result<String, AttemptError> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", self.user_agents.next())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AttemptError::Retryable { status: None, retry_after: None }
                } else {
                    AttemptError::Terminal(FetchErrorKind::Network(e.to_string()))
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(AttemptError::Retryable { status: Some(429), retry_after });
        }
        if status.is_server_error() || status.as_u16() == 408 {
            return Err(AttemptError::Retryable { status: Some(status.as_u16()), retry_after: None });
        }
        if !status.is_success() {
            return Err(AttemptError::Terminal(FetchErrorKind::HttpError(status.as_u16())));
        }

        let bytes = read_capped(response, max_bytes).await?;
        String::from_utf8(bytes).map_err(|_| AttemptError::Terminal(FetchErrorKind::Decode))
    }
}

enum AttemptError {
    Retryable { status: Option<u16>, retry_after: Option<Duration> },
    Terminal(FetchErrorKind),
}

fn status_of(e: &FetchErrorKind) -> Option<u16> {
    match e {
        FetchErrorKind::HttpError(s) => Some(*s),
        _ => None,
    }
}

async fn read_capped(response: reqwest::Response, max_bytes: usize) -> Result<Vec<u8>, AttemptError> {
    use futures::StreamExt;

    let mut stream = response.bytes_stream();
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AttemptError::Terminal(FetchErrorKind::Network(e.to_string())))?;
        buf.extend_from_slice(&chunk);
        if buf.len() > max_bytes {
            return Err(AttemptError::Terminal(FetchErrorKind::Oversized));
        }
    }
    Ok(buf)
}

fn backoff_delay(attempt: u32) -> Duration {
    let base_ms = 1000u64 * 2u64.saturating_pow(attempt.saturating_sub(1));
    let jitter_ms = rand::thread_rng().gen_range(0..250);
    Duration::from_millis(base_ms.min(15_000) + jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let d1 = backoff_delay(1);
        let d2 = backoff_delay(2);
        assert!(d1.as_millis() >= 1000);
        assert!(d2.as_millis() >= d1.as_millis().saturating_sub(250));
        let d10 = backoff_delay(10);
        assert!(d10.as_millis() <= 15_250);
    }
}
