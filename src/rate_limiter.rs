//! Rate Limiter (spec.md §4.2): bounds outbound requests per `StoreKind`
//! using an adaptive token-rate algorithm, persisted per-kind state guarded
//! by its own lock so kinds never contend with each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::models::StoreKind;

const MIN_RATE: f64 = 1.0;
const MAX_RATE: f64 = 20.0;

fn default_rate(kind: StoreKind) -> f64 {
    match kind {
        StoreKind::GooglePlay => 10.0,
        StoreKind::AppStore => 12.0,
        StoreKind::Amazon => 8.0 / 1.5,
        StoreKind::Roku | StoreKind::RokuNumeric => 10.0 / 1.2,
        StoreKind::Samsung => 8.0 / 1.5,
        StoreKind::Unknown => MIN_RATE,
    }
}

#[derive(Debug, Clone)]
struct KindState {
    current_rate: f64,
    last_request_at: Option<Instant>,
    consecutive_successes: u32,
    consecutive_errors: u32,
}

impl KindState {
    fn new(kind: StoreKind) -> Self {
        Self {
            current_rate: default_rate(kind),
            last_request_at: None,
            consecutive_successes: 0,
            consecutive_errors: 0,
        }
    }
}

/// Per-kind adaptive rate limiter. Cheaply cloneable; the inner map is
/// shared via `Arc`.
#[derive(Clone)]
pub struct RateLimiter {
    states: Arc<Mutex<HashMap<&'static str, KindState>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Waits until admission is granted for `kind`, then returns the
    /// current rate in requests/second.
    pub async fn acquire(&self, kind: StoreKind) -> f64 {
        let wait = {
            let mut states = self.states.lock().await;
            let state = states
                .entry(kind.as_str())
                .or_insert_with(|| KindState::new(kind));

            let min_interval = Duration::from_secs_f64(1.0 / state.current_rate);
            let wait = match state.last_request_at {
                Some(last) => {
                    let elapsed = last.elapsed();
                    if elapsed < min_interval {
                        Some(min_interval - elapsed)
                    } else {
                        None
                    }
                }
                None => None,
            };
            state.last_request_at = Some(Instant::now() + wait.unwrap_or_default());
            wait
        };

        if let Some(wait) = wait {
            tokio::time::sleep(wait).await;
        }

        let states = self.states.lock().await;
        states.get(kind.as_str()).map(|s| s.current_rate).unwrap_or(MIN_RATE)
    }

    pub async fn report_success(&self, kind: StoreKind) {
        let mut states = self.states.lock().await;
        let state = states
            .entry(kind.as_str())
            .or_insert_with(|| KindState::new(kind));

        state.consecutive_errors = 0;
        state.consecutive_successes += 1;
        if state.consecutive_successes >= 5 {
            state.current_rate = (state.current_rate + 0.1).min(MAX_RATE);
            state.consecutive_successes = 0;
            tracing::info!(kind = kind.as_str(), rate = state.current_rate, "rate limiter increased");
        }
    }

    pub async fn report_error(&self, kind: StoreKind, http_status: Option<u16>) {
        let mut states = self.states.lock().await;
        let state = states
            .entry(kind.as_str())
            .or_insert_with(|| KindState::new(kind));

        state.consecutive_successes = 0;
        state.consecutive_errors += 1;

        let factor = match http_status {
            Some(429) | Some(403) => 0.8,
            Some(s) if (500..600).contains(&s) => 0.5,
            _ => 0.5,
        };
        let exponent = (state.consecutive_errors as f64 - 1.0).min(5.0);
        let decay = factor * 2f64.powf(exponent).min(5.0);
        state.current_rate = (state.current_rate * (1.0 - decay)).max(MIN_RATE);
        tracing::info!(
            kind = kind.as_str(),
            rate = state.current_rate,
            ?http_status,
            "rate limiter backed off"
        );
    }

    #[cfg(test)]
    async fn current_rate(&self, kind: StoreKind) -> f64 {
        let states = self.states.lock().await;
        states
            .get(kind.as_str())
            .map(|s| s.current_rate)
            .unwrap_or_else(|| default_rate(kind))
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
