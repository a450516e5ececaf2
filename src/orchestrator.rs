//! Batch Orchestrator (spec.md §4.7): drives the per-bundle pipeline
//! (Classifier → Fetcher → Extractor → Fetcher → Analyzer) with bounded
//! concurrency, and assembles either an ordered batch or a completion-order
//! stream of results.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;

use crate::analyzer::Analyzer;
use crate::classifier;
use crate::config::Config;
use crate::errors::{FetchErrorKind, PipelineError};
use crate::extractor;
use crate::fetcher::{FetchOptions, Fetcher};
use crate::models::{AppAdsTxt, BundleResult, SearchTerm, StoreKind};

#[derive(Clone)]
pub struct Orchestrator {
    fetcher: Fetcher,
    analyzer: Arc<Analyzer>,
    config: Arc<Config>,
}

impl Orchestrator {
    pub fn new(fetcher: Fetcher, analyzer: Arc<Analyzer>, config: Arc<Config>) -> Self {
        Self { fetcher, analyzer, config }
    }

    /// Runs the pipeline for every bundle with bounded concurrency, in
    /// input order in the returned vector. Use [`Self::run_stream`] for
    /// completion-order emission.
    pub async fn run_batch(&self, bundle_ids: Vec<String>, search_terms: Vec<SearchTerm>) -> Vec<BundleResult> {
        let concurrency = self.config.concurrency();
        let deadline = Duration::from_secs(self.config.batch_deadline_secs);
        let total = bundle_ids.len();

        // `buffered` preserves input order in its output even though up to
        // `concurrency` futures run concurrently, so whatever prefix we
        // collect before the deadline lines up with `bundle_ids[..n]`.
        let mut work = stream::iter(bundle_ids.iter().cloned().map(|bundle_id| {
            let this = self.clone();
            let terms = search_terms.clone();
            async move { this.process_bundle(bundle_id, terms).await }
        }))
        .buffered(concurrency.max(1));

        let deadline_fut = tokio::time::sleep(deadline);
        tokio::pin!(deadline_fut);

        let mut results = Vec::with_capacity(total);
        loop {
            tokio::select! {
                biased;
                _ = &mut deadline_fut => break,
                next = work.next() => {
                    match next {
                        Some(result) => results.push(result),
                        None => break,
                    }
                }
            }
        }

        if results.len() < total {
            tracing::warn!(
                completed = results.len(),
                total,
                "batch deadline exceeded before all bundles finished"
            );
            for bundle_id in bundle_ids.into_iter().skip(results.len()) {
                let (kind, _) = classifier::classify(&bundle_id);
                results.push(BundleResult::Error {
                    bundle_id,
                    store_type: kind.as_str(),
                    error: "Batch deadline exceeded before this bundle could be processed".to_string(),
                });
            }
        }

        results
    }

    /// Fans out the same pipeline but emits results over an mpsc channel in
    /// completion order, for the streaming HTTP endpoints.
    pub fn run_stream(
        &self,
        bundle_ids: Vec<String>,
        search_terms: Vec<SearchTerm>,
    ) -> mpsc::Receiver<BundleResult> {
        let concurrency = self.config.concurrency();
        let deadline = Duration::from_secs(self.config.stream_deadline_secs);
        let (tx, rx) = mpsc::channel(concurrency.max(1));
        let this = self.clone();

        tokio::spawn(async move {
            let mut unordered = stream::iter(bundle_ids.into_iter().map(|bundle_id| {
                let this = this.clone();
                let terms = search_terms.clone();
                async move { this.process_bundle(bundle_id, terms).await }
            }))
            .buffer_unordered(concurrency.max(1));

            let deadline_fut = tokio::time::sleep(deadline);
            tokio::pin!(deadline_fut);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut deadline_fut => break,
                    next = unordered.next() => {
                        match next {
                            Some(result) => {
                                if tx.send(result).await.is_err() {
                                    // Receiver dropped: client disconnected.
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
        });

        rx
    }

    async fn process_bundle(&self, bundle_id: String, search_terms: Vec<SearchTerm>) -> BundleResult {
        let trimmed = bundle_id.trim().to_string();
        let (kind, store_url) = classifier::classify(&trimmed);
        tracing::debug!(bundle_id = %trimmed, kind = kind.as_str(), "classified bundle");

        let store_url = match store_url {
            Some(url) => url,
            None => {
                tracing::warn!(bundle_id = %trimmed, kind = kind.as_str(), "unsupported or unknown bundle identifier");
                return BundleResult::Error {
                    bundle_id,
                    store_type: kind.as_str(),
                    error: PipelineError::UnsupportedBundle.to_string(),
                }
            }
        };

        let listing_opts = FetchOptions {
            ttl: Duration::from_secs(self.config.cache_default_ttl_secs),
            max_bytes: self.config.fetch_max_bytes,
        };
        let html = match self.fetcher.fetch(&store_url, kind, listing_opts).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(bundle_id = %trimmed, error = %e, "store listing fetch failed");
                return BundleResult::Error {
                    bundle_id,
                    store_type: kind.as_str(),
                    error: PipelineError::from(e).to_string(),
                }
            }
        };
        tracing::debug!(bundle_id = %trimmed, "fetched store listing");

        let domain = match extractor::extract_domain(kind, &html) {
            Ok(domain) => domain,
            Err(e) => {
                tracing::warn!(bundle_id = %trimmed, "developer domain not found");
                return BundleResult::Error {
                    bundle_id,
                    store_type: kind.as_str(),
                    error: e.to_string(),
                }
            }
        };
        tracing::debug!(bundle_id = %trimmed, domain = %domain, "extracted developer domain");

        let app_ads_txt = self.fetch_and_analyze(&domain, kind, search_terms).await;
        match app_ads_txt {
            Ok(app_ads_txt) => BundleResult::Success {
                bundle_id,
                store_type: kind.as_str(),
                domain,
                app_ads_txt,
            },
            Err(e) => {
                tracing::warn!(bundle_id = %trimmed, error = %e, "app-ads pipeline failed");
                BundleResult::Error {
                    bundle_id,
                    store_type: kind.as_str(),
                    error: e.to_string(),
                }
            }
        }
    }

    async fn fetch_and_analyze(
        &self,
        domain: &str,
        kind: StoreKind,
        search_terms: Vec<SearchTerm>,
    ) -> Result<AppAdsTxt, PipelineError> {
        let url = format!("https://{domain}/app-ads.txt");
        let opts = FetchOptions {
            ttl: Duration::from_secs(self.config.cache_default_ttl_secs),
            max_bytes: self.config.fetch_max_bytes,
        };

        let body = match self.fetcher.fetch(&url, kind, opts).await {
            Ok(body) => body,
            Err(FetchErrorKind::HttpError(404)) => {
                return Ok(AppAdsTxt {
                    exists: false,
                    url,
                    content: None,
                    analyzed: None,
                    search_results: None,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let search_query = search_terms
            .into_iter()
            .filter(|t| !matches!(t, SearchTerm::Structured(s) if s.is_empty()))
            .collect::<Vec<_>>();
        let has_query = !search_query.is_empty();

        let (analyzed, search_results) = self.analyzer.analyze(body.clone(), search_query).await?;
        tracing::debug!(domain, total_lines = analyzed.total_lines, "analyzed app-ads.txt");

        Ok(AppAdsTxt {
            exists: true,
            url,
            content: Some(cap_content(&body, self.config.max_body_bytes)),
            analyzed: Some(analyzed),
            search_results: if has_query { search_results } else { None },
        })
    }
}

fn cap_content(body: &str, max_bytes: usize) -> String {
    if body.len() <= max_bytes {
        return body.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_content_respects_char_boundaries() {
        let body = "é".repeat(10); // each char is 2 bytes in utf-8
        let capped = cap_content(&body, 3);
        assert!(capped.len() <= 3);
        assert!(std::str::from_utf8(capped.as_bytes()).is_ok());
    }

    #[test]
    fn cap_content_noop_under_limit() {
        assert_eq!(cap_content("short", 100), "short");
    }
}
