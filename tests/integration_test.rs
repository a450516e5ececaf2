// Integration tests: compose the classifier, extractor, analyzer, cache and
// rate limiter together the way the orchestrator does, without any real
// network I/O. Each test exercises public API surface across module
// boundaries rather than a single function in isolation.

use std::sync::Arc;
use std::time::Duration;

use adstxt_extractor::analyzer::worker_pool::{Priority, WorkerPool};
use adstxt_extractor::analyzer::Analyzer;
use adstxt_extractor::cache::Cache;
use adstxt_extractor::classifier;
use adstxt_extractor::extractor;
use adstxt_extractor::models::{SearchTerm, StoreKind, StructuredTerm};
use adstxt_extractor::rate_limiter::RateLimiter;

// ============================================================================
// CLASSIFY -> EXTRACT DOMAIN
// ============================================================================

#[test]
fn classify_then_extract_domain_for_google_play_listing() {
    let (kind, url) = classifier::classify("com.acme.widgets");
    assert_eq!(kind, StoreKind::GooglePlay);
    assert!(url.unwrap().contains("com.acme.widgets"));

    let html = r#"<meta property="appstore:developer_url" content="https://acme.com">"#;
    let domain = extractor::extract_domain(kind, html).unwrap();
    assert_eq!(domain, "acme.com");
}

#[test]
fn classify_then_extract_domain_for_app_store_listing() {
    let (kind, url) = classifier::classify("id987654321");
    assert_eq!(kind, StoreKind::AppStore);
    assert!(url.unwrap().ends_with("id987654321"));

    let html = r#"<p>No developer website link is present on this listing.</p>"#;
    let domain = extractor::extract_domain(kind, html);
    assert!(domain.is_err(), "a listing with no matching anchor should fail extraction");
}

#[test]
fn unsupported_bundle_never_reaches_extraction() {
    let (kind, url) = classifier::classify("12345");
    assert_eq!(kind, StoreKind::RokuNumeric);
    assert!(url.is_none(), "numeric Roku channel ids have no store listing to fetch");
}

// ============================================================================
// CACHE + ANALYZER
// ============================================================================

fn sample_app_ads_txt() -> String {
    [
        "# comment line",
        "",
        "acme.com, pub-1234, DIRECT, f08c47fec0942fa0",
        "other.net, pub-5678, RESELLER",
        "acme.com, pub-1234, DIRECT",
        "malformed-line-only-one-field",
    ]
    .join("\n")
}

#[tokio::test]
async fn cache_stores_fetched_body_and_analyzer_summarizes_it() {
    let cache = Cache::new(10, None, Duration::from_secs(60));
    let key = "https://acme.com/app-ads.txt";
    let body = sample_app_ads_txt();

    cache.put(key, body.clone(), Duration::from_secs(60)).await;
    let cached = cache.get(key).await.expect("cache should return the body it was given");
    assert_eq!(cached, body);

    let pool = Arc::new(WorkerPool::new(1, 2));
    let analyzer = Analyzer::new(pool, Duration::from_secs(5));
    let (analyzed, search) = analyzer.analyze(cached, Vec::new()).await.unwrap();

    assert_eq!(analyzed.total_lines, 6);
    assert_eq!(analyzed.comment_lines, 1);
    assert_eq!(analyzed.empty_lines, 1);
    assert_eq!(analyzed.valid_lines, 3);
    assert_eq!(analyzed.invalid_lines, 1);
    assert_eq!(analyzed.unique_publishers, 2);
    assert_eq!(analyzed.relationships.direct, 2);
    assert_eq!(analyzed.relationships.reseller, 1);
    assert!(search.is_none(), "no search terms were supplied");
}

#[tokio::test]
async fn analyzer_runs_structured_and_free_text_search_together() {
    let pool = Arc::new(WorkerPool::new(1, 2));
    let analyzer = Analyzer::new(pool, Duration::from_secs(5));
    let body = sample_app_ads_txt();

    let terms = vec![
        SearchTerm::FreeText("other.net".to_string()),
        SearchTerm::Structured(StructuredTerm {
            domain: Some("acme.com".to_string()),
            publisher_id: None,
            relationship: Some("DIRECT".to_string()),
            tag_id: None,
        }),
    ];

    let (_, search) = analyzer.analyze(body, terms).await.unwrap();
    let search = search.expect("search terms were supplied");
    assert_eq!(search.terms, 2);

    let free_text_hits = &search.per_term[0];
    assert_eq!(free_text_hits.count, 1);

    let structured_hits = &search.per_term[1];
    assert_eq!(structured_hits.count, 2, "both acme.com DIRECT lines should match");

    // The free-text group and the structured group are disjoined: the union
    // counts each matching line once even though a line could in principle
    // satisfy both groups.
    assert!(search.count <= free_text_hits.count + structured_hits.count);
}

#[tokio::test]
async fn free_text_terms_require_all_substrings_on_the_same_line() {
    let pool = Arc::new(WorkerPool::new(1, 2));
    let analyzer = Analyzer::new(pool, Duration::from_secs(5));
    let body = sample_app_ads_txt();

    // "other.net" and "pub-5678" both appear, but only together on line 4.
    let terms = vec![SearchTerm::FreeText("other.net".to_string()), SearchTerm::FreeText("pub-5678".to_string())];
    let (_, search) = analyzer.analyze(body.clone(), terms).await.unwrap();
    let search = search.expect("search terms were supplied");
    assert_eq!(search.count, 1);
    assert_eq!(search.per_term[0].count, 1);
    assert_eq!(search.per_term[1].count, 1);

    // "other.net" and "acme.com" never appear on the same line, so the
    // AND-group matches nothing even though each substring matches alone.
    let terms = vec![SearchTerm::FreeText("other.net".to_string()), SearchTerm::FreeText("acme.com".to_string())];
    let (_, search) = analyzer.analyze(body, terms).await.unwrap();
    let search = search.expect("search terms were supplied");
    assert_eq!(search.count, 0);
    assert_eq!(search.per_term[0].count, 0);
    assert_eq!(search.per_term[1].count, 0);
}

// ============================================================================
// RATE LIMITER ACROSS STORE KINDS
// ============================================================================

#[tokio::test]
async fn rate_limiter_tracks_each_store_kind_independently() {
    let limiter = RateLimiter::new();

    limiter.report_error(StoreKind::GooglePlay, Some(429)).await;
    limiter.report_success(StoreKind::AppStore).await;

    // Acquiring for an untouched kind should not block on the backoff
    // applied to GooglePlay above.
    let start = std::time::Instant::now();
    limiter.acquire(StoreKind::AppStore).await;
    assert!(start.elapsed() < Duration::from_millis(50));
}

// ============================================================================
// FULL SYNTHETIC PIPELINE (classify -> extract -> analyze), no network I/O
// ============================================================================

#[tokio::test]
async fn full_pipeline_without_network_io() {
    let (kind, store_url) = classifier::classify("com.acme.widgets");
    assert_eq!(kind, StoreKind::GooglePlay);
    assert!(store_url.is_some());

    // Stand in for the fetched store listing HTML.
    let listing_html =
        r#"<meta property="appstore:developer_url" content="https://www.acme.com/support">"#;
    let domain = extractor::extract_domain(kind, listing_html).unwrap();
    assert_eq!(domain, "acme.com", "www. prefix should be stripped during normalization");

    // Stand in for the fetched app-ads.txt body at that domain.
    let app_ads_body = format!("{domain}, pub-0001, DIRECT, f08c47fec0942fa0\n");

    let pool = Arc::new(WorkerPool::new(1, 2));
    let analyzer = Analyzer::new(pool, Duration::from_secs(5));
    let (analyzed, _) = analyzer
        .analyze(app_ads_body, vec![SearchTerm::FreeText("pub-0001".to_string())])
        .await
        .unwrap();

    assert_eq!(analyzed.valid_lines, 1);
    assert_eq!(analyzed.unique_publishers, 1);
}

// ============================================================================
// WORKER POOL PRIORITY UNDER CONTENTION, EXERCISED THROUGH THE ANALYZER
// ============================================================================

#[tokio::test]
async fn analyzer_honors_worker_timeout_for_oversized_input() {
    // A task_timeout of zero should immediately time out regardless of how
    // small the input is, proving the timeout wiring reaches the pool.
    let pool = Arc::new(WorkerPool::new(1, 1));
    let analyzer = Analyzer::new(pool, Duration::from_nanos(1));

    let result = analyzer.analyze("acme.com, pub-1, DIRECT\n".to_string(), Vec::new()).await;
    assert!(result.is_err(), "a near-zero timeout should not let the task complete in time");
}

#[tokio::test]
async fn worker_pool_priority_direct_submission() {
    let pool = WorkerPool::new(1, 1);
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    // Block the single worker so both submissions queue up before either runs.
    let (unblock_tx, unblock_rx) = std::sync::mpsc::channel::<()>();
    let _blocker = pool.submit(Priority::Low, move || {
        let _ = unblock_rx.recv();
    });

    let order_low = order.clone();
    let low = pool.submit(Priority::Low, move || {
        order_low.lock().unwrap().push("low");
    });
    let order_high = order.clone();
    let high = pool.submit(Priority::High, move || {
        order_high.lock().unwrap().push("high");
    });

    unblock_tx.send(()).unwrap();
    low.await.unwrap();
    high.await.unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["high", "low"]);
}
