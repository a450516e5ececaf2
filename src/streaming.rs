//! Stream Emitter (spec.md §4.7): turns the orchestrator's completion-order
//! `BundleResult` channel into an incrementally-flushed JSON body with
//! heartbeat comments, in the spirit of the corpus's channel-draining
//! streaming helpers.

use std::time::Duration;

use bytes::Bytes;
use futures::stream::{self, Stream};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::cache::Cache;
use crate::models::BundleResult;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(PartialEq, Eq)]
enum Phase {
    Opening,
    Items,
    Closing,
    Done,
}

struct Gen {
    rx: mpsc::Receiver<BundleResult>,
    phase: Phase,
    first: bool,
    success_count: usize,
    error_count: usize,
    total: usize,
    last_heartbeat: Instant,
    started_at: std::time::Instant,
    cache: Cache,
}

/// Produces the response body chunks for `/api/stream/extract-multiple`:
/// `{"success":true,"results":[` ... one BundleResult JSON object per
/// completed bundle (comma-separated, heartbeats interleaved) ...
/// `],"totalProcessed":N,...}`.
pub fn json_body_stream(
    rx: mpsc::Receiver<BundleResult>,
    cache: Cache,
) -> impl Stream<Item = Result<Bytes, std::convert::Infallible>> {
    let gen = Gen {
        rx,
        phase: Phase::Opening,
        first: true,
        success_count: 0,
        error_count: 0,
        total: 0,
        last_heartbeat: Instant::now(),
        started_at: std::time::Instant::now(),
        cache,
    };

    stream::unfold(gen, |mut gen| async move {
        loop {
            match gen.phase {
                Phase::Opening => {
                    gen.phase = Phase::Items;
                    return Some((Ok(Bytes::from_static(b"{\"success\":true,\"results\":[")), gen));
                }
                Phase::Items => {
                    let recv_fut = gen.rx.recv();
                    tokio::pin!(recv_fut);
                    let tick = tokio::time::sleep_until(gen.last_heartbeat + HEARTBEAT_INTERVAL);
                    tokio::pin!(tick);

                    tokio::select! {
                        biased;
                        item = &mut recv_fut => {
                            match item {
                                Some(result) => {
                                    gen.total += 1;
                                    if result.is_success() {
                                        gen.success_count += 1;
                                    } else {
                                        gen.error_count += 1;
                                    }
                                    let prefix = if gen.first { "" } else { "," };
                                    gen.first = false;
                                    let json = serde_json::to_string(&result).unwrap_or_default();
                                    return Some((Ok(Bytes::from(format!("{prefix}{json}"))), gen));
                                }
                                None => {
                                    gen.phase = Phase::Closing;
                                    continue;
                                }
                            }
                        }
                        _ = &mut tick => {
                            gen.last_heartbeat = Instant::now();
                            let ms = gen.started_at.elapsed().as_millis();
                            return Some((Ok(Bytes::from(format!("/* hb:{ms} */"))), gen));
                        }
                    }
                }
                Phase::Closing => {
                    let cache_stats = gen.cache.stats().await;
                    let processing_time = format!("{}ms", gen.started_at.elapsed().as_millis());
                    let body = format!(
                        "],\"totalProcessed\":{},\"successCount\":{},\"errorCount\":{},\"processingTime\":{:?},\"cacheStats\":{}}}",
                        gen.total,
                        gen.success_count,
                        gen.error_count,
                        processing_time,
                        serde_json::to_string(&cache_stats).unwrap_or_default(),
                    );
                    gen.phase = Phase::Done;
                    return Some((Ok(Bytes::from(body)), gen));
                }
                Phase::Done => return None,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn emits_opening_items_and_closing() {
        let (tx, rx) = mpsc::channel(4);
        let cache = Cache::new(10, None, Duration::from_secs(60));
        tx.send(BundleResult::Error {
            bundle_id: "b1".to_string(),
            store_type: "unknown",
            error: "UnsupportedBundle".to_string(),
        })
        .await
        .unwrap();
        drop(tx);

        let mut body = json_body_stream(rx, cache);
        let mut collected = String::new();
        while let Some(chunk) = body.next().await {
            collected.push_str(std::str::from_utf8(&chunk.unwrap()).unwrap());
        }

        assert!(collected.starts_with("{\"success\":true,\"results\":["));
        assert!(collected.contains("\"bundleId\":\"b1\""));
        assert!(collected.ends_with('}'));
        assert!(collected.contains("\"totalProcessed\":1"));
    }
}
