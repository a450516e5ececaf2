//! CSV export mode for the Batch Orchestrator (spec.md §4.7): streams the
//! same pipeline's results as CSV rows, chunked roughly every 100 rows,
//! with a truncation summary row appended if the client disconnects or the
//! deadline is hit before every bundle completes.

use bytes::Bytes;
use futures::stream::{self, Stream};
use tokio::sync::mpsc;

use crate::models::BundleResult;

const ROWS_PER_FLUSH: usize = 100;

const HEADER: &[&str] = &[
    "bundleId",
    "storeType",
    "success",
    "domain",
    "error",
    "appAdsExists",
    "appAdsUrl",
    "totalLines",
    "validLines",
    "uniquePublishers",
    "directCount",
    "resellerCount",
    "otherCount",
    "searchMatchCount",
];

fn row_for(result: &BundleResult) -> Vec<String> {
    match result {
        BundleResult::Success { bundle_id, store_type, domain, app_ads_txt } => {
            let analyzed = app_ads_txt.analyzed.as_ref();
            vec![
                bundle_id.clone(),
                store_type.to_string(),
                "true".to_string(),
                domain.clone(),
                String::new(),
                app_ads_txt.exists.to_string(),
                app_ads_txt.url.clone(),
                analyzed.map(|a| a.total_lines.to_string()).unwrap_or_default(),
                analyzed.map(|a| a.valid_lines.to_string()).unwrap_or_default(),
                analyzed.map(|a| a.unique_publishers.to_string()).unwrap_or_default(),
                analyzed.map(|a| a.relationships.direct.to_string()).unwrap_or_default(),
                analyzed.map(|a| a.relationships.reseller.to_string()).unwrap_or_default(),
                analyzed.map(|a| a.relationships.other.to_string()).unwrap_or_default(),
                app_ads_txt
                    .search_results
                    .as_ref()
                    .map(|s| s.count.to_string())
                    .unwrap_or_default(),
            ]
        }
        BundleResult::Error { bundle_id, store_type, error } => vec![
            bundle_id.clone(),
            store_type.to_string(),
            "false".to_string(),
            String::new(),
            error.clone(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ],
    }
}

enum Phase {
    Header,
    Rows,
    Summary,
    Done,
}

struct Gen {
    rx: mpsc::Receiver<BundleResult>,
    phase: Phase,
    total: usize,
    success_count: usize,
    error_count: usize,
}

pub fn csv_body_stream(rx: mpsc::Receiver<BundleResult>) -> impl Stream<Item = Result<Bytes, std::convert::Infallible>> {
    let gen = Gen { rx, phase: Phase::Header, total: 0, success_count: 0, error_count: 0 };

    stream::unfold(gen, |mut gen| async move {
        loop {
            match gen.phase {
                Phase::Header => {
                    gen.phase = Phase::Rows;
                    let mut writer = csv::Writer::from_writer(Vec::new());
                    writer.write_record(HEADER).ok();
                    let bytes = writer.into_inner().unwrap_or_default();
                    return Some((Ok(Bytes::from(bytes)), gen));
                }
                Phase::Rows => {
                    let mut writer = csv::Writer::from_writer(Vec::new());
                    let mut buffered = 0;
                    loop {
                        match gen.rx.recv().await {
                            Some(result) => {
                                gen.total += 1;
                                if result.is_success() {
                                    gen.success_count += 1;
                                } else {
                                    gen.error_count += 1;
                                }
                                writer.write_record(row_for(&result)).ok();
                                buffered += 1;
                                if buffered >= ROWS_PER_FLUSH {
                                    break;
                                }
                            }
                            None => {
                                gen.phase = Phase::Summary;
                                break;
                            }
                        }
                    }
                    let bytes = writer.into_inner().unwrap_or_default();
                    if bytes.is_empty() && matches!(gen.phase, Phase::Summary) {
                        continue;
                    }
                    return Some((Ok(Bytes::from(bytes)), gen));
                }
                Phase::Summary => {
                    gen.phase = Phase::Done;
                    let summary = format!(
                        "# total={},success={},error={}\n",
                        gen.total, gen.success_count, gen.error_count
                    );
                    return Some((Ok(Bytes::from(summary)), gen));
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
    async fn emits_header_rows_and_summary() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(BundleResult::Error {
            bundle_id: "b1".to_string(),
            store_type: "unknown",
            error: "UnsupportedBundle".to_string(),
        })
        .await
        .unwrap();
        drop(tx);

        let mut body = csv_body_stream(rx);
        let mut collected = String::new();
        while let Some(chunk) = body.next().await {
            collected.push_str(std::str::from_utf8(&chunk.unwrap()).unwrap());
        }

        assert!(collected.starts_with("bundleId,storeType"));
        assert!(collected.contains("b1,unknown,false"));
        assert!(collected.contains("# total=1,success=0,error=1"));
    }
}
