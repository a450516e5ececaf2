//! App-Ads Analyzer (spec.md §4.6): parses an app-ads.txt body, computes
//! summary statistics, and optionally runs search-term matching, off the
//! request thread via the [`worker_pool`].

pub mod worker_pool;

use std::collections::HashSet;
use std::time::Duration;

use crate::errors::PipelineError;
use crate::models::{
    AnalyzedAppAds, Relationships, SearchResults, SearchTerm, StructuredTerm, TermMatch, TermResult,
};
use worker_pool::{Priority, WorkerPool};

const CHUNK_SIZE: usize = 2000;

// Memory watermarks, in bytes. A Rust worker thread has no GC heap to
// probe, so bytes-of-input-processed-so-far stands in as the load proxy
// the spec's "current worker heap usage" describes.
const WATERMARK_WARN: usize = 150 * 1024 * 1024;
const WATERMARK_HIGH: usize = 250 * 1024 * 1024;
const WATERMARK_CRITICAL: usize = 350 * 1024 * 1024;

const DEFAULT_CAP: usize = 1000;
const MIN_CAP: usize = 500;
const MAX_CAP: usize = 2000;

pub struct Analyzer {
    pool: std::sync::Arc<WorkerPool>,
    task_timeout: Duration,
}

impl Analyzer {
    pub fn new(pool: std::sync::Arc<WorkerPool>, task_timeout: Duration) -> Self {
        Self { pool, task_timeout }
    }

    pub async fn analyze(
        &self,
        body: String,
        terms: Vec<SearchTerm>,
    ) -> Result<(AnalyzedAppAds, Option<SearchResults>), PipelineError> {
        let priority = if terms.is_empty() { Priority::Normal } else { Priority::High };
        let rx = self.pool.submit(priority, move || parse_and_search(&body, &terms));

        match tokio::time::timeout(self.task_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(PipelineError::Internal("worker dropped task".to_string())),
            Err(_) => Err(PipelineError::WorkerTimeout),
        }
    }
}

struct ParsedLine<'a> {
    domain: String,
    publisher_id: &'a str,
    relationship_raw: &'a str,
    tag_id: Option<&'a str>,
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_line(line: &str) -> Option<ParsedLine<'_>> {
    let fields: Vec<&str> = strip_comment(line).split(',').map(|f| f.trim()).collect();
    let non_empty: Vec<&str> = fields.iter().copied().filter(|f| !f.is_empty()).collect();
    if non_empty.len() < 3 {
        return None;
    }
    Some(ParsedLine {
        domain: non_empty[0].to_lowercase(),
        publisher_id: non_empty[1],
        relationship_raw: non_empty[2],
        tag_id: non_empty.get(3).copied(),
    })
}

fn relationship_bucket(raw: &str) -> &'static str {
    match raw.to_uppercase().as_str() {
        "DIRECT" => "direct",
        "RESELLER" => "reseller",
        _ => "other",
    }
}

fn strip_interior_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn adaptive_cap(bytes_processed: usize) -> usize {
    if bytes_processed >= WATERMARK_HIGH {
        MIN_CAP
    } else if bytes_processed >= WATERMARK_WARN {
        DEFAULT_CAP
    } else {
        MAX_CAP
    }
}

fn structured_matches(term: &StructuredTerm, parsed: &ParsedLine<'_>) -> bool {
    if term.is_empty() {
        return false;
    }
    if let Some(domain) = &term.domain {
        if parsed.domain != domain.to_lowercase() {
            return false;
        }
    }
    if let Some(publisher_id) = &term.publisher_id {
        if strip_interior_whitespace(parsed.publisher_id) != strip_interior_whitespace(publisher_id) {
            return false;
        }
    }
    if let Some(relationship) = &term.relationship {
        if !parsed
            .relationship_raw
            .to_lowercase()
            .contains(&relationship.to_lowercase())
        {
            return false;
        }
    }
    if let Some(tag_id) = &term.tag_id {
        let Some(line_tag) = parsed.tag_id else { return false };
        if strip_interior_whitespace(line_tag) != strip_interior_whitespace(tag_id) {
            return false;
        }
    }
    true
}

/// Splits on `\n`, `\r\n`, and bare `\r` alike (`str::lines` misses the last
/// one, which a classic-Mac app-ads.txt body can still use).
fn split_lines(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&body[start..i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                lines.push(&body[start..i]);
                i += 1;
                if i < bytes.len() && bytes[i] == b'\n' {
                    i += 1;
                }
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < bytes.len() {
        lines.push(&body[start..]);
    }
    lines
}

#[allow(clippy::too_many_arguments)]
fn record_match(
    term_index: usize,
    line_number: u64,
    raw_line: &str,
    per_term: &mut [TermResult],
    union_matches: &mut Vec<TermMatch>,
    union_seen: &mut HashSet<u64>,
    truncated: &mut bool,
    cap: usize,
) {
    let term_match = TermMatch { term_index, line_number, line: raw_line.trim().to_string() };
    if let Some(result) = per_term.get_mut(term_index) {
        result.count += 1;
        if result.matches.len() < cap {
            result.matches.push(term_match.clone());
        }
    }
    if union_seen.insert(line_number) {
        if union_matches.len() < cap {
            union_matches.push(term_match);
        } else {
            *truncated = true;
        }
    }
}

fn parse_and_search(
    body: &str,
    terms: &[SearchTerm],
) -> Result<(AnalyzedAppAds, Option<SearchResults>), PipelineError> {
    let lines: Vec<&str> = split_lines(body);

    // Free-text terms collapse into one AND-group: a line matches only if it
    // contains every free-text substring. Each structured term stays its own
    // independent group, OR'd against the free-text group.
    let free_text_indices: Vec<usize> = terms
        .iter()
        .enumerate()
        .filter(|(_, t)| matches!(t, SearchTerm::FreeText(s) if !s.trim().is_empty()))
        .map(|(i, _)| i)
        .collect();

    let mut analyzed = AnalyzedAppAds::default();
    let mut publishers: HashSet<String> = HashSet::new();
    let mut per_term: Vec<TermResult> = terms
        .iter()
        .enumerate()
        .map(|(i, _)| TermResult { term_index: i, count: 0, matches: Vec::new() })
        .collect();
    let mut union_matches: Vec<TermMatch> = Vec::new();
    let mut union_seen: HashSet<u64> = HashSet::new();
    let mut truncated = false;
    let mut bytes_processed = 0usize;
    let mut cap = DEFAULT_CAP;

    for chunk in lines.chunks(CHUNK_SIZE) {
        bytes_processed += chunk.iter().map(|l| l.len()).sum::<usize>();
        if bytes_processed >= WATERMARK_CRITICAL {
            return Err(PipelineError::WorkerMemoryExceeded);
        }
        cap = adaptive_cap(bytes_processed);

        for (offset, &raw_line) in chunk.iter().enumerate() {
            let line_number = (analyzed.total_lines + offset as u64 + 1) as u64;
            analyzed_counts_for_line(raw_line, &mut analyzed, &mut publishers);

            if terms.is_empty() || union_matches.len() >= cap {
                continue;
            }
            let Some(parsed) = parse_line(raw_line) else { continue };
            let lower_line = raw_line.to_lowercase();

            if !free_text_indices.is_empty()
                && free_text_indices.iter().all(|&i| {
                    let SearchTerm::FreeText(needle) = &terms[i] else { unreachable!() };
                    lower_line.contains(&needle.to_lowercase())
                })
            {
                for &idx in &free_text_indices {
                    record_match(idx, line_number, raw_line, &mut per_term, &mut union_matches, &mut union_seen, &mut truncated, cap);
                }
            }

            for (idx, term) in terms.iter().enumerate() {
                if let SearchTerm::Structured(s) = term {
                    if structured_matches(s, &parsed) {
                        record_match(idx, line_number, raw_line, &mut per_term, &mut union_matches, &mut union_seen, &mut truncated, cap);
                    }
                }
            }
        }
        analyzed.total_lines += chunk.len() as u64;
    }

    let search_results = if terms.is_empty() {
        None
    } else {
        let count = union_matches.len();
        Some(SearchResults {
            terms: terms.len(),
            per_term,
            matches: union_matches,
            count,
            truncated,
            cap,
        })
    };

    Ok((analyzed, search_results))
}

fn analyzed_counts_for_line(raw_line: &str, analyzed: &mut AnalyzedAppAds, publishers: &mut HashSet<String>) {
    let trimmed = raw_line.trim();
    if trimmed.is_empty() {
        analyzed.empty_lines += 1;
        return;
    }
    if trimmed.starts_with('#') {
        analyzed.comment_lines += 1;
        return;
    }
    match parse_line(raw_line) {
        Some(parsed) => {
            analyzed.valid_lines += 1;
            publishers.insert(parsed.domain.clone());
            analyzed.unique_publishers = publishers.len() as u64;
            match relationship_bucket(parsed.relationship_raw) {
                "direct" => analyzed.relationships.direct += 1,
                "reseller" => analyzed.relationships.reseller += 1,
                _ => analyzed.relationships.other += 1,
            }
        }
        None => analyzed.invalid_lines += 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_lines_by_category() {
        let body = "example.com, pub-123, DIRECT\n# a comment\n\nbad-line-no-fields\nacme.com, pub-9, RESELLER, tag-1\n";
        let (analyzed, results) = parse_and_search(body, &[]).unwrap();
        assert_eq!(analyzed.total_lines, 5);
        assert_eq!(analyzed.valid_lines, 2);
        assert_eq!(analyzed.comment_lines, 1);
        assert_eq!(analyzed.empty_lines, 1);
        assert_eq!(analyzed.invalid_lines, 1);
        assert_eq!(analyzed.relationships.direct, 1);
        assert_eq!(analyzed.relationships.reseller, 1);
        assert_eq!(analyzed.unique_publishers, 2);
        assert!(results.is_none());
    }

    #[test]
    fn strips_inline_comments_before_tokenizing() {
        let body = "example.com, pub-123, DIRECT # trailing note\n";
        let (analyzed, _) = parse_and_search(body, &[]).unwrap();
        assert_eq!(analyzed.valid_lines, 1);
        assert_eq!(analyzed.relationships.direct, 1);
    }

    #[test]
    fn free_text_search_is_case_insensitive_substring() {
        let body = "Example.com, pub-123, DIRECT\nother.com, pub-456, RESELLER\n";
        let terms = vec![SearchTerm::FreeText("PUB-123".to_string())];
        let (_, results) = parse_and_search(body, &terms).unwrap();
        let results = results.unwrap();
        assert_eq!(results.count, 1);
        assert_eq!(results.matches[0].line_number, 1);
    }

    #[test]
    fn structured_term_requires_exact_domain_and_tolerates_id_whitespace() {
        let body = "example.com, pub 123, DIRECT, tag-1\nexample.com, other-pub, RESELLER\n";
        let terms = vec![SearchTerm::Structured(StructuredTerm {
            domain: Some("example.com".to_string()),
            publisher_id: Some("pub123".to_string()),
            relationship: None,
            tag_id: None,
        })];
        let (_, results) = parse_and_search(body, &terms).unwrap();
        let results = results.unwrap();
        assert_eq!(results.count, 1);
    }

    #[test]
    fn free_text_terms_form_one_and_group() {
        let body = "a.com, p1, DIRECT\nb.com, p2, RESELLER\nappnexus 12447, p3, DIRECT\n";
        let terms = vec![
            SearchTerm::FreeText("appnexus".to_string()),
            SearchTerm::FreeText("12447".to_string()),
        ];
        let (_, results) = parse_and_search(body, &terms).unwrap();
        let results = results.unwrap();
        // Neither of the first two lines contains both substrings, so only
        // the third line (which contains both) matches.
        assert_eq!(results.count, 1);
        assert_eq!(results.matches[0].line_number, 3);
        assert_eq!(results.per_term[0].count, 1);
        assert_eq!(results.per_term[1].count, 1);
    }

    #[test]
    fn bare_cr_splits_lines() {
        let body = "a.com, p1, DIRECT\rb.com, p2, RESELLER\r\nc.com, p3, DIRECT\n";
        let (analyzed, _) = parse_and_search(body, &[]).unwrap();
        assert_eq!(analyzed.total_lines, 3);
        assert_eq!(analyzed.valid_lines, 3);
    }

    #[tokio::test]
    async fn analyzer_reports_timeout() {
        let pool = std::sync::Arc::new(WorkerPool::new(1, 1));
        let analyzer = Analyzer::new(pool, Duration::from_millis(5));
        let big_body = "x".repeat(10);
        let result = analyzer.analyze(big_body, vec![]).await;
        // A trivial body completes well inside 5ms; this exercises the
        // success path through the worker pool plumbing.
        assert!(result.is_ok());
    }
}
