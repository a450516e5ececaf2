//! Developer-Domain Extractor (spec.md §4.5): per-store ordered chains of
//! regex heuristics against a store-listing HTML body, yielding a
//! normalized developer hostname.

mod amazon;
mod app_store;
mod google_play;
mod roku;
mod samsung;

use crate::errors::PipelineError;
use crate::models::StoreKind;

/// Each extractor takes the HTML body and returns a raw URL candidate.
type Extractor = fn(&str) -> Option<String>;

pub fn extract_domain(kind: StoreKind, html: &str) -> Result<String, PipelineError> {
    let chain: &[Extractor] = match kind {
        StoreKind::GooglePlay => google_play::CHAIN,
        StoreKind::AppStore => app_store::CHAIN,
        StoreKind::Amazon => amazon::CHAIN,
        StoreKind::Roku => roku::CHAIN,
        StoreKind::Samsung => samsung::CHAIN,
        StoreKind::RokuNumeric | StoreKind::Unknown => &[],
    };

    for extractor in chain {
        if let Some(raw) = extractor(html) {
            if let Some(host) = validate_and_normalize(&raw) {
                return Ok(host);
            }
        }
    }

    Err(PipelineError::DomainNotFound)
}

/// Strips scheme, leading `www.`, trailing path/query; lower-cases the
/// host. Rejects non-web URLs (mailto, empty, relative without a host).
fn validate_and_normalize(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("mailto:") {
        return None;
    }
    // A bare `//host/...` or scheme-relative string without `.` in the
    // authority is never a usable web URL; `Url::parse` would otherwise
    // happily treat a relative path as a "cannot-be-a-base" URL.
    if raw.starts_with('/') && !raw.starts_with("//") {
        return None;
    }

    let parsed = url::Url::parse(raw)
        .or_else(|_| url::Url::parse(&format!("https://{raw}")))
        .ok()?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }

    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host).to_lowercase();

    if !is_valid_hostname(&host) {
        return None;
    }

    Some(host)
}

fn is_valid_hostname(host: &str) -> bool {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let Some(tld) = labels.last() else { return false };
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    labels.iter().all(|label| {
        !label.is_empty()
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_scheme_www_and_path() {
        assert_eq!(
            validate_and_normalize("https://www.Example.com/dev?id=1"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn rejects_mailto() {
        assert_eq!(validate_and_normalize("mailto:dev@example.com"), None);
    }

    #[test]
    fn rejects_relative_without_host() {
        assert_eq!(validate_and_normalize("/store/apps/dev?id=123"), None);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(validate_and_normalize(""), None);
    }

    #[test]
    fn rejects_single_label_host() {
        assert_eq!(validate_and_normalize("https://localhost/"), None);
    }

    #[test]
    fn extract_domain_falls_through_chain() {
        let html = r#"<a class="some icon-after icon-external" href="https://www.acme-studios.dev/">dev</a>"#;
        let result = extract_domain(StoreKind::AppStore, html).unwrap();
        assert_eq!(result, "acme-studios.dev");
    }

    #[test]
    fn extract_domain_not_found_for_empty_chain() {
        assert!(matches!(
            extract_domain(StoreKind::Unknown, "<html></html>"),
            Err(PipelineError::DomainNotFound)
        ));
    }
}
