//! Amazon developer-domain heuristics: `/developer/...` anchor first, then
//! the "Visit the X Store" anchor.

use once_cell::sync::Lazy;
use regex::Regex;

pub const CHAIN: &[fn(&str) -> Option<String>] = &[developer_path_anchor, visit_store_anchor];

static DEVELOPER_PATH_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)href=["'](https?://[^"']*/developer/[^"']+)["']"#).unwrap()
});

static VISIT_STORE_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a[^>]+href=["']([^"']+)["'][^>]*>\s*Visit the [^<]+ Store\s*<"#).unwrap()
});

fn developer_path_anchor(html: &str) -> Option<String> {
    DEVELOPER_PATH_ANCHOR.captures(html).map(|c| c[1].to_string())
}

fn visit_store_anchor(html: &str) -> Option<String> {
    VISIT_STORE_ANCHOR.captures(html).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_developer_path() {
        let html = r#"<a href="https://www.amazon.com/developer/acme">Acme</a>"#;
        assert_eq!(
            developer_path_anchor(html),
            Some("https://www.amazon.com/developer/acme".to_string())
        );
    }

    #[test]
    fn matches_visit_store_anchor() {
        let html = r#"<a href="https://www.amazon.com/s?me=A1B2">Visit the Acme Store</a>"#;
        assert_eq!(
            visit_store_anchor(html),
            Some("https://www.amazon.com/s?me=A1B2".to_string())
        );
    }
}
