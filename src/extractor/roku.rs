//! Roku developer-domain heuristics: meta tag, then the channel-store
//! developer anchor, then a "More by X" anchor.

use once_cell::sync::Lazy;
use regex::Regex;

pub const CHAIN: &[fn(&str) -> Option<String>] = &[meta_developer_url, developer_anchor, more_by_anchor];

static META_DEVELOPER_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+property=["']appstore:developer_url["'][^>]+content=["']([^"']+)["']"#).unwrap()
});

static DEVELOPER_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)href=["'](https?://channelstore\.roku\.com/developer/[^"']+)["']"#).unwrap()
});

static MORE_BY_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a[^>]+href=["']([^"']+)["'][^>]*>\s*More by [^<]+\s*<"#).unwrap()
});

fn meta_developer_url(html: &str) -> Option<String> {
    META_DEVELOPER_URL.captures(html).map(|c| c[1].to_string())
}

fn developer_anchor(html: &str) -> Option<String> {
    DEVELOPER_ANCHOR.captures(html).map(|c| c[1].to_string())
}

fn more_by_anchor(html: &str) -> Option<String> {
    MORE_BY_ANCHOR.captures(html).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_developer_anchor() {
        let html = r#"<a href="https://channelstore.roku.com/developer/acme">Acme</a>"#;
        assert_eq!(
            developer_anchor(html),
            Some("https://channelstore.roku.com/developer/acme".to_string())
        );
    }

    #[test]
    fn matches_more_by_anchor() {
        let html = r#"<a href="https://acme.tv">More by Acme Studios</a>"#;
        assert_eq!(more_by_anchor(html), Some("https://acme.tv".to_string()));
    }
}
