//! Samsung developer-domain heuristics: meta tag, Samsung developer
//! anchor, "More from Developer" anchor, then a Developer dt/dd block.

use once_cell::sync::Lazy;
use regex::Regex;

pub const CHAIN: &[fn(&str) -> Option<String>] = &[
    meta_developer_url,
    developer_anchor,
    more_from_developer_anchor,
    developer_dt_dd_block,
];

static META_DEVELOPER_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+property=["']appstore:developer_url["'][^>]+content=["']([^"']+)["']"#).unwrap()
});

static DEVELOPER_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)href=["'](https?://(?:www\.)?samsung\.com/[^"']*/appstore/developer/[^"']+)["']"#).unwrap()
});

static MORE_FROM_DEVELOPER_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a[^>]+href=["']([^"']+)["'][^>]*>\s*More from Developer\s*<"#).unwrap()
});

static DEVELOPER_DT_DD_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<dt[^>]*>\s*Developer\s*</dt>\s*<dd[^>]*>\s*(?:<a[^>]+href=["']([^"']+)["'])?"#).unwrap()
});

fn meta_developer_url(html: &str) -> Option<String> {
    META_DEVELOPER_URL.captures(html).map(|c| c[1].to_string())
}

fn developer_anchor(html: &str) -> Option<String> {
    DEVELOPER_ANCHOR.captures(html).map(|c| c[1].to_string())
}

fn more_from_developer_anchor(html: &str) -> Option<String> {
    MORE_FROM_DEVELOPER_ANCHOR.captures(html).map(|c| c[1].to_string())
}

fn developer_dt_dd_block(html: &str) -> Option<String> {
    DEVELOPER_DT_DD_BLOCK
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_more_from_developer() {
        let html = r#"<a href="https://acme-labs.com">More from Developer</a>"#;
        assert_eq!(
            more_from_developer_anchor(html),
            Some("https://acme-labs.com".to_string())
        );
    }

    #[test]
    fn matches_dt_dd_block() {
        let html = r#"<dt>Developer</dt><dd><a href="https://acme-labs.com">Acme Labs</a></dd>"#;
        assert_eq!(
            developer_dt_dd_block(html),
            Some("https://acme-labs.com".to_string())
        );
    }
}
