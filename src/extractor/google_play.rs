//! GooglePlay developer-domain heuristics: meta tag first, then the
//! developer-listing anchor.

use once_cell::sync::Lazy;
use regex::Regex;

pub const CHAIN: &[fn(&str) -> Option<String>] = &[meta_developer_url, developer_anchor];

static META_DEVELOPER_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+property=["']appstore:developer_url["'][^>]+content=["']([^"']+)["']"#).unwrap()
});

static DEVELOPER_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)href=["'](https?://play\.google\.com/store/apps/dev(?:eloper)?\?id=[^"']+)["']"#).unwrap()
});

fn meta_developer_url(html: &str) -> Option<String> {
    META_DEVELOPER_URL.captures(html).map(|c| c[1].to_string())
}

fn developer_anchor(html: &str) -> Option<String> {
    DEVELOPER_ANCHOR.captures(html).map(|c| c[1].to_string())
}
