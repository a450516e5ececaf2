//! AppStore developer-domain heuristics: the "external link" anchor class
//! first, then a plain `/developer/...` anchor.

use once_cell::sync::Lazy;
use regex::Regex;

pub const CHAIN: &[fn(&str) -> Option<String>] = &[icon_external_anchor, developer_path_anchor];

static ICON_EXTERNAL_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a[^>]+class=["'][^"']*icon-after icon-external[^"']*["'][^>]+href=["']([^"']+)["']"#).unwrap()
});

static DEVELOPER_PATH_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)href=["'](https?://[^"']*/developer/[^"']+)["']"#).unwrap()
});

fn icon_external_anchor(html: &str) -> Option<String> {
    ICON_EXTERNAL_ANCHOR.captures(html).map(|c| c[1].to_string())
}

fn developer_path_anchor(html: &str) -> Option<String> {
    DEVELOPER_PATH_ANCHOR.captures(html).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_icon_external_class() {
        let html = r#"<a class="link icon-after icon-external" href="https://acme.dev">Site</a>"#;
        assert_eq!(icon_external_anchor(html), Some("https://acme.dev".to_string()));
    }

    #[test]
    fn falls_back_to_developer_path() {
        let html = r#"<a href="https://apps.apple.com/developer/acme-inc/id12345">Acme</a>"#;
        assert_eq!(
            developer_path_anchor(html),
            Some("https://apps.apple.com/developer/acme-inc/id12345".to_string())
        );
    }
}
