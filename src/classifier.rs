//! Store Classifier (spec.md §4.1): maps a trimmed bundle id string to a
//! `StoreKind` and the canonical store-listing URL, deterministically and
//! without side effects.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::StoreKind;

static AMAZON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[bB][0-9A-Za-z]{9,10}$").unwrap());
static SAMSUNG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[gG]\d{8,15}$").unwrap());
static APPSTORE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(id)?\d{8,12}$").unwrap());
static GOOGLEPLAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]*(\.[a-zA-Z][a-zA-Z0-9_]*)+$").unwrap());
static ROKU_NUMERIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4,6}$").unwrap());
static ROKU_PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-f0-9]{32}:[a-f0-9]{32}$").unwrap());
static ROKU_ALNUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]{4,}$").unwrap());

pub fn classify(raw: &str) -> (StoreKind, Option<String>) {
    let id = raw.trim();

    if AMAZON_RE.is_match(id) {
        return (
            StoreKind::Amazon,
            Some(format!("https://www.amazon.com/dp/{}", urlencoding::encode(id))),
        );
    }
    if SAMSUNG_RE.is_match(id) {
        return (
            StoreKind::Samsung,
            Some(format!(
                "https://www.samsung.com/us/appstore/app/{}",
                urlencoding::encode(id)
            )),
        );
    }
    if APPSTORE_RE.is_match(id) {
        let numeric_prefixed = if let Some(stripped) = id.strip_prefix("id") {
            format!("id{}", stripped)
        } else {
            format!("id{}", id)
        };
        return (
            StoreKind::AppStore,
            Some(format!("https://apps.apple.com/us/app/{}", numeric_prefixed)),
        );
    }
    if GOOGLEPLAY_RE.is_match(id) {
        return (
            StoreKind::GooglePlay,
            Some(format!(
                "https://play.google.com/store/apps/details?id={}",
                urlencoding::encode(id)
            )),
        );
    }
    if ROKU_NUMERIC_RE.is_match(id) {
        // Roku numeric channel ids aren't servable as store listings.
        return (StoreKind::RokuNumeric, None);
    }
    if ROKU_PAIR_RE.is_match(id) || (ROKU_ALNUM_RE.is_match(id) && !id.contains('.')) {
        return (
            StoreKind::Roku,
            Some(format!(
                "https://channelstore.roku.com/details/{}",
                urlencoding::encode(id)
            )),
        );
    }

    (StoreKind::Unknown, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_google_play() {
        let (kind, url) = classify("com.example.app");
        assert_eq!(kind, StoreKind::GooglePlay);
        assert_eq!(
            url.unwrap(),
            "https://play.google.com/store/apps/details?id=com.example.app"
        );
    }

    #[test]
    fn classifies_app_store_bare_numeric() {
        let (kind, url) = classify("1234567890");
        assert_eq!(kind, StoreKind::AppStore);
        assert_eq!(url.unwrap(), "https://apps.apple.com/us/app/id1234567890");
    }

    #[test]
    fn classifies_app_store_id_prefixed() {
        let (kind, url) = classify("id123456789");
        assert_eq!(kind, StoreKind::AppStore);
        assert_eq!(url.unwrap(), "https://apps.apple.com/us/app/id123456789");
    }

    #[test]
    fn classifies_amazon_asin() {
        let (kind, _url) = classify("B00ABCDEFG");
        assert_eq!(kind, StoreKind::Amazon);
    }

    #[test]
    fn classifies_samsung() {
        let (kind, _url) = classify("G123456789");
        assert_eq!(kind, StoreKind::Samsung);
    }

    #[test]
    fn classifies_roku_numeric_as_unsupported() {
        let (kind, url) = classify("12345");
        assert_eq!(kind, StoreKind::RokuNumeric);
        assert!(url.is_none());
    }

    #[test]
    fn classifies_roku_pair() {
        let (kind, _url) = classify("f5ab79cb980f11d1ab340800200c9a66:f5ab79cb980f11d1ab340800200c9a67");
        assert_eq!(kind, StoreKind::Roku);
    }

    #[test]
    fn classifies_roku_alnum() {
        let (kind, _url) = classify("abcd1234xyz");
        assert_eq!(kind, StoreKind::Roku);
    }

    #[test]
    fn classifies_unknown() {
        let (kind, url) = classify("!!!not-an-id!!!");
        assert_eq!(kind, StoreKind::Unknown);
        assert!(url.is_none());
    }

    #[test]
    fn trims_whitespace() {
        let (kind, _url) = classify("  com.example.app  ");
        assert_eq!(kind, StoreKind::GooglePlay);
    }
}
