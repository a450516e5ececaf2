use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    GooglePlay,
    AppStore,
    Amazon,
    Roku,
    Samsung,
    /// Looks like a Roku numeric channel id but those are not servable.
    RokuNumeric,
    Unknown,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::GooglePlay => "googleplay",
            StoreKind::AppStore => "appstore",
            StoreKind::Amazon => "amazon",
            StoreKind::Roku => "roku",
            StoreKind::RokuNumeric => "roku-numeric",
            StoreKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Relationships {
    pub direct: u64,
    pub reseller: u64,
    pub other: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalyzedAppAds {
    pub total_lines: u64,
    pub valid_lines: u64,
    pub comment_lines: u64,
    pub empty_lines: u64,
    pub invalid_lines: u64,
    pub unique_publishers: u64,
    pub relationships: Relationships,
}

/// A single free-text or structured search term, as accepted over the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SearchTerm {
    FreeText(String),
    Structured(StructuredTerm),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StructuredTerm {
    pub domain: Option<String>,
    #[serde(rename = "publisherId")]
    pub publisher_id: Option<String>,
    pub relationship: Option<String>,
    #[serde(rename = "tagId")]
    pub tag_id: Option<String>,
}

impl StructuredTerm {
    pub fn is_empty(&self) -> bool {
        self.domain.is_none()
            && self.publisher_id.is_none()
            && self.relationship.is_none()
            && self.tag_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TermMatch {
    pub term_index: usize,
    pub line_number: u64,
    pub line: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TermResult {
    pub term_index: usize,
    pub count: usize,
    pub matches: Vec<TermMatch>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub terms: usize,
    pub per_term: Vec<TermResult>,
    pub matches: Vec<TermMatch>,
    pub count: usize,
    pub truncated: bool,
    pub cap: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppAdsTxt {
    pub exists: bool,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzed: Option<AnalyzedAppAds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "searchResults")]
    pub search_results: Option<SearchResults>,
}

#[derive(Debug, Clone)]
pub enum BundleResult {
    Success {
        bundle_id: String,
        store_type: &'static str,
        domain: String,
        app_ads_txt: AppAdsTxt,
    },
    Error {
        bundle_id: String,
        store_type: &'static str,
        error: String,
    },
}

impl Serialize for BundleResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        match self {
            BundleResult::Success {
                bundle_id,
                store_type,
                domain,
                app_ads_txt,
            } => {
                let mut map = serializer.serialize_map(Some(5))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("bundleId", bundle_id)?;
                map.serialize_entry("storeType", store_type)?;
                map.serialize_entry("domain", domain)?;
                map.serialize_entry("appAdsTxt", app_ads_txt)?;
                map.end()
            }
            BundleResult::Error {
                bundle_id,
                store_type,
                error,
            } => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("bundleId", bundle_id)?;
                map.serialize_entry("storeType", store_type)?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}

impl BundleResult {
    pub fn bundle_id(&self) -> &str {
        match self {
            BundleResult::Success { bundle_id, .. } => bundle_id,
            BundleResult::Error { bundle_id, .. } => bundle_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BundleResult::Success { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub evictions: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub results: Vec<BundleResult>,
    #[serde(rename = "totalProcessed")]
    pub total_processed: usize,
    #[serde(rename = "successCount")]
    pub success_count: usize,
    #[serde(rename = "errorCount")]
    pub error_count: usize,
    #[serde(rename = "processingTime")]
    pub processing_time: String,
    #[serde(rename = "cacheStats")]
    pub cache_stats: CacheStats,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub service: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub git_sha: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractRequest {
    #[serde(rename = "bundleIds")]
    pub bundle_ids: Vec<String>,
    #[serde(rename = "searchTerms", default)]
    pub search_terms: Vec<SearchTerm>,
}
