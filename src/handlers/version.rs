use axum::response::Json;

use crate::models::VersionResponse;

fn git_sha() -> &'static str {
    option_env!("ADSTXT_GIT_SHA").unwrap_or("")
}

pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: "adstxt-extractor",
        version: env!("CARGO_PKG_VERSION"),
        git_sha: git_sha(),
    })
}
