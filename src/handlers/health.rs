use axum::response::Json;

use crate::models::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy", service: "adstxt-extractor" })
}
