pub mod webhook;

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct ServiceIndex {
    pub service: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
}

pub async fn index() -> Json<ServiceIndex> {
    Json(ServiceIndex {
        service: "chitieu-bot",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec!["POST /webhook", "POST /api/webhook", "GET /health"],
    })
}
