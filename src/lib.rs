pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod startup;
pub mod utils;
pub mod zalo;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::middleware::{request_logger_middleware, RequestLogConfig};
use crate::services::MessageRouter;

/// Largest webhook body accepted.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<MessageRouter>,
    /// `None` skips webhook signature verification.
    pub webhook_secret: Option<String>,
}

pub fn create_app(state: AppState, log_config: RequestLogConfig) -> Router {
    Router::new()
        .route("/", get(handlers::index).post(handlers::webhook::webhook))
        .route("/webhook", post(handlers::webhook::webhook))
        .route("/api/webhook", post(handlers::webhook::webhook))
        .route("/health", get(handlers::health))
        .layer(axum::middleware::from_fn_with_state(
            log_config,
            request_logger_middleware,
        ))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}
