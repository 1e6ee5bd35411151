//! Collaborator interfaces used by the message router.
//!
//! Implementations live in `adapters` (stores) and `zalo` (notifications).

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{StoredRow, TransactionRecord};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Store returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Invalid store URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Store URL cannot take a path: {0}")]
    InvalidUrl(String),
    #[error("Invalid response from store: {0}")]
    InvalidResponse(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Notification API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Notification rejected: {0}")]
    Rejected(String),
    #[error("Notification channel not configured: {0}")]
    NotConfigured(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Source of the category catalog.
#[async_trait]
pub trait CategorySource: Send + Sync {
    async fn categories(&self) -> StoreResult<Vec<String>>;
}

/// Append-only transaction log.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn append(&self, record: &TransactionRecord) -> StoreResult<()>;

    /// Rows for `owner_id`, newest first, at most `limit`.
    async fn list(&self, owner_id: &str, limit: usize) -> StoreResult<Vec<StoredRow>>;
}

/// Outbound chat messages. Best effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, owner_id: &str, text: &str) -> Result<(), NotifyError>;
}
