use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use thiserror::Error;

use crate::error::AppError;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Zalo-Signature";

/// Events that carry a user text message.
pub const TEXT_EVENTS: &[&str] = &["user_send_text", "message.text.received"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing X-Zalo-Signature header")]
    Missing,
    #[error("Invalid signature format")]
    InvalidFormat,
    #[error("Invalid webhook secret configuration")]
    InvalidSecret,
    #[error("Signature verification failed")]
    Mismatch,
}

/// Checks a hex HMAC-SHA256 of `body` in constant time.
pub fn verify_signature(secret: &str, body: &[u8], signature: Option<&str>) -> Result<(), SignatureError> {
    let signature = signature.ok_or(SignatureError::Missing)?;
    let expected = hex::decode(signature.trim()).map_err(|_| SignatureError::InvalidFormat)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(body);

    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

/// Hex HMAC-SHA256 of `body`, as a sender would put it in the header.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEnvelope {
    pub event: Option<String>,
    pub event_name: Option<String>,
    pub message: Option<MessagePayload>,
    pub sender: Option<Participant>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessagePayload {
    pub text: Option<String>,
    pub from: Option<Participant>,
    pub chat: Option<Participant>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Participant {
    /// Platforms send ids as strings or numbers.
    pub id: Option<Value>,
}

impl Participant {
    fn id_text(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A text message addressed to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingText {
    pub owner_id: String,
    pub text: String,
}

impl WebhookEnvelope {
    pub fn event(&self) -> Option<&str> {
        self.event.as_deref().or(self.event_name.as_deref())
    }

    pub fn owner_id(&self) -> Option<String> {
        let message = self.message.as_ref();
        message
            .and_then(|m| m.from.as_ref())
            .and_then(Participant::id_text)
            .or_else(|| message.and_then(|m| m.chat.as_ref()).and_then(Participant::id_text))
            .or_else(|| self.sender.as_ref().and_then(Participant::id_text))
    }
}

/// Picks the text message out of an envelope. Other events, and text events
/// without text or sender, yield `None`.
pub fn parse_incoming(envelope: &WebhookEnvelope) -> Option<IncomingText> {
    let event = envelope.event()?;
    if !TEXT_EVENTS.contains(&event) {
        return None;
    }

    let text = envelope
        .message
        .as_ref()
        .and_then(|m| m.text.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())?
        .to_string();
    let owner_id = envelope.owner_id()?;

    Some(IncomingText { owner_id, text })
}

pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    match state.webhook_secret.as_deref() {
        Some(secret) => {
            let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
            verify_signature(secret, &body, signature).map_err(|e| match e {
                SignatureError::InvalidSecret => AppError::Internal(e.to_string()),
                _ => AppError::Unauthorized(e.to_string()),
            })?;
        }
        None => tracing::warn!("No webhook secret configured, skipping signature verification"),
    }

    let envelope: WebhookEnvelope =
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))?;

    let event = envelope.event().unwrap_or_default().to_string();
    let Some(incoming) = parse_incoming(&envelope) else {
        tracing::debug!(event = %event, "Ignoring webhook event");
        return Ok(Json(json!({ "status": "ok" })));
    };

    tracing::info!(event = %event, owner_id = %incoming.owner_id, "Received text message");
    let routed = state.router.handle(&incoming.owner_id, &incoming.text).await;
    tracing::debug!(owner_id = %incoming.owner_id, delivered = routed.delivered, "Message handled");

    Ok(Json(json!({ "status": "ok" })))
}
