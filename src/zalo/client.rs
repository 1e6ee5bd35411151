use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::ports::{NotifyError, Notifier};

pub const BOT_PLATFORM_BASE: &str = "https://bot-api.zaloplatforms.com";
pub const OFFICIAL_ACCOUNT_BASE: &str = "https://openapi.zalo.me";

/// Which Zalo messaging API the bot talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZaloApi {
    /// Zalo Bot Platform: token in the URL path, `{chat_id, text}` body.
    BotPlatform,
    /// Legacy Official Account API: token in the `access_token` header.
    OfficialAccount,
}

impl ZaloApi {
    pub fn default_base(self) -> &'static str {
        match self {
            ZaloApi::BotPlatform => BOT_PLATFORM_BASE,
            ZaloApi::OfficialAccount => OFFICIAL_ACCOUNT_BASE,
        }
    }
}

/// Bot Platform reply envelope.
#[derive(Debug, Deserialize)]
struct BotResponse {
    #[serde(default)]
    ok: bool,
    description: Option<String>,
}

/// Official Account reply envelope. `error == 0` means success.
#[derive(Debug, Deserialize)]
struct OaResponse {
    #[serde(default)]
    error: i64,
    message: Option<String>,
}

/// HTTP client for sending chat replies through Zalo
#[derive(Clone)]
pub struct ZaloClient {
    client: Client,
    api: ZaloApi,
    base_url: String,
    access_token: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl ZaloClient {
    pub fn new(api: ZaloApi, access_token: String, base_url: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(Duration::from_secs(30), Duration::from_secs(60));
        let policy = failure_policy::consecutive_failures(5, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        ZaloClient {
            client,
            api,
            base_url: base_url.unwrap_or_else(|| api.default_base().to_string()),
            access_token,
            circuit_breaker,
        }
    }

    pub fn api(&self) -> ZaloApi {
        self.api
    }

    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    fn message_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.api {
            ZaloApi::BotPlatform => format!("{}/bot{}/sendMessage", base, self.access_token),
            ZaloApi::OfficialAccount => format!("{}/v2.0/oa/message", base),
        }
    }

    async fn deliver(&self, owner_id: &str, text: &str) -> Result<(), NotifyError> {
        let request = match self.api {
            ZaloApi::BotPlatform => self
                .client
                .post(self.message_url())
                .json(&json!({ "chat_id": owner_id, "text": text })),
            ZaloApi::OfficialAccount => self
                .client
                .post(self.message_url())
                .header("access_token", &self.access_token)
                .json(&json!({
                    "recipient": { "user_id": owner_id },
                    "message": { "text": text }
                })),
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(NotifyError::Api {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        match self.api {
            ZaloApi::BotPlatform => {
                let parsed: BotResponse = serde_json::from_str(&body)
                    .map_err(|e| NotifyError::Rejected(format!("unreadable response: {}", e)))?;
                if parsed.ok {
                    Ok(())
                } else {
                    Err(NotifyError::Rejected(
                        parsed.description.unwrap_or_else(|| "ok=false".to_string()),
                    ))
                }
            }
            ZaloApi::OfficialAccount => {
                let parsed: OaResponse = serde_json::from_str(&body)
                    .map_err(|e| NotifyError::Rejected(format!("unreadable response: {}", e)))?;
                if parsed.error == 0 {
                    Ok(())
                } else {
                    Err(NotifyError::Rejected(format!(
                        "error {}: {}",
                        parsed.error,
                        parsed.message.unwrap_or_default()
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl Notifier for ZaloClient {
    async fn send_text(&self, owner_id: &str, text: &str) -> Result<(), NotifyError> {
        if self.access_token.trim().is_empty() {
            return Err(NotifyError::NotConfigured("ZALO_ACCESS_TOKEN".to_string()));
        }

        let result = self.circuit_breaker.call(self.deliver(owner_id, text)).await;

        match result {
            Ok(()) => {
                tracing::debug!(owner_id = %owner_id, api = ?self.api, "Zalo message delivered");
                Ok(())
            }
            Err(FailsafeError::Rejected) => Err(NotifyError::CircuitBreakerOpen(
                "Zalo API circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bases() {
        let bot = ZaloClient::new(ZaloApi::BotPlatform, "tok".to_string(), None);
        assert_eq!(bot.message_url(), "https://bot-api.zaloplatforms.com/bottok/sendMessage");

        let oa = ZaloClient::new(ZaloApi::OfficialAccount, "tok".to_string(), None);
        assert_eq!(oa.message_url(), "https://openapi.zalo.me/v2.0/oa/message");
    }

    #[test]
    fn test_custom_base_trailing_slash() {
        let client = ZaloClient::new(
            ZaloApi::BotPlatform,
            "tok".to_string(),
            Some("http://127.0.0.1:9000/".to_string()),
        );
        assert_eq!(client.message_url(), "http://127.0.0.1:9000/bottok/sendMessage");
        assert_eq!(client.circuit_state(), "closed");
    }

    #[tokio::test]
    async fn test_missing_token_is_not_configured() {
        let client = ZaloClient::new(ZaloApi::OfficialAccount, String::new(), None);
        let result = client.send_text("u1", "hello").await;
        assert!(matches!(result, Err(NotifyError::NotConfigured(_))));
    }
}
