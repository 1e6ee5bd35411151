use anyhow::Result;
use chrono::{FixedOffset, Offset, Utc};
use dotenvy::dotenv;
use std::env;

use crate::adapters::SheetsConfig;
use crate::zalo::ZaloApi;

pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com";
pub const DEFAULT_TRANSACTIONS_SHEET: &str = "Giao dịch";
pub const DEFAULT_CATEGORIES_SHEET: &str = "Danh mục";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sheets,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub zalo_access_token: String,
    /// Webhook HMAC secret. `None` disables signature checks.
    pub zalo_secret_key: Option<String>,
    pub zalo_oa_id: Option<String>,
    pub zalo_api: ZaloApi,
    pub zalo_api_base: Option<String>,
    pub store_backend: StoreBackend,
    /// Present when `store_backend` is `Sheets`.
    pub sheets: Option<SheetsConfig>,
    pub utc_offset: FixedOffset,
    pub log_format: LogFormat,
    pub log_request_body: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Every problem is collected and
    /// reported in one error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut errors = Vec::new();

        let server_port = match get("SERVER_PORT") {
            None => 5000,
            Some(raw) => raw.parse::<u16>().unwrap_or_else(|_| {
                errors.push(format!("SERVER_PORT must be a port number, got '{}'", raw));
                0
            }),
        };

        let zalo_access_token = get("ZALO_ACCESS_TOKEN").unwrap_or_else(|| {
            errors.push("ZALO_ACCESS_TOKEN is required".to_string());
            String::new()
        });

        let zalo_api = if parse_flag(get("ZALO_USE_NEW_API").as_deref()) {
            ZaloApi::BotPlatform
        } else {
            ZaloApi::OfficialAccount
        };

        let store_backend = match get("STORE_BACKEND").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("sheets") => StoreBackend::Sheets,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                errors.push(format!("STORE_BACKEND must be 'sheets' or 'memory', got '{}'", other));
                StoreBackend::Sheets
            }
        };

        let sheets = if store_backend == StoreBackend::Sheets {
            let spreadsheet_id = get("GOOGLE_SHEET_ID").unwrap_or_else(|| {
                errors.push("GOOGLE_SHEET_ID is required".to_string());
                String::new()
            });
            let access_token = get("GOOGLE_SHEETS_ACCESS_TOKEN").unwrap_or_else(|| {
                errors.push("GOOGLE_SHEETS_ACCESS_TOKEN is required".to_string());
                String::new()
            });
            Some(SheetsConfig {
                api_base: get("GOOGLE_SHEETS_API_BASE")
                    .unwrap_or_else(|| DEFAULT_SHEETS_API_BASE.to_string()),
                spreadsheet_id,
                access_token,
                transactions_sheet: get("SHEET_NAME_TRANSACTIONS")
                    .unwrap_or_else(|| DEFAULT_TRANSACTIONS_SHEET.to_string()),
                categories_sheet: get("SHEET_NAME_CATEGORIES")
                    .unwrap_or_else(|| DEFAULT_CATEGORIES_SHEET.to_string()),
            })
        } else {
            None
        };

        let utc_offset = match get("BOT_UTC_OFFSET_HOURS") {
            None => FixedOffset::east_opt(7 * 3600),
            Some(raw) => raw
                .parse::<i32>()
                .ok()
                .filter(|hours| (-12..=14).contains(hours))
                .and_then(|hours| FixedOffset::east_opt(hours * 3600)),
        };
        let utc_offset = utc_offset.unwrap_or_else(|| {
            errors.push("BOT_UTC_OFFSET_HOURS must be a whole number between -12 and 14".to_string());
            Utc.fix()
        });

        let log_format = match get("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        if !errors.is_empty() {
            anyhow::bail!("Config errors: {}", errors.join(", "));
        }

        Ok(Config {
            server_port,
            zalo_access_token,
            zalo_secret_key: get("ZALO_SECRET_KEY"),
            zalo_oa_id: get("ZALO_OA_ID"),
            zalo_api,
            zalo_api_base: get("ZALO_API_BASE"),
            store_backend,
            sheets,
            utc_offset,
            log_format,
            log_request_body: parse_flag(get("LOG_REQUEST_BODY").as_deref()),
        })
    }
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(str::to_lowercase).as_deref(),
        Some("true") | Some("1") | Some("yes")
    )
}
