use anyhow::{Context, Result};
use std::sync::Arc;

use crate::adapters::{MemoryStore, SheetsStore};
use crate::config::{Config, StoreBackend};
use crate::ports::{CategorySource, Notifier, TransactionStore};
use crate::services::MessageRouter;
use crate::zalo::ZaloClient;
use crate::AppState;

/// Store and catalog handles for the configured backend.
#[derive(Clone)]
pub struct Backend {
    pub categories: Arc<dyn CategorySource>,
    pub store: Arc<dyn TransactionStore>,
    /// Set for the Sheets backend, used for layout setup.
    pub sheets: Option<Arc<SheetsStore>>,
}

pub fn build_backend(config: &Config) -> Result<Backend> {
    match config.store_backend {
        StoreBackend::Memory => {
            let memory = Arc::new(MemoryStore::with_default_categories());
            tracing::info!("Using in-memory transaction store");
            Ok(Backend {
                categories: memory.clone(),
                store: memory,
                sheets: None,
            })
        }
        StoreBackend::Sheets => {
            let sheets_config = config
                .sheets
                .clone()
                .context("Sheets backend selected without Sheets settings")?;
            tracing::info!(
                spreadsheet_id = %sheets_config.spreadsheet_id,
                transactions = %sheets_config.transactions_sheet,
                categories = %sheets_config.categories_sheet,
                "Using Google Sheets transaction store"
            );
            let sheets = Arc::new(SheetsStore::new(sheets_config));
            Ok(Backend {
                categories: sheets.clone(),
                store: sheets.clone(),
                sheets: Some(sheets),
            })
        }
    }
}

pub fn build_notifier(config: &Config) -> Arc<dyn Notifier> {
    let client = ZaloClient::new(
        config.zalo_api,
        config.zalo_access_token.clone(),
        config.zalo_api_base.clone(),
    );
    tracing::info!(api = ?config.zalo_api, "Zalo client initialized");
    Arc::new(client)
}

pub fn build_state(config: &Config, backend: &Backend) -> Result<AppState> {
    let router = MessageRouter::new(
        backend.categories.clone(),
        backend.store.clone(),
        build_notifier(config),
        config.utc_offset,
    )
    .context("Failed to compile message patterns")?;

    if config.zalo_secret_key.is_none() {
        tracing::warn!("ZALO_SECRET_KEY not set, webhook signatures will not be verified");
    }

    Ok(AppState {
        router: Arc::new(router),
        webhook_secret: config.zalo_secret_key.clone(),
    })
}

pub struct ValidationReport {
    pub environment: bool,
    pub store: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.environment && self.store
    }

    pub fn print(&self) {
        println!("\n=== Startup Validation Report ===");
        println!("Environment Variables: {}", status(self.environment));
        println!("Store Connectivity:    {}", status(self.store));

        if !self.errors.is_empty() {
            println!("\nErrors:");
            for error in &self.errors {
                println!("  ❌ {}", error);
            }
        }

        println!("\nOverall Status: {}", if self.is_valid() { "✅ PASS" } else { "❌ FAIL" });
        println!("=================================\n");
    }
}

fn status(ok: bool) -> &'static str {
    if ok { "✅ OK" } else { "❌ FAIL" }
}

pub async fn validate_environment(config: &Config, backend: &Backend) -> ValidationReport {
    let mut report = ValidationReport {
        environment: true,
        store: true,
        errors: Vec::new(),
    };

    if let Err(e) = validate_env_vars(config) {
        report.environment = false;
        report.errors.push(format!("Environment: {:#}", e));
    }

    match backend.categories.categories().await {
        Ok(categories) if categories.is_empty() => {
            report.errors.push("Store: category catalog is empty".to_string());
        }
        Ok(_) => {}
        Err(e) => {
            report.store = false;
            report.errors.push(format!("Store: {}", e));
        }
    }

    report
}

fn validate_env_vars(config: &Config) -> Result<()> {
    if config.server_port == 0 {
        anyhow::bail!("SERVER_PORT must be greater than 0");
    }
    if let Some(base) = &config.zalo_api_base {
        url::Url::parse(base).context("ZALO_API_BASE is not a valid URL")?;
    }
    if let Some(sheets) = &config.sheets {
        url::Url::parse(&sheets.api_base).context("GOOGLE_SHEETS_API_BASE is not a valid URL")?;
        if sheets.transactions_sheet == sheets.categories_sheet {
            anyhow::bail!("SHEET_NAME_TRANSACTIONS and SHEET_NAME_CATEGORIES must differ");
        }
    }

    Ok(())
}
