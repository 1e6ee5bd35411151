use clap::{Parser, Subcommand};

use crate::adapters::DEFAULT_CATEGORIES;
use crate::config::Config;
use crate::services::TransactionExtractor;
use crate::startup::{build_backend, validate_environment};
use crate::utils::sanitize::mask_secret;

#[derive(Parser)]
#[command(name = "chitieu-bot")]
#[command(about = "Chitieu Bot - Vietnamese expense/income tracker for Zalo", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Run the extractor on a message without storing anything
    Parse {
        /// Message text, e.g. "Chi 50k ăn uống"
        #[arg(value_name = "MESSAGE")]
        message: String,

        /// Category name to match against (repeatable); defaults to the built-in catalog
        #[arg(short, long = "category", value_name = "NAME")]
        categories: Vec<String>,
    },

    /// Configuration validation
    Config,

    /// Create missing worksheets, headers and default categories
    InitSheets,
}

pub fn handle_parse(message: &str, categories: Vec<String>) -> anyhow::Result<()> {
    let categories = if categories.is_empty() {
        DEFAULT_CATEGORIES.iter().map(|(name, _)| name.to_string()).collect()
    } else {
        categories
    };

    let extractor = TransactionExtractor::new()?;
    let draft = extractor.extract(message, &categories);
    let matched_rule = extractor.detect_amount(&message.trim().to_lowercase()).map(|m| m.rule);

    tracing::debug!(rule = ?matched_rule, valid = draft.is_valid, "Parsed message");
    println!("{}", serde_json::to_string_pretty(&draft)?);
    if let Some(rule) = matched_rule {
        println!("Amount rule: {}", rule);
    }

    Ok(())
}

pub async fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Zalo API: {:?}", config.zalo_api);
    println!("  Zalo Access Token: {}", mask_secret(&config.zalo_access_token));
    println!(
        "  Zalo Secret Key: {}",
        config.zalo_secret_key.as_deref().map(mask_secret).unwrap_or_else(|| "(not set)".to_string())
    );
    if let Some(oa_id) = &config.zalo_oa_id {
        println!("  Zalo OA ID: {}", oa_id);
    }
    println!("  Store Backend: {:?}", config.store_backend);
    if let Some(sheets) = &config.sheets {
        println!("  Spreadsheet ID: {}", sheets.spreadsheet_id);
        println!("  Sheets Access Token: {}", mask_secret(&sheets.access_token));
        println!("  Transactions Sheet: {}", sheets.transactions_sheet);
        println!("  Categories Sheet: {}", sheets.categories_sheet);
    }
    println!("  UTC Offset: {}", config.utc_offset);

    let backend = build_backend(config)?;
    let report = validate_environment(config, &backend).await;
    report.print();

    if !report.is_valid() {
        anyhow::bail!("Configuration validation failed");
    }

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

pub async fn handle_init_sheets(config: &Config) -> anyhow::Result<()> {
    let backend = build_backend(config)?;
    let Some(sheets) = backend.sheets else {
        anyhow::bail!("init-sheets requires STORE_BACKEND=sheets");
    };

    let created = sheets.ensure_layout().await?;
    if created.is_empty() {
        println!("✓ All worksheets already exist");
    } else {
        println!("✓ Created worksheets: {}", created.join(", "));
    }

    Ok(())
}
