use chitieu_bot::cli::{Cli, Commands};
use chitieu_bot::config::{Config, LogFormat};
use chitieu_bot::middleware::RequestLogConfig;
use chitieu_bot::{cli, create_app, startup};
use clap::Parser;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `parse` runs without any environment.
    if let Some(Commands::Parse { message, categories }) = &cli.command {
        init_tracing(LogFormat::Pretty);
        return cli::handle_parse(message, categories.clone());
    }

    let config = Config::from_env()?;
    init_tracing(config.log_format);

    match cli.command {
        None | Some(Commands::Serve) => serve(config).await,
        Some(Commands::Config) => cli::handle_config_validate(&config).await,
        Some(Commands::InitSheets) => cli::handle_init_sheets(&config).await,
        Some(Commands::Parse { .. }) => Ok(()),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let backend = startup::build_backend(&config)?;

    if let Some(sheets) = &backend.sheets {
        match sheets.ensure_layout().await {
            Ok(_) => tracing::info!("Spreadsheet layout verified"),
            Err(e) => tracing::warn!(error = %e, "Could not verify spreadsheet layout, continuing"),
        }
    }

    let state = startup::build_state(&config, &backend)?;
    let app = create_app(
        state,
        RequestLogConfig {
            log_body: config.log_request_body,
        },
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
