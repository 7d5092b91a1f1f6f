use bingo_client::config::{
    AppConfig,
    Args,
};
use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::{
    path::Path,
    sync::OnceLock,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod app;
mod ui;

const LOG_FILE_PREFIX: &str = "bingo-client.log";

// Flushes buffered log lines when the process exits.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn init_tracing(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("creating log directory {} failed", log_dir.display()))?;
    let appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("installing tracing subscriber failed: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let config = AppConfig::from_args(args).wrap_err("invalid configuration")?;
    if config.tracing {
        init_tracing(&config.log_dir)?;
    }
    tracing::info!(
        user_id = %config.identity.user_id,
        api_url = %config.api_url,
        "starting bingo client"
    );
    app::run_app(config).await
}
