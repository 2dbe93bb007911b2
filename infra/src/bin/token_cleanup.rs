//! Retention sweep for refresh tokens
//!
//! Deletes refresh tokens that expired more than the configured retention
//! period ago. Run with `--once` from cron, or without it to keep sweeping
//! on the configured interval until interrupted.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use bk_core::{RefreshTokenService, RefreshTokenServiceConfig, TokenCleanupConfig, TokenCleanupService};
use bk_infra::DatabasePool;
use bk_shared::{init_tracing, AppConfig};

#[derive(Parser, Debug)]
#[command(name = "token-cleanup", version, about = "Delete expired refresh tokens")]
struct Cli {
    /// TOML config file, layered under BK__ environment variables
    #[arg(short, long, env = "BK_CONFIG_FILE")]
    config: Option<String>,

    /// Run a single sweep and exit
    #[arg(long)]
    once: bool,

    /// Apply pending schema migrations first
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.logging);

    info!(environment = %config.environment, "Starting token cleanup");

    let pool = DatabasePool::new(&config.database)
        .await
        .context("failed to connect to the database")?;

    if cli.migrate {
        pool.run_migrations()
            .await
            .context("failed to run migrations")?;
    }

    let service = Arc::new(RefreshTokenService::new(
        Arc::new(pool.token_store()),
        RefreshTokenServiceConfig::from(&config.auth.refresh),
    ));
    let cleanup = Arc::new(TokenCleanupService::new(
        service,
        TokenCleanupConfig::from(&config.auth.cleanup),
    ));

    if cli.once {
        let result = cleanup.run_cleanup().await;
        pool.close().await;
        let report = result.context("cleanup sweep failed")?;
        info!(deleted = report.deleted, cutoff = %report.cutoff, "Sweep finished");
        return Ok(());
    }

    let Some(handle) = cleanup.start_background_task() else {
        warn!("Nothing to do, set TOKEN_CLEANUP_ENABLED=true or pass --once");
        pool.close().await;
        return Ok(());
    };

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("Shutdown signal received");
    handle.abort();
    pool.close().await;

    Ok(())
}
