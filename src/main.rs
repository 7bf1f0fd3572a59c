//! World of Toilets auth server: credential and token lifecycle core.
//!
//! Main entry point that wires the crates together, runs migrations and
//! keeps the maintenance scheduler alive until shutdown.

use std::sync::Arc;

use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use wot_auth::{Argon2PasswordHasher, AuthComponents, LogNotifier};
use wot_core::config::AppConfig;
use wot_core::error::AppError;
use wot_core::traits::SystemClock;
use wot_database::DatabasePool;
use wot_database::repositories::{PgIdentityRepository, PgTokenRepository};
use wot_worker::{CronScheduler, TokenSweepJob};

#[tokio::main]
async fn main() {
    let env = std::env::var("WOT_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration (env: {env}): {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting World of Toilets auth v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    let db = DatabasePool::connect(&config.database).await?;
    wot_database::migration::run_migrations(db.pool()).await?;

    // ── Step 2: Repositories ─────────────────────────────────────
    let token_repo = Arc::new(PgTokenRepository::new(db.pool().clone()));
    let identity_repo = Arc::new(PgIdentityRepository::new(db.pool().clone()));

    // ── Step 3: Credential lifecycle ─────────────────────────────
    tracing::info!("Initializing credential lifecycle...");
    let auth = AuthComponents::build(
        &config.auth,
        &config.notifications,
        token_repo,
        identity_repo,
        Arc::new(Argon2PasswordHasher::new()),
        Arc::new(LogNotifier),
        Arc::new(SystemClock),
    );
    tracing::info!(
        access_ttl = %config.auth.access_token_ttl,
        refresh_ttl = %config.auth.refresh_token_ttl,
        verification_ttl = %config.auth.email_verification_ttl,
        reset_ttl = %config.auth.password_reset_ttl,
        "Credential lifecycle ready"
    );

    // ── Step 4: Scheduled maintenance ────────────────────────────
    let scheduler = if config.worker.enabled {
        let scheduler = CronScheduler::new().await?;
        let sweep = TokenSweepJob::new(auth.sweeper.clone(), config.worker.sweep_retention);
        scheduler
            .register_default_tasks(&config.worker, sweep)
            .await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Worker disabled; expired tokens will not be swept");
        None
    };

    // ── Step 5: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");

    if let Some(scheduler) = scheduler {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Scheduler did not shut down cleanly");
        }
    }
    db.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
