//! Redis -> S3 Backup Service
//!
//! Dumps Redis with `redis-cli --rdb` on a schedule and uploads each dump to object storage.

// redis-s3-backup/src/main.rs
mod backup;
mod config;
mod errors;
mod schedule;
mod utils;

use anyhow::{Context, Result};
use backup::{BackupOrchestrator, BackupService, POLL_INTERVAL, RedisCliProducer, S3Uploader};
use chrono::Local;
use config::AppConfig;
use schedule::next_fire_delay;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Main entry point for the backup service
#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run_app().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    let app_config = AppConfig::load_from_env().context("Failed to load application configuration")?;

    tokio::fs::create_dir_all(&app_config.dump_dir)
        .await
        .with_context(|| format!("Failed to create dump directory: {}", app_config.dump_dir.display()))?;

    info!(
        schedule = %app_config.cron_schedule,
        bucket = app_config.storage.bucket_name.as_deref().unwrap_or("<unset>"),
        prefix = %app_config.storage.folder_prefix,
        first_scheduled_in_secs = next_fire_delay(&app_config.cron_schedule, &Local::now()).as_secs(),
        "Starting Redis backup service"
    );

    let producer = RedisCliProducer::from_config(&app_config.redis);
    let uploader = S3Uploader::from_config(&app_config.storage).await;
    let cron_schedule = app_config.cron_schedule.clone();
    let orchestrator = BackupOrchestrator::new(app_config, producer, uploader);

    BackupService::new(orchestrator, &cron_schedule).run(POLL_INTERVAL).await;
    Ok(())
}
