use anyhow::Context;
use tracing::info;

use benchvault_infra::BackupConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("pretty") => benchvault_observability::init_pretty(),
        _ => benchvault_observability::init(),
    }

    let config = BackupConfig::from_env().context("invalid configuration")?;
    info!(
        database = %config.connection.database,
        backup_dir = %config.backup_dir.display(),
        timezone = %config.timezone,
        "starting benchvault"
    );

    let control = benchvault_api::bootstrap::build(config).await?;
    let settings = control.init_scheduler().await?;
    info!(
        scheduler_running = settings.is_enabled,
        daily = settings.daily_job_running,
        weekly = settings.weekly_job_running,
        "backup scheduler ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("shutting down");
    control.stop_scheduler().await;
    Ok(())
}
