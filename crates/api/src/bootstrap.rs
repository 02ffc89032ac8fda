//! Wiring: config → service, settings store, scheduler, control surface.

use std::sync::Arc;

use tracing::info;

use benchvault_infra::{
    AutoBackupScheduler, BackupConfig, BackupService, InMemorySettingsStore, SettingsStore,
};

use crate::control::BackupControl;

/// Build the control surface. Must run inside a tokio runtime.
///
/// Settings go to MySQL when `DATABASE_URL` is set and the `mysql` feature is
/// enabled; otherwise they are kept in memory for the life of the process.
pub async fn build(config: BackupConfig) -> anyhow::Result<BackupControl> {
    let store = settings_store(&config).await?;
    Ok(build_with_store(config, store))
}

/// Build the control surface over an explicit settings store.
pub fn build_with_store(config: BackupConfig, store: Arc<dyn SettingsStore>) -> BackupControl {
    let timezone = config.timezone;
    let service = BackupService::open(config);
    let scheduler = Arc::new(AutoBackupScheduler::new(
        store,
        Arc::new(service.clone()),
        timezone,
    ));
    BackupControl::new(service, scheduler)
}

#[cfg(feature = "mysql")]
async fn settings_store(config: &BackupConfig) -> anyhow::Result<Arc<dyn SettingsStore>> {
    use anyhow::Context;
    use benchvault_infra::settings::MySqlSettingsStore;

    match &config.database_url {
        Some(url) => {
            let store = MySqlSettingsStore::connect(url)
                .await
                .context("failed to connect settings store")?;
            info!("using MySQL settings store");
            Ok(Arc::new(store))
        }
        None => {
            info!("DATABASE_URL not set; keeping schedule settings in memory");
            Ok(Arc::new(InMemorySettingsStore::new()))
        }
    }
}

#[cfg(not(feature = "mysql"))]
async fn settings_store(config: &BackupConfig) -> anyhow::Result<Arc<dyn SettingsStore>> {
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but this build lacks the `mysql` feature; keeping schedule settings in memory");
    } else {
        info!("keeping schedule settings in memory");
    }
    Ok(Arc::new(InMemorySettingsStore::new()))
}
