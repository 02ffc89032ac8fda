//! Automatic backup scheduler.
//!
//! Holds the persisted [`ScheduleSettings`] and at most two slot tasks (daily
//! and weekly). Constructed explicitly with its settings store, backup runner
//! and timezone; callers share it behind an `Arc`.
//!
//! Scheduled firings never propagate errors: failures are logged and the
//! slot keeps its schedule. A slot awaits its own firing before computing the
//! next occurrence, so triggers that elapse during a slow run are skipped.

mod slot;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::FixedOffset;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use benchvault_core::schedule::keys;
use benchvault_core::{ScheduleSettings, ScheduleSlot, SettingsSnapshot, SettingsUpdate};

use crate::backup::BackupRunner;
use crate::error::BackupResult;
use crate::settings::SettingsStore;

use slot::{fire, slot_schedule, SlotHandle};

pub use slot::next_occurrence;

const ALL_KEYS: [&str; 6] = [
    keys::DAILY_ENABLED,
    keys::DAILY_TIME,
    keys::WEEKLY_ENABLED,
    keys::WEEKLY_DAY,
    keys::WEEKLY_TIME,
    keys::KEEP_DAYS,
];

/// Outcome of a manually triggered scheduled backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestBackupReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct SchedulerState {
    settings: ScheduleSettings,
    running: bool,
    daily: Option<SlotHandle>,
    weekly: Option<SlotHandle>,
}

impl SchedulerState {
    fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            settings: self.settings.clone(),
            is_enabled: self.running,
            daily_job_running: self.daily.as_ref().is_some_and(|h| !h.is_finished()),
            weekly_job_running: self.weekly.as_ref().is_some_and(|h| !h.is_finished()),
        }
    }

    fn slot_mut(&mut self, slot: ScheduleSlot) -> &mut Option<SlotHandle> {
        match slot {
            ScheduleSlot::Daily => &mut self.daily,
            ScheduleSlot::Weekly => &mut self.weekly,
        }
    }

    fn stop(&mut self) {
        for handle in [self.daily.take(), self.weekly.take()].into_iter().flatten() {
            handle.shutdown();
        }
        self.running = false;
    }
}

/// Daily/weekly automatic backup scheduler.
pub struct AutoBackupScheduler {
    store: Arc<dyn SettingsStore>,
    runner: Arc<dyn BackupRunner>,
    timezone: FixedOffset,
    state: Mutex<SchedulerState>,
}

impl std::fmt::Debug for AutoBackupScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoBackupScheduler")
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

impl AutoBackupScheduler {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        runner: Arc<dyn BackupRunner>,
        timezone: FixedOffset,
    ) -> Self {
        Self {
            store,
            runner,
            timezone,
            state: Mutex::new(SchedulerState::default()),
        }
    }

    pub fn timezone(&self) -> FixedOffset {
        self.timezone
    }

    /// Load settings from the store and start if any slot is enabled.
    ///
    /// Keys that cannot be read fall back to their defaults.
    pub async fn init(&self) -> BackupResult<SettingsSnapshot> {
        let settings = self.load_settings().await;
        {
            let mut state = self.state.lock().await;
            state.settings = settings.clone();
        }

        if settings.any_enabled() {
            self.start().await?;
        }

        let describe = |slot| {
            if settings.is_enabled(slot) {
                settings.describe(slot)
            } else {
                "disabled".to_string()
            }
        };
        info!(
            daily = %describe(ScheduleSlot::Daily),
            weekly = %describe(ScheduleSlot::Weekly),
            "auto backup scheduler initialized"
        );
        Ok(self.settings().await)
    }

    async fn load_settings(&self) -> ScheduleSettings {
        let mut stored = HashMap::new();
        for key in ALL_KEYS {
            match self.store.get(key).await {
                Ok(Some(value)) => {
                    stored.insert(key, value);
                }
                Ok(None) => {}
                Err(e) => warn!(key, error = %e, "could not read setting; using default"),
            }
        }
        ScheduleSettings::from_stored(|key| stored.get(key).cloned())
    }

    /// Register a task for each enabled slot. No-op when already running.
    pub async fn start(&self) -> BackupResult<()> {
        let mut state = self.state.lock().await;
        self.start_locked(&mut state)
    }

    fn start_locked(&self, state: &mut SchedulerState) -> BackupResult<()> {
        if state.running {
            warn!("auto backup scheduler is already running");
            return Ok(());
        }

        // Validate every enabled slot before spawning anything.
        let mut planned = Vec::new();
        for slot in [ScheduleSlot::Daily, ScheduleSlot::Weekly] {
            if state.settings.is_enabled(slot) {
                planned.push((slot, slot_schedule(&state.settings, slot)?));
            }
        }

        for (slot, schedule) in planned {
            let handle = SlotHandle::spawn(
                slot,
                schedule,
                Arc::clone(&self.runner),
                self.timezone,
                state.settings.keep_days,
            );
            *state.slot_mut(slot) = Some(handle);
            info!(slot = %slot, schedule = %state.settings.describe(slot), "auto backup scheduled");
        }

        state.running = true;
        Ok(())
    }

    /// Cancel both slot tasks. Idempotent.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        state.stop();
        info!("auto backup scheduler stopped");
    }

    /// Validate, persist and apply a partial settings update, then restart.
    ///
    /// Each provided field is persisted individually; if the store rejects
    /// one, the error is returned and the running schedule is left as is.
    pub async fn update_settings(&self, update: SettingsUpdate) -> BackupResult<SettingsSnapshot> {
        let mut state = self.state.lock().await;
        let next = update.apply_to(&state.settings)?;

        for (key, value) in update.stored_pairs() {
            self.store.set(key, &value).await?;
        }

        state.stop();
        state.settings = next;
        if state.settings.any_enabled() {
            self.start_locked(&mut state)?;
        }

        info!(settings = ?state.settings, "auto backup settings updated");
        Ok(state.snapshot())
    }

    /// Current settings plus live scheduler state.
    pub async fn settings(&self) -> SettingsSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Daily firing, run now. Failures are logged.
    pub async fn run_daily_backup(&self) {
        self.run_logged(ScheduleSlot::Daily).await;
    }

    /// Weekly firing (backup plus retention), run now. Failures are logged.
    pub async fn run_weekly_backup(&self) {
        self.run_logged(ScheduleSlot::Weekly).await;
    }

    async fn run_logged(&self, slot: ScheduleSlot) {
        if let Err(e) = self.run_slot(slot).await {
            error!(slot = %slot, error = %e, "scheduled backup failed");
        }
    }

    async fn run_slot(&self, slot: ScheduleSlot) -> BackupResult<()> {
        let keep_days = self.state.lock().await.settings.keep_days;
        fire(self.runner.as_ref(), slot, keep_days, self.timezone).await?;
        Ok(())
    }

    /// Run a slot's firing now and report how it went.
    pub async fn test_backup(&self, slot: ScheduleSlot) -> TestBackupReport {
        match self.run_slot(slot).await {
            Ok(()) => TestBackupReport {
                success: true,
                message: Some(format!("{slot} backup test completed")),
                error: None,
            },
            Err(e) => {
                error!(slot = %slot, error = %e, "test backup failed");
                TestBackupReport {
                    success: false,
                    message: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
