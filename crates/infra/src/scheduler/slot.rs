//! One schedule slot: a tokio task that sleeps until the next cron
//! occurrence, fires, and repeats.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use cron::Schedule;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use benchvault_core::{BackupOptions, BackupRecord, ScheduleSettings, ScheduleSlot};

use crate::backup::BackupRunner;
use crate::error::{BackupError, BackupResult};

/// Parse the slot's cron expression (seconds field first).
pub(super) fn slot_schedule(settings: &ScheduleSettings, slot: ScheduleSlot) -> BackupResult<Schedule> {
    let expression = settings.cron_expression(slot);
    Schedule::from_str(&expression).map_err(|e| BackupError::InvalidSchedule {
        expression,
        reason: e.to_string(),
    })
}

/// Next firing strictly after `after`, in `timezone`.
pub fn next_occurrence(
    settings: &ScheduleSettings,
    slot: ScheduleSlot,
    timezone: FixedOffset,
    after: DateTime<Utc>,
) -> BackupResult<Option<DateTime<FixedOffset>>> {
    let schedule = slot_schedule(settings, slot)?;
    Ok(schedule.after(&after.with_timezone(&timezone)).next())
}

/// Handle to a running slot task.
#[derive(Debug)]
pub(super) struct SlotHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SlotHandle {
    pub(super) fn spawn(
        slot: ScheduleSlot,
        schedule: Schedule,
        runner: Arc<dyn BackupRunner>,
        timezone: FixedOffset,
        keep_days: u32,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(slot_loop(
            slot,
            schedule,
            runner,
            timezone,
            keep_days,
            shutdown_rx,
        ));
        Self { shutdown, join }
    }

    /// Ask the loop to exit. A firing already in progress runs to completion.
    pub(super) fn shutdown(self) {
        let _ = self.shutdown.send(true);
        drop(self.join);
    }

    pub(super) fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

async fn slot_loop(
    slot: ScheduleSlot,
    schedule: Schedule,
    runner: Arc<dyn BackupRunner>,
    timezone: FixedOffset,
    keep_days: u32,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(slot = %slot, "auto backup slot started");

    loop {
        let now = Utc::now();
        let Some(next) = schedule.after(&now.with_timezone(&timezone)).next() else {
            warn!(slot = %slot, "schedule has no future occurrence");
            break;
        };
        let wait = (next.with_timezone(&Utc) - now).to_std().unwrap_or_default();
        debug!(slot = %slot, next = %next, wait_secs = wait.as_secs(), "next auto backup");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => break,
        }

        if let Err(e) = fire(runner.as_ref(), slot, keep_days, timezone).await {
            error!(slot = %slot, error = %e, "scheduled backup failed");
        }
    }

    info!(slot = %slot, "auto backup slot stopped");
}

/// Options for an automatic backup taken at `now`.
pub(super) fn auto_backup_options(
    slot: ScheduleSlot,
    timezone: FixedOffset,
    now: DateTime<Utc>,
) -> BackupOptions {
    let date = now.with_timezone(&timezone).format("%Y-%m-%d");
    let (name, description) = match slot {
        ScheduleSlot::Daily => (
            format!("Auto Daily Backup {date}"),
            "Automatic daily backup",
        ),
        ScheduleSlot::Weekly => (
            format!("Auto Weekly Backup {date}"),
            "Automatic weekly backup",
        ),
    };
    BackupOptions::named(name).with_description(description)
}

/// One firing: back up, and after a weekly backup apply retention.
pub(super) async fn fire(
    runner: &dyn BackupRunner,
    slot: ScheduleSlot,
    keep_days: u32,
    timezone: FixedOffset,
) -> BackupResult<BackupRecord> {
    info!(slot = %slot, "starting scheduled backup");
    let record = runner
        .create_backup(auto_backup_options(slot, timezone, Utc::now()))
        .await?;
    info!(slot = %slot, backup = %record.name, "scheduled backup completed");

    if slot == ScheduleSlot::Weekly {
        let report = runner.cleanup_old_backups(keep_days).await?;
        info!(keep_days, deleted = report.deleted, total = report.total, "retention applied");
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn plus_two() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    #[test]
    fn daily_occurrence_in_fixed_offset() {
        let settings = ScheduleSettings {
            daily_time: "02:30".parse().unwrap(),
            ..Default::default()
        };
        // 02:00 local.
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let next = next_occurrence(&settings, ScheduleSlot::Daily, plus_two(), after)
            .unwrap()
            .unwrap();
        assert_eq!(next.with_timezone(&Utc), Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap());
    }

    #[test]
    fn weekly_occurrence_lands_on_configured_day() {
        let settings = ScheduleSettings {
            weekly_day: 0,
            weekly_time: "01:00".parse().unwrap(),
            ..Default::default()
        };
        // Monday 2024-01-01.
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let next = next_occurrence(&settings, ScheduleSlot::Weekly, plus_two(), after)
            .unwrap()
            .unwrap();
        assert_eq!(next.with_timezone(&Utc), Utc.with_ymd_and_hms(2024, 1, 6, 23, 0, 0).unwrap());
    }

    #[test]
    fn auto_names_use_local_date() {
        // 23:30 UTC is already the next day at +02:00.
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 23, 30, 0).unwrap();
        let options = auto_backup_options(ScheduleSlot::Weekly, plus_two(), now);
        assert_eq!(options.name.as_deref(), Some("Auto Weekly Backup 2024-03-10"));
        assert!(options.compress);
        assert!(options.user_id.is_none());
        assert!(options.description.is_some());
    }
}
