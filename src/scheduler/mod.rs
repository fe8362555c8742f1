//! Background jobs.
//!
//! One job today: the recurring card duplication, run on
//! `scheduler.recurring_cron` (six fields, UTC).

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::config;
use crate::services::recurring_service::{self, LastRun};
use crate::services::RecurringService;

static RUNNING: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub enabled: bool,
    pub running: bool,
    pub recurring_cron: String,
    pub last_run: Option<LastRun>,
}

pub fn status() -> SchedulerStatus {
    let settings = &config::config().scheduler;
    SchedulerStatus {
        enabled: settings.enabled,
        running: RUNNING.load(Ordering::Relaxed),
        recurring_cron: settings.recurring_cron.clone(),
        last_run: recurring_service::last_run(),
    }
}

/// Run the recurring job once, logging instead of failing
pub async fn run_recurring_job() {
    let result = match RecurringService::new().await {
        Ok(service) => service.run().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => tracing::info!(
            "Recurring job finished: {} boards, {} duplicated, {} failed",
            report.boards,
            report.duplicated,
            report.failed
        ),
        Err(e) => tracing::error!("Recurring job failed: {}", e.message()),
    }
}

/// Start the scheduler when enabled. The caller owns the handle and shuts it down.
pub async fn start() -> Result<Option<JobScheduler>, JobSchedulerError> {
    let settings = &config::config().scheduler;
    if !settings.enabled {
        tracing::info!("Scheduler disabled");
        return Ok(None);
    }

    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(settings.recurring_cron.as_str(), |_uuid, _lock| {
        Box::pin(async move {
            tracing::info!("Running recurring card job");
            run_recurring_job().await;
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    RUNNING.store(true, Ordering::Relaxed);

    tracing::info!("Scheduler started, recurring cards on '{}' (UTC)", settings.recurring_cron);

    Ok(Some(scheduler))
}

/// Stop a scheduler returned by [`start`]
pub async fn stop(mut scheduler: JobScheduler) {
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!("Scheduler shutdown failed: {}", e);
    }
    RUNNING.store(false, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_reflects_config_before_start() {
        let status = status();
        assert!(!status.running);
        assert_eq!(status.recurring_cron, config::config().scheduler.recurring_cron);
    }
}
