//! Periodic subscription maintenance.
//!
//! Flips every lapsed project to `expired` in one batch UPDATE and logs an
//! `expired` notice for each, then sends expiry reminders to active projects
//! entering their last days. Backstop for the lazy expiry done on access.

use std::time::Duration;

use chrono::Utc;
use parley_core::notification::{expired_message, expiry_reminder_message, NotificationKind};
use parley_core::subscription::REMINDER_LEAD_DAYS;
use parley_core::usage::days_until;
use parley_db::repositories::ProjectRepo;
use parley_events::{NotificationLogger, SubscriptionEvent};
use serde::Serialize;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// Counts from one sweep cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Projects newly moved to `expired`.
    pub expired: usize,
    /// Expiry reminders sent.
    pub reminders: usize,
    /// Reminder candidates that could not be processed.
    pub failures: usize,
}

/// Run the sweep loop. The first cycle runs immediately.
///
/// A failed cycle is logged and retried at the next tick. Runs until
/// `cancel` is triggered.
pub async fn run(
    pool: PgPool,
    notifier: NotificationLogger,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Expiry sweep job started");

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Expiry sweep job stopping");
                break;
            }
            _ = ticker.tick() => {
                match run_cycle(&pool, &notifier).await {
                    Ok(report) if report == SweepReport::default() => {
                        tracing::debug!("Expiry sweep: nothing to do");
                    }
                    Ok(report) => {
                        tracing::info!(
                            expired = report.expired,
                            reminders = report.reminders,
                            failures = report.failures,
                            "Expiry sweep cycle complete"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Expiry sweep: cycle failed");
                    }
                }
            }
        }
    }
}

/// Run one sweep cycle.
///
/// Idempotent: a second run right after the first finds nothing to expire
/// and no reminders due. Only the batch expiry UPDATE can fail the cycle;
/// per-project reminder failures are logged and counted.
pub async fn run_cycle(
    pool: &PgPool,
    notifier: &NotificationLogger,
) -> Result<SweepReport, sqlx::Error> {
    let mut report = SweepReport::default();

    let expired = ProjectRepo::mark_expired_batch(pool).await?;
    for project in &expired {
        tracing::info!(project_id = %project.external_id, "Subscription expired");
        let event = SubscriptionEvent::new(
            project.id,
            &project.external_id,
            NotificationKind::Expired,
            expired_message(&project.name),
        );
        let _ = notifier.handle(&event).await;
    }
    report.expired = expired.len();

    let candidates = match ProjectRepo::find_reminder_candidates(pool, REMINDER_LEAD_DAYS).await {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::error!(error = %e, "Expiry sweep: reminder lookup failed");
            report.failures += 1;
            return Ok(report);
        }
    };

    let now = Utc::now();
    for candidate in candidates {
        match ProjectRepo::mark_reminder_sent(pool, candidate.id).await {
            Ok(true) => {
                let days_left = days_until(candidate.expiry_date, now).max(0);
                let event = SubscriptionEvent::new(
                    candidate.id,
                    &candidate.external_id,
                    NotificationKind::ExpiryReminder,
                    expiry_reminder_message(&candidate.name, days_left),
                );
                let _ = notifier.handle(&event).await;
                report.reminders += 1;
            }
            // Claimed by a concurrent sweep.
            Ok(false) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    project_id = %candidate.external_id,
                    "Expiry sweep: failed to mark reminder"
                );
                report.failures += 1;
            }
        }
    }

    Ok(report)
}
