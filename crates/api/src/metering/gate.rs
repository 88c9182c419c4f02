//! Pre-flight subscription check for metered requests.

use chrono::Utc;
use parley_core::error::CoreError;
use parley_core::notification::{expired_message, NotificationKind};
use parley_core::project_id::validate_external_id;
use parley_core::subscription::{evaluate, needs_lazy_expiry, Decision};
use parley_db::models::project::Project;
use parley_db::repositories::ProjectRepo;
use parley_events::SubscriptionEvent;

use super::with_store_timeout;
use crate::error::AppError;
use crate::state::AppState;

/// Load a project by external id and evaluate its subscription.
///
/// Malformed ids are rejected before the store is touched. Performs one
/// store read. When the stored status is `active` but the term
/// has lapsed, the `expired` status is persisted on a detached task so the
/// caller never waits on that write. The task that wins the transition also
/// logs the `expired` notice, so the sweep never sees the row again.
pub async fn check(state: &AppState, external_id: &str) -> Result<(Project, Decision), AppError> {
    validate_external_id(external_id)?;
    let project = with_store_timeout(
        state.config.metering.store_timeout,
        ProjectRepo::find_by_external_id(&state.pool, external_id),
    )
    .await?
    .ok_or_else(|| CoreError::project_not_found(external_id))?;

    let now = Utc::now();
    let subscription = project.subscription();
    let decision = evaluate(&subscription, now);

    if needs_lazy_expiry(&subscription, now) {
        spawn_lazy_expiry(state, &project);
    }

    if let Decision::Blocked(reason) = decision {
        tracing::info!(
            project_id = %project.external_id,
            reason = reason.as_str(),
            "Request blocked by subscription"
        );
    }

    Ok((project, decision))
}

fn spawn_lazy_expiry(state: &AppState, project: &Project) {
    let pool = state.pool.clone();
    let notifier = state.notifier.clone();
    let timeout = state.config.metering.store_timeout;
    let event = SubscriptionEvent::new(
        project.id,
        &project.external_id,
        NotificationKind::Expired,
        expired_message(&project.name),
    );

    tokio::spawn(async move {
        let id = event.project_id;
        let external_id = event.project_external_id.as_str();
        match tokio::time::timeout(timeout, ProjectRepo::expire_if_lapsed(&pool, id)).await {
            Ok(Ok(true)) => {
                tracing::info!(project_id = %external_id, "Project marked expired on access");
                let _ = notifier.handle(&event).await;
            }
            // Already expired by another request or the sweep.
            Ok(Ok(false)) => {}
            Ok(Err(e)) => {
                tracing::error!(error = %e, project_id = %external_id, "Lazy expiry update failed");
            }
            Err(_) => {
                tracing::error!(project_id = %external_id, "Lazy expiry update timed out");
            }
        }
    });
}
