//! Administrative subscription transitions.
//!
//! Each operation loads the live project, checks the transition against the
//! rules in [`parley_core::subscription`], applies it with a single
//! conditional UPDATE and logs a notification. Notification failures are
//! logged by the notifier and never fail the operation.

use chrono::Utc;
use parley_core::error::CoreError;
use parley_core::notification::{
    limit_update_message, reactivation_message, renewal_message, status_change_message,
    suspension_message, usage_reset_message, NotificationKind,
};
use parley_core::project_id::validate_external_id;
use parley_core::subscription::{
    check_reactivation, check_status_override, check_suspension, effective_status, plan_renewal,
    validate_token_limit, ProjectStatus, RenewalRequest,
};
use parley_db::models::project::Project;
use parley_db::repositories::ProjectRepo;
use parley_events::SubscriptionEvent;

use super::with_store_timeout;
use crate::error::AppError;
use crate::state::AppState;

/// Suspension reason recorded when the administrator gives none.
pub const DEFAULT_SUSPENSION_REASON: &str = "No reason provided";

/// Load a project that has not been deleted.
pub async fn load_live(state: &AppState, external_id: &str) -> Result<Project, AppError> {
    validate_external_id(external_id)?;
    with_store_timeout(
        state.config.metering.store_timeout,
        ProjectRepo::find_by_external_id(&state.pool, external_id),
    )
    .await?
    .filter(|p| p.status() != ProjectStatus::Deleted)
    .ok_or_else(|| CoreError::project_not_found(external_id).into())
}

/// Extend the subscription term and reactivate the project.
pub async fn renew(
    state: &AppState,
    external_id: &str,
    request: &RenewalRequest,
) -> Result<Project, AppError> {
    let project = load_live(state, external_id).await?;
    let plan = plan_renewal(&project.subscription(), request, Utc::now())?;

    let renewed = with_store_timeout(
        state.config.metering.store_timeout,
        ProjectRepo::update_expiry(
            &state.pool,
            project.id,
            plan.new_expiry,
            plan.reset_tokens,
            plan.new_limit,
        ),
    )
    .await?
    .ok_or_else(|| CoreError::project_not_found(external_id))?;

    tracing::info!(
        project_id = %renewed.external_id,
        months = request.months,
        new_expiry = %renewed.expiry_date,
        reset_tokens = plan.reset_tokens,
        "Subscription renewed"
    );

    let expiry = renewed.expiry_date.format("%Y-%m-%d").to_string();
    notify(
        state,
        &renewed,
        NotificationKind::Renewal,
        renewal_message(request.months, &expiry),
    )
    .await;

    Ok(renewed)
}

/// Suspend the project. The reason is recorded only in the notification log.
pub async fn suspend(
    state: &AppState,
    external_id: &str,
    reason: Option<&str>,
) -> Result<Project, AppError> {
    let project = load_live(state, external_id).await?;
    check_suspension(&project.subscription())?;

    let suspended = with_store_timeout(
        state.config.metering.store_timeout,
        ProjectRepo::update_status(&state.pool, project.id, ProjectStatus::Suspended),
    )
    .await?
    .ok_or_else(|| CoreError::project_not_found(external_id))?;

    let reason = reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_SUSPENSION_REASON);

    tracing::warn!(project_id = %suspended.external_id, reason, "Subscription suspended");
    notify(
        state,
        &suspended,
        NotificationKind::Suspension,
        suspension_message(reason),
    )
    .await;

    Ok(suspended)
}

/// Return a suspended or inactive project to `active` while its term runs.
pub async fn reactivate(state: &AppState, external_id: &str) -> Result<Project, AppError> {
    let project = load_live(state, external_id).await?;
    check_reactivation(&project.subscription(), Utc::now())?;

    let reactivated = with_store_timeout(
        state.config.metering.store_timeout,
        ProjectRepo::update_status(&state.pool, project.id, ProjectStatus::Active),
    )
    .await?
    .ok_or_else(|| CoreError::project_not_found(external_id))?;

    tracing::info!(project_id = %reactivated.external_id, "Subscription reactivated");
    notify(
        state,
        &reactivated,
        NotificationKind::Reactivation,
        reactivation_message(),
    )
    .await;

    Ok(reactivated)
}

/// Administrator status override.
pub async fn set_status(
    state: &AppState,
    external_id: &str,
    target: ProjectStatus,
    reason: Option<&str>,
) -> Result<Project, AppError> {
    let project = load_live(state, external_id).await?;
    let now = Utc::now();
    check_status_override(&project.subscription(), target, now)?;
    let from = effective_status(&project.subscription(), now);

    let updated = with_store_timeout(
        state.config.metering.store_timeout,
        ProjectRepo::update_status(&state.pool, project.id, target),
    )
    .await?
    .ok_or_else(|| CoreError::project_not_found(external_id))?;

    tracing::info!(
        project_id = %updated.external_id,
        from = from.as_str(),
        to = target.as_str(),
        "Project status changed"
    );
    notify(
        state,
        &updated,
        NotificationKind::StatusChange,
        status_change_message(from.as_str(), target.as_str(), reason),
    )
    .await;

    Ok(updated)
}

/// Set a new monthly token ceiling.
pub async fn update_limit(
    state: &AppState,
    external_id: &str,
    new_limit: i64,
) -> Result<Project, AppError> {
    validate_token_limit(new_limit)?;
    let project = load_live(state, external_id).await?;

    let updated = with_store_timeout(
        state.config.metering.store_timeout,
        ProjectRepo::update_limit(&state.pool, project.id, new_limit),
    )
    .await?
    .ok_or_else(|| CoreError::project_not_found(external_id))?;

    tracing::info!(
        project_id = %updated.external_id,
        old_limit = project.monthly_token_limit,
        new_limit,
        "Token limit updated"
    );
    notify(
        state,
        &updated,
        NotificationKind::LimitUpdate,
        limit_update_message(project.monthly_token_limit, new_limit),
    )
    .await;

    Ok(updated)
}

/// Zero the running usage total.
pub async fn reset_usage(state: &AppState, external_id: &str) -> Result<Project, AppError> {
    let project = load_live(state, external_id).await?;

    let updated = with_store_timeout(
        state.config.metering.store_timeout,
        ProjectRepo::reset_usage(&state.pool, project.id),
    )
    .await?
    .ok_or_else(|| CoreError::project_not_found(external_id))?;

    tracing::info!(
        project_id = %updated.external_id,
        previous_usage = project.total_tokens_used,
        "Token usage reset"
    );
    notify(
        state,
        &updated,
        NotificationKind::UsageReset,
        usage_reset_message(project.total_tokens_used),
    )
    .await;

    Ok(updated)
}

/// Log an administrative notice. Failures are logged by the notifier.
async fn notify(state: &AppState, project: &Project, kind: NotificationKind, message: String) {
    let event = SubscriptionEvent::new(project.id, &project.external_id, kind, message);
    let _ = state.notifier.handle(&event).await;
}
