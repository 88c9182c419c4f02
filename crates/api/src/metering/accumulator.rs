//! Usage accumulation after a successful model call.

use parley_core::error::CoreError;
use parley_core::notification::{monthly_limit_message, usage_warning_message, NotificationKind};
use parley_core::usage::{threshold_notice, usage_percent, ThresholdNotice};
use parley_db::models::project::Project;
use parley_db::repositories::ProjectRepo;
use parley_events::SubscriptionEvent;
use serde_json::json;

use super::with_store_timeout;
use crate::error::AppError;
use crate::state::AppState;

/// Outcome of a usage charge.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeResult {
    pub new_total: i64,
    pub monthly_token_limit: i64,
    pub usage_percent: f64,
    /// Threshold notice handed to the notification logger, if any.
    pub notice: Option<ThresholdNotice>,
}

/// Add `tokens` to the project's running usage in one atomic statement.
///
/// When the new total crosses a threshold, a notice is published on the event
/// bus. The logger applies the dedup window and its own timeout, so notice
/// delivery never affects the charge.
pub async fn charge(
    state: &AppState,
    project: &Project,
    tokens: i64,
) -> Result<ChargeResult, AppError> {
    if tokens <= 0 {
        return Err(CoreError::Validation(format!(
            "Token charge must be positive, got {tokens}"
        ))
        .into());
    }

    let totals = with_store_timeout(
        state.config.metering.store_timeout,
        ProjectRepo::increment_usage(&state.pool, project.id, tokens),
    )
    .await?
    .ok_or_else(|| CoreError::project_not_found(&project.external_id))?;

    let percent = usage_percent(totals.total_tokens_used, totals.monthly_token_limit);
    let notice = threshold_notice(percent);

    tracing::debug!(
        project_id = %project.external_id,
        tokens,
        new_total = totals.total_tokens_used,
        usage_percent = percent,
        "Usage charged"
    );

    if let Some(notice) = notice {
        state.event_bus.publish(threshold_event(project, &notice, totals.total_tokens_used));
    }

    Ok(ChargeResult {
        new_total: totals.total_tokens_used,
        monthly_token_limit: totals.monthly_token_limit,
        usage_percent: percent,
        notice,
    })
}

fn threshold_event(project: &Project, notice: &ThresholdNotice, new_total: i64) -> SubscriptionEvent {
    let message = match notice.kind {
        NotificationKind::MonthlyLimit => monthly_limit_message(&project.name),
        _ => usage_warning_message(&project.name, notice.usage_percent),
    };

    SubscriptionEvent::new(project.id, &project.external_id, notice.kind, message)
        .with_dedup_hours(notice.dedup_hours)
        .with_payload(json!({
            "usage_percent": notice.usage_percent,
            "total_tokens_used": new_total,
        }))
}
