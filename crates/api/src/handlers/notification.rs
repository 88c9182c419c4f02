//! Admin handlers for the notification log.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use parley_core::error::CoreError;
use parley_core::notification::{NotificationKind, DEFAULT_HISTORY_DAYS};
use parley_db::models::notification::{Notification, NotificationWithProject};
use parley_db::repositories::notification_repo::DEFAULT_LIST_LIMIT;
use parley_db::repositories::NotificationRepo;
use parley_events::{LogOutcome, SubscriptionEvent};

use crate::error::{AppError, AppResult};
use crate::metering::lifecycle;
use crate::middleware::rbac::RequireAdmin;
use crate::query::NotificationListParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/admin/projects/{id}/notifications
///
/// Notifications from the last 30 days, newest first.
pub async fn list_for_project(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    let project = lifecycle::load_live(&state, &id).await?;
    let notifications =
        NotificationRepo::list_for_project(&state.pool, project.id, DEFAULT_HISTORY_DAYS).await?;
    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// POST /api/v1/admin/projects/{id}/notifications/test
///
/// Writes a `test` notice through the same logger as real notices, so a
/// configured webhook receives it too.
pub async fn send_test(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<DataResponse<Notification>>)> {
    let project = lifecycle::load_live(&state, &id).await?;
    let event = SubscriptionEvent::new(
        project.id,
        &project.external_id,
        NotificationKind::Test,
        format!("Test notification for project: {}", project.name),
    );

    match state.notifier.handle(&event).await {
        Ok(LogOutcome::Recorded(notification)) => {
            tracing::info!(
                project_id = %project.external_id,
                operator = %admin.operator,
                "Test notification logged"
            );
            Ok((
                StatusCode::CREATED,
                Json(DataResponse { data: notification }),
            ))
        }
        Ok(LogOutcome::Suppressed) => Err(CoreError::Conflict(
            "Test notification was suppressed".to_string(),
        )
        .into()),
        Err(e) => Err(AppError::InternalError(e.to_string())),
    }
}

/// GET /api/v1/admin/notifications?type=&project_id=&limit=&offset=
pub async fn list(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(params): Query<NotificationListParams>,
) -> AppResult<Json<DataResponse<Vec<NotificationWithProject>>>> {
    let kind = params
        .kind
        .as_deref()
        .filter(|k| !k.is_empty())
        .map(NotificationKind::parse)
        .transpose()?;

    let notifications = NotificationRepo::list(
        &state.pool,
        kind.map(NotificationKind::as_str),
        params.project_id.as_deref().filter(|p| !p.is_empty()),
        params.limit.unwrap_or(DEFAULT_LIST_LIMIT),
        params.offset.unwrap_or(0),
    )
    .await?;
    Ok(Json(DataResponse {
        data: notifications,
    }))
}
