//! Admin handlers for subscription lifecycle and usage.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use parley_core::subscription::{
    effective_status, needs_expiry_reminder, ProjectStatus, RenewalRequest,
};
use parley_core::types::Timestamp;
use parley_core::usage::UsageSnapshot;
use parley_db::models::project::Project;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::metering::lifecycle;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Request body for a renewal.
#[derive(Debug, Deserialize)]
pub struct RenewBody {
    #[serde(default = "default_months")]
    pub months: u32,
    #[serde(default)]
    pub reset_tokens: bool,
    pub new_limit: Option<i64>,
    #[serde(default)]
    pub extend_from_now: bool,
}

fn default_months() -> u32 {
    1
}

/// Request body for a suspension.
#[derive(Debug, Default, Deserialize)]
pub struct SuspendBody {
    pub reason: Option<String>,
}

/// Request body for a status override.
#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
    pub reason: Option<String>,
}

/// Request body for a token limit change.
#[derive(Debug, Deserialize)]
pub struct LimitBody {
    pub new_limit: i64,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Detailed usage report for one project.
#[derive(Debug, Serialize)]
pub struct UsageReport {
    pub project_id: String,
    pub name: String,
    pub status: &'static str,
    pub start_date: Timestamp,
    pub expiry_date: Timestamp,
    /// True when an expiry reminder is due and has not been sent.
    pub reminder_due: bool,
    #[serde(flatten)]
    pub usage: UsageSnapshot,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/projects/{id}/renew
pub async fn renew(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    Json(body): Json<RenewBody>,
) -> AppResult<Json<DataResponse<Project>>> {
    let request = RenewalRequest {
        months: body.months,
        reset_tokens: body.reset_tokens,
        new_limit: body.new_limit,
        extend_from_now: body.extend_from_now,
    };
    let project = lifecycle::renew(&state, &id, &request).await?;
    Ok(Json(DataResponse { data: project }))
}

/// POST /api/v1/admin/projects/{id}/suspend
pub async fn suspend(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    Json(body): Json<SuspendBody>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = lifecycle::suspend(&state, &id, body.reason.as_deref()).await?;
    Ok(Json(DataResponse { data: project }))
}

/// POST /api/v1/admin/projects/{id}/reactivate
pub async fn reactivate(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = lifecycle::reactivate(&state, &id).await?;
    Ok(Json(DataResponse { data: project }))
}

/// PATCH /api/v1/admin/projects/{id}/status
pub async fn set_status(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> AppResult<Json<DataResponse<Project>>> {
    let target = ProjectStatus::parse_assignable(&body.status)?;
    let project = lifecycle::set_status(&state, &id, target, body.reason.as_deref()).await?;
    Ok(Json(DataResponse { data: project }))
}

/// GET /api/v1/admin/projects/{id}/usage
pub async fn usage(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<UsageReport>>> {
    let project = lifecycle::load_live(&state, &id).await?;
    let now = Utc::now();
    let subscription = project.subscription();

    let report = UsageReport {
        status: effective_status(&subscription, now).as_str(),
        reminder_due: needs_expiry_reminder(&subscription, project.reminder_sent, now),
        usage: UsageSnapshot::compute(
            project.total_tokens_used,
            project.monthly_token_limit,
            project.start_date,
            project.expiry_date,
            now,
        ),
        project_id: project.external_id,
        name: project.name,
        start_date: project.start_date,
        expiry_date: project.expiry_date,
    };
    Ok(Json(DataResponse { data: report }))
}

/// POST /api/v1/admin/projects/{id}/limit
pub async fn update_limit(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    Json(body): Json<LimitBody>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = lifecycle::update_limit(&state, &id, body.new_limit).await?;
    Ok(Json(DataResponse { data: project }))
}

/// POST /api/v1/admin/projects/{id}/usage/reset
pub async fn reset_usage(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = lifecycle::reset_usage(&state, &id).await?;
    Ok(Json(DataResponse { data: project }))
}
