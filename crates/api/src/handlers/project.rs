//! Admin handlers for the `/admin/projects` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use parley_core::error::CoreError;
use parley_core::project_id::generate_external_id;
use parley_core::subscription::{add_months, effective_status, ProjectStatus};
use parley_core::usage::UsageSnapshot;
use parley_db::models::chat_message::ChatMessage;
use parley_db::models::project::{CreateProject, NewProject, Project, UpdateProject};
use parley_db::models::stats::ChatActivity;
use parley_db::repositories::chat_message_repo::RECENT_CHATS_LIMIT;
use parley_db::repositories::{ChatMessageRepo, ProjectRepo};
use serde::Serialize;
use validator::Validate;

use crate::error::AppResult;
use crate::metering::{lifecycle, with_store_timeout};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Project record with its usage figures and chat activity.
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    /// Status with lazy expiry applied.
    pub effective_status: &'static str,
    pub usage: UsageSnapshot,
    pub activity: ChatActivity,
    /// Newest exchanges first.
    pub recent_chats: Vec<ChatMessage>,
}

/// POST /api/v1/admin/projects
///
/// Omitted subscription fields take the configured defaults: the default
/// token limit and a term of `DEFAULT_TERM_MONTHS` from now.
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateProject>,
) -> AppResult<(StatusCode, Json<DataResponse<Project>>)> {
    input.validate()?;

    let now = Utc::now();
    let metering = &state.config.metering;

    let expiry_date = match input.expiry_date {
        Some(date) if date <= now => {
            return Err(
                CoreError::Validation("expiry_date must be in the future".to_string()).into(),
            );
        }
        Some(date) => date,
        None => add_months(now, metering.default_term_months)?,
    };

    let new_project = NewProject {
        external_id: generate_external_id(now),
        name: input.name.trim().to_string(),
        description: input.description,
        client_email: input.client_email,
        model: input
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| state.config.llm.default_model.clone()),
        document_text: input.document_text.unwrap_or_default(),
        start_date: now,
        expiry_date,
        monthly_token_limit: input
            .monthly_token_limit
            .unwrap_or(metering.default_monthly_token_limit),
    };

    let project = ProjectRepo::create(&state.pool, &new_project).await?;
    tracing::info!(
        project_id = %project.external_id,
        operator = %admin.operator,
        monthly_token_limit = project.monthly_token_limit,
        expiry_date = %project.expiry_date,
        "Project created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// GET /api/v1/admin/projects
pub async fn list(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<Project>>>> {
    let projects = ProjectRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: projects }))
}

/// GET /api/v1/admin/projects/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<ProjectDetail>>> {
    let project = lifecycle::load_live(&state, &id).await?;
    let timeout = state.config.metering.store_timeout;

    let activity = with_store_timeout(timeout, ChatMessageRepo::activity(&state.pool, project.id))
        .await?;
    let recent_chats = with_store_timeout(
        timeout,
        ChatMessageRepo::recent(&state.pool, project.id, RECENT_CHATS_LIMIT),
    )
    .await?;

    let now = Utc::now();
    let detail = ProjectDetail {
        effective_status: effective_status(&project.subscription(), now).as_str(),
        usage: UsageSnapshot::compute(
            project.total_tokens_used,
            project.monthly_token_limit,
            project.start_date,
            project.expiry_date,
            now,
        ),
        activity,
        recent_chats,
        project,
    };
    Ok(Json(DataResponse { data: detail }))
}

/// PATCH /api/v1/admin/projects/{id}
pub async fn update(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    Json(input): Json<UpdateProject>,
) -> AppResult<Json<DataResponse<Project>>> {
    input.validate()?;
    let project = lifecycle::load_live(&state, &id).await?;
    let updated = ProjectRepo::update(&state.pool, project.id, &input)
        .await?
        .ok_or_else(|| CoreError::project_not_found(&id))?;
    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/v1/admin/projects/{id}
///
/// Soft delete: the row is kept with status `deleted`.
pub async fn delete(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    lifecycle::set_status(
        &state,
        &id,
        ProjectStatus::Deleted,
        Some("Project deleted by administrator"),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
