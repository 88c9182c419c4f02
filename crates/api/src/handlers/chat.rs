//! Public, widget-facing handlers: metered chat, history, rating and
//! subscription status.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use parley_core::error::CoreError;
use parley_core::subscription::{effective_status, Decision, REMINDER_LEAD_DAYS};
use parley_core::types::{DbId, Timestamp};
use parley_core::usage::{days_until, remaining_tokens, usage_percent};
use parley_db::models::chat_message::{
    ChatMessage, RateChatMessage, RATING_NEGATIVE, RATING_POSITIVE,
};
use parley_db::repositories::chat_message_repo::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
use parley_db::repositories::ChatMessageRepo;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::metering::chat::{process, ChatAnswer, ChatOutcome, ChatRequest};
use crate::metering::{gate, lifecycle};
use crate::query::HistoryParams;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Real-time subscription view for the widget.
#[derive(Debug, Serialize)]
pub struct SubscriptionStatusResponse {
    pub project_id: String,
    /// Status with lazy expiry applied.
    pub status: &'static str,
    pub allowed: bool,
    pub reason: Option<&'static str>,
    pub message: Option<&'static str>,
    pub start_date: Timestamp,
    pub expiry_date: Timestamp,
    pub days_until_expiry: i64,
    pub needs_renewal: bool,
    pub total_tokens_used: i64,
    pub monthly_token_limit: i64,
    pub remaining_tokens: i64,
    pub usage_percent: f64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/projects/{project_id}/chat
///
/// Blocked subscriptions answer 403 with the block reason before any model
/// call is made.
pub async fn chat(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Json<ChatAnswer>> {
    match process(&state, &project_id, body).await? {
        ChatOutcome::Answered(answer) => Ok(Json(answer)),
        ChatOutcome::Blocked { reason, project_id } => {
            Err(AppError::Blocked { reason, project_id })
        }
    }
}

/// GET /api/v1/projects/{project_id}/history?session_id=&limit=
pub async fn history(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> AppResult<Json<Vec<ChatMessage>>> {
    let session_id = params
        .session_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("session_id is required".to_string()))?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let project = lifecycle::load_live(&state, &project_id).await?;
    let messages = ChatMessageRepo::history(&state.pool, project.id, &session_id, limit).await?;
    Ok(Json(messages))
}

/// POST /api/v1/projects/{project_id}/messages/{message_id}/rating
pub async fn rate_message(
    State(state): State<AppState>,
    Path((project_id, message_id)): Path<(String, DbId)>,
    Json(body): Json<RateChatMessage>,
) -> AppResult<Json<ChatMessage>> {
    if body.rating != RATING_POSITIVE && body.rating != RATING_NEGATIVE {
        return Err(CoreError::Validation(format!(
            "Rating must be '{RATING_POSITIVE}' or '{RATING_NEGATIVE}'"
        ))
        .into());
    }

    let project = lifecycle::load_live(&state, &project_id).await?;
    let feedback = body.feedback.as_deref().map(str::trim).filter(|f| !f.is_empty());
    let rated = ChatMessageRepo::rate(&state.pool, project.id, message_id, &body.rating, feedback)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Chat message",
            key: message_id.to_string(),
        })?;
    Ok(Json(rated))
}

/// GET /api/v1/projects/{project_id}/subscription
pub async fn subscription_status(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<Json<SubscriptionStatusResponse>> {
    let (project, decision) = gate::check(&state, &project_id).await?;
    let now = Utc::now();
    let subscription = project.subscription();
    let days = days_until(project.expiry_date, now);

    let (reason, message) = match decision {
        Decision::Allowed => (None, None),
        Decision::Blocked(reason) => (Some(reason.as_str()), Some(reason.user_message())),
    };

    Ok(Json(SubscriptionStatusResponse {
        project_id: project.external_id,
        status: effective_status(&subscription, now).as_str(),
        allowed: decision.is_allowed(),
        reason,
        message,
        start_date: project.start_date,
        expiry_date: project.expiry_date,
        days_until_expiry: days,
        needs_renewal: days <= REMINDER_LEAD_DAYS,
        total_tokens_used: project.total_tokens_used,
        monthly_token_limit: project.monthly_token_limit,
        remaining_tokens: remaining_tokens(project.total_tokens_used, project.monthly_token_limit),
        usage_percent: usage_percent(project.total_tokens_used, project.monthly_token_limit),
    }))
}
