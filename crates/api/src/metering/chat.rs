//! Metered chat flow: subscription gate, model call, usage charge.

use std::time::Instant;

use parley_core::error::CoreError;
use parley_core::subscription::{BlockReason, Decision};
use parley_core::types::DbId;
use parley_db::models::chat_message::CreateChatMessage;
use parley_db::models::project::Project;
use parley_db::repositories::ChatMessageRepo;
use parley_llm::{Completion, LlmError};
use serde::{Deserialize, Serialize};

use super::{accumulator, gate, with_store_timeout};
use crate::error::AppError;
use crate::state::AppState;

/// Longest accepted user message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Inbound chat request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Conversation id; a new one is issued when absent.
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

/// A model answer returned to the widget.
#[derive(Debug, Clone, Serialize)]
pub struct ChatAnswer {
    /// Id of the logged exchange, absent if logging failed.
    pub message_id: Option<DbId>,
    pub response: String,
    pub tokens_used: i64,
    pub model: String,
    pub session_id: String,
    /// Usage after this exchange, absent when nothing was charged.
    pub usage_percent: Option<f64>,
    pub processing_ms: i64,
}

/// Result of a chat request that reached the subscription gate.
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    Answered(ChatAnswer),
    /// Refused before any model call.
    Blocked {
        reason: BlockReason,
        project_id: String,
    },
}

/// Validate the user message and return it trimmed.
pub fn validate_message(message: &str) -> Result<&str, CoreError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Message must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(CoreError::Validation(format!(
            "Message must be at most {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(trimmed)
}

/// Run one metered chat exchange for the project with `external_id`.
///
/// The project is charged only after the model answers. A charge failure
/// after a successful answer is logged and the answer is still returned,
/// since the provider has already billed the call.
pub async fn process(
    state: &AppState,
    external_id: &str,
    request: ChatRequest,
) -> Result<ChatOutcome, AppError> {
    let started = Instant::now();
    let message = validate_message(&request.message)?.to_string();

    let (project, decision) = gate::check(state, external_id).await?;
    if let Decision::Blocked(reason) = decision {
        return Ok(ChatOutcome::Blocked {
            reason,
            project_id: project.external_id,
        });
    }

    let model = if project.model.trim().is_empty() {
        state.config.llm.default_model.clone()
    } else {
        project.model.clone()
    };

    let completion = call_model(state, &project, &message, &model).await?;

    let usage_percent = if completion.tokens_used > 0 {
        match accumulator::charge(state, &project, completion.tokens_used).await {
            Ok(charged) => Some(charged.usage_percent),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    project_id = %project.external_id,
                    tokens = completion.tokens_used,
                    "Failed to charge usage after model answer"
                );
                None
            }
        }
    } else {
        tracing::warn!(project_id = %project.external_id, "Model reported no token usage");
        None
    };

    let session_id = request
        .session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let processing_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

    let log = CreateChatMessage {
        project_id: project.id,
        session_id: session_id.clone(),
        user_id: request.user_id,
        message,
        response: completion.text.clone(),
        tokens_used: completion.tokens_used,
        model: completion.model.clone(),
        processing_ms,
    };
    let message_id = match with_store_timeout(
        state.config.metering.store_timeout,
        ChatMessageRepo::insert(&state.pool, &log),
    )
    .await
    {
        Ok(row) => Some(row.id),
        Err(e) => {
            tracing::error!(error = %e, project_id = %project.external_id, "Failed to log chat message");
            None
        }
    };

    tracing::info!(
        project_id = %project.external_id,
        tokens = completion.tokens_used,
        processing_ms,
        "Chat answered"
    );

    Ok(ChatOutcome::Answered(ChatAnswer {
        message_id,
        response: completion.text,
        tokens_used: completion.tokens_used,
        model: completion.model,
        session_id,
        usage_percent,
        processing_ms,
    }))
}

async fn call_model(
    state: &AppState,
    project: &Project,
    message: &str,
    model: &str,
) -> Result<Completion, AppError> {
    let timeout = state.config.llm.timeout;
    match tokio::time::timeout(
        timeout,
        state.llm.complete(message, &project.document_text, model),
    )
    .await
    {
        Ok(Ok(completion)) => Ok(completion),
        Ok(Err(e)) => Err(AppError::Upstream(e)),
        Err(_) => Err(AppError::Upstream(LlmError::Timeout)),
    }
}
