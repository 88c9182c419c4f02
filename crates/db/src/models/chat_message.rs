//! Chat message log model and DTOs.

use parley_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const RATING_POSITIVE: &str = "positive";
pub const RATING_NEGATIVE: &str = "negative";

/// A row from the `chat_messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatMessage {
    pub id: DbId,
    pub project_id: DbId,
    pub session_id: String,
    pub user_id: Option<String>,
    pub message: String,
    pub response: String,
    pub tokens_used: i64,
    pub model: String,
    pub processing_ms: i64,
    pub rating: Option<String>,
    pub feedback: Option<String>,
    pub rated_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for logging a completed chat exchange.
#[derive(Debug, Clone)]
pub struct CreateChatMessage {
    pub project_id: DbId,
    pub session_id: String,
    pub user_id: Option<String>,
    pub message: String,
    pub response: String,
    pub tokens_used: i64,
    pub model: String,
    pub processing_ms: i64,
}

/// DTO for rating a message.
#[derive(Debug, Clone, Deserialize)]
pub struct RateChatMessage {
    pub rating: String,
    pub feedback: Option<String>,
}
