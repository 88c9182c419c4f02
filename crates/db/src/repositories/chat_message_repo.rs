//! Repository for the `chat_messages` table.

use parley_core::types::DbId;
use sqlx::PgPool;

use crate::models::chat_message::{ChatMessage, CreateChatMessage};
use crate::models::stats::{ChatActivity, DailyTraffic};

const COLUMNS: &str = "id, project_id, session_id, user_id, message, response, tokens_used, \
     model, processing_ms, rating, feedback, rated_at, created_at";

/// Default and maximum history page sizes.
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 100;

/// Messages shown on the admin project detail view.
pub const RECENT_CHATS_LIMIT: i64 = 10;

/// Start of the current UTC day as a `timestamptz` expression.
const UTC_TODAY: &str = "(date_trunc('day', NOW() AT TIME ZONE 'UTC') AT TIME ZONE 'UTC')";
/// Start of the current UTC ISO week (Monday).
const UTC_WEEK: &str = "(date_trunc('week', NOW() AT TIME ZONE 'UTC') AT TIME ZONE 'UTC')";

pub struct ChatMessageRepo;

impl ChatMessageRepo {
    /// Log a completed exchange.
    pub async fn insert(
        pool: &PgPool,
        input: &CreateChatMessage,
    ) -> Result<ChatMessage, sqlx::Error> {
        let query = format!(
            "INSERT INTO chat_messages
                (project_id, session_id, user_id, message, response, tokens_used, model, processing_ms)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(input.project_id)
            .bind(&input.session_id)
            .bind(&input.user_id)
            .bind(&input.message)
            .bind(&input.response)
            .bind(input.tokens_used)
            .bind(&input.model)
            .bind(input.processing_ms)
            .fetch_one(pool)
            .await
    }

    /// The most recent `limit` messages of a session, in chronological order.
    pub async fn history(
        pool: &PgPool,
        project_id: DbId,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM (
                SELECT {COLUMNS} FROM chat_messages
                WHERE project_id = $1 AND session_id = $2
                ORDER BY created_at DESC, id DESC
                LIMIT $3
             ) recent
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(project_id)
            .bind(session_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Record a rating on a message belonging to `project_id`.
    ///
    /// Returns `None` if no such message exists for the project.
    pub async fn rate(
        pool: &PgPool,
        project_id: DbId,
        message_id: DbId,
        rating: &str,
        feedback: Option<&str>,
    ) -> Result<Option<ChatMessage>, sqlx::Error> {
        let query = format!(
            "UPDATE chat_messages
             SET rating = $3, feedback = $4, rated_at = NOW()
             WHERE id = $1 AND project_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(message_id)
            .bind(project_id)
            .bind(rating)
            .bind(feedback)
            .fetch_optional(pool)
            .await
    }

    /// The newest `limit` messages across all sessions of a project.
    pub async fn recent(
        pool: &PgPool,
        project_id: DbId,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM chat_messages
             WHERE project_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(project_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Message counts and today's token total for one project.
    pub async fn activity(pool: &PgPool, project_id: DbId) -> Result<ChatActivity, sqlx::Error> {
        let query = format!(
            "SELECT
                COUNT(*) AS total_messages,
                COUNT(*) FILTER (WHERE created_at >= {UTC_TODAY}) AS messages_today,
                COUNT(*) FILTER (WHERE created_at >= {UTC_WEEK}) AS messages_this_week,
                COUNT(*) FILTER (WHERE created_at >= NOW() - INTERVAL '7 days') AS messages_last_7_days,
                COALESCE(SUM(tokens_used) FILTER (WHERE created_at >= {UTC_TODAY}), 0)::BIGINT
                    AS tokens_today
             FROM chat_messages
             WHERE project_id = $1"
        );
        sqlx::query_as::<_, ChatActivity>(&query)
            .bind(project_id)
            .fetch_one(pool)
            .await
    }

    /// Calls and tokens logged today across every project.
    pub async fn traffic_today(pool: &PgPool) -> Result<DailyTraffic, sqlx::Error> {
        let query = format!(
            "SELECT
                COUNT(*) AS api_calls_today,
                COALESCE(SUM(tokens_used), 0)::BIGINT AS tokens_used_today
             FROM chat_messages
             WHERE created_at >= {UTC_TODAY}"
        );
        sqlx::query_as::<_, DailyTraffic>(&query)
            .fetch_one(pool)
            .await
    }
}
