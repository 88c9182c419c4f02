//! Typed aggregate results for subscription statistics.

use parley_core::types::StatusId;
use serde::Serialize;
use sqlx::FromRow;

/// Per-status aggregate over non-deleted and deleted projects alike.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusSummary {
    pub status_id: StatusId,
    pub status: String,
    pub project_count: i64,
    pub total_tokens_used: i64,
    pub total_token_limit: i64,
}

/// Chat traffic for one project over fixed windows.
///
/// "Today" and "this week" start at the UTC day and ISO-week boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct ChatActivity {
    pub total_messages: i64,
    pub messages_today: i64,
    pub messages_this_week: i64,
    pub messages_last_7_days: i64,
    pub tokens_today: i64,
}

/// Chat traffic across all projects since the start of the UTC day.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct DailyTraffic {
    pub api_calls_today: i64,
    pub tokens_used_today: i64,
}

/// Full subscription statistics payload.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStats {
    pub by_status: Vec<StatusSummary>,
    pub expiring_within_7_days: i64,
    pub high_usage_projects: i64,
    #[serde(flatten)]
    pub traffic: DailyTraffic,
}
