//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// `?session_id=&limit=` for chat history.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub session_id: Option<String>,
    pub limit: Option<i64>,
}

/// `?type=&project_id=&limit=&offset=` for the admin notification history.
#[derive(Debug, Deserialize)]
pub struct NotificationListParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// External project id.
    pub project_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
