//! Notification log model.

use parley_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `notifications` table. Immutable once written.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub project_id: DbId,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub message: String,
    pub sent_at: Timestamp,
}

/// A notification joined with its project's public identity, for the admin
/// history listing.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationWithProject {
    pub id: DbId,
    pub project_id: DbId,
    pub project_external_id: String,
    pub project_name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub message: String,
    pub sent_at: Timestamp,
}
