//! Project entity model and DTOs.

use parley_core::subscription::{ProjectStatus, SubscriptionState};
use parley_core::types::{DbId, StatusId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A project row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub external_id: String,
    pub name: String,
    pub description: Option<String>,
    pub client_email: Option<String>,
    pub model: String,
    #[serde(skip_serializing)]
    pub document_text: String,
    pub status_id: StatusId,
    pub reminder_sent: bool,
    pub start_date: Timestamp,
    pub expiry_date: Timestamp,
    pub monthly_token_limit: i64,
    pub total_tokens_used: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Project {
    pub fn status(&self) -> ProjectStatus {
        ProjectStatus::from_id(self.status_id)
    }

    /// The fields the subscription evaluator needs.
    pub fn subscription(&self) -> SubscriptionState {
        SubscriptionState {
            status: self.status(),
            expiry_date: self.expiry_date,
            total_tokens_used: self.total_tokens_used,
            monthly_token_limit: self.monthly_token_limit,
        }
    }
}

/// DTO for creating a new project. Omitted subscription fields fall back to
/// the configured defaults.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProject {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    #[validate(email)]
    pub client_email: Option<String>,
    pub model: Option<String>,
    pub document_text: Option<String>,
    pub expiry_date: Option<Timestamp>,
    #[validate(range(min = 1))]
    pub monthly_token_limit: Option<i64>,
}

/// A fully resolved project insert.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub external_id: String,
    pub name: String,
    pub description: Option<String>,
    pub client_email: Option<String>,
    pub model: String,
    pub document_text: String,
    pub start_date: Timestamp,
    pub expiry_date: Timestamp,
    pub monthly_token_limit: i64,
}

/// DTO for updating an existing project. All fields are optional.
///
/// Subscription fields are changed only through the lifecycle operations.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProject {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(email)]
    pub client_email: Option<String>,
    pub model: Option<String>,
    pub document_text: Option<String>,
}

/// Totals returned by the atomic usage increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize)]
pub struct UsageTotals {
    pub total_tokens_used: i64,
    pub monthly_token_limit: i64,
}

/// A project that the sweep just moved to `expired`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExpiredProject {
    pub id: DbId,
    pub external_id: String,
    pub name: String,
}

/// An active project due an expiry reminder.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReminderCandidate {
    pub id: DbId,
    pub external_id: String,
    pub name: String,
    pub expiry_date: Timestamp,
}
