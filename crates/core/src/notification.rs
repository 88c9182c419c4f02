//! Notification kinds and their log messages.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default look-back window for per-project notification listings.
pub const DEFAULT_HISTORY_DAYS: i64 = 30;

/// Type of a notification log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MonthlyLimit,
    UsageWarning,
    Expired,
    ExpiryReminder,
    Renewal,
    Suspension,
    Reactivation,
    LimitUpdate,
    UsageReset,
    StatusChange,
    Test,
}

impl NotificationKind {
    pub const ALL: &'static [NotificationKind] = &[
        Self::MonthlyLimit,
        Self::UsageWarning,
        Self::Expired,
        Self::ExpiryReminder,
        Self::Renewal,
        Self::Suspension,
        Self::Reactivation,
        Self::LimitUpdate,
        Self::UsageReset,
        Self::StatusChange,
        Self::Test,
    ];

    /// Return the value stored in `notifications.type`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MonthlyLimit => "monthly_limit",
            Self::UsageWarning => "usage_warning",
            Self::Expired => "expired",
            Self::ExpiryReminder => "expiry_reminder",
            Self::Renewal => "renewal",
            Self::Suspension => "suspension",
            Self::Reactivation => "reactivation",
            Self::LimitUpdate => "limit_update",
            Self::UsageReset => "usage_reset",
            Self::StatusChange => "status_change",
            Self::Test => "test",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown notification type '{s}'")))
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Message builders
// ---------------------------------------------------------------------------

pub fn monthly_limit_message(project_name: &str) -> String {
    format!("Monthly token limit reached for project: {project_name}")
}

pub fn usage_warning_message(project_name: &str, usage_percent: f64) -> String {
    format!("Token usage warning ({usage_percent:.1}%) for project: {project_name}")
}

pub fn expired_message(project_name: &str) -> String {
    format!("Subscription expired for project: {project_name}")
}

pub fn expiry_reminder_message(project_name: &str, days_left: i64) -> String {
    format!("Subscription for project {project_name} expires in {days_left} day(s)")
}

pub fn renewal_message(months: u32, new_expiry: &str) -> String {
    format!("Subscription renewed for {months} month(s). New expiry: {new_expiry}")
}

pub fn suspension_message(reason: &str) -> String {
    format!("Subscription suspended. Reason: {reason}")
}

pub fn reactivation_message() -> String {
    "Subscription reactivated".to_string()
}

pub fn limit_update_message(old_limit: i64, new_limit: i64) -> String {
    format!("Monthly token limit changed from {old_limit} to {new_limit}")
}

pub fn usage_reset_message(previous_usage: i64) -> String {
    format!("Token usage reset (previous usage: {previous_usage})")
}

pub fn status_change_message(from: &str, to: &str, reason: Option<&str>) -> String {
    match reason {
        Some(r) if !r.trim().is_empty() => {
            format!("Status changed from {from} to {to}. Reason: {r}")
        }
        _ => format!("Status changed from {from} to {to}"),
    }
}
