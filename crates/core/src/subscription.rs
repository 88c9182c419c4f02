//! Subscription evaluation and lifecycle rules.
//!
//! Everything in this module is pure: callers pass the stored subscription
//! fields and the current time, and persist whatever the returned plan says.
//! Status ids match the `project_statuses` seed data (1-based SMALLINT).

use chrono::Months;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{StatusId, Timestamp};

// ---------------------------------------------------------------------------
// Status constants
// ---------------------------------------------------------------------------

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_SUSPENDED: &str = "suspended";
pub const STATUS_EXPIRED: &str = "expired";
pub const STATUS_DELETED: &str = "deleted";
pub const STATUS_INACTIVE: &str = "inactive";

/// Statuses an administrator may set explicitly.
pub const ASSIGNABLE_STATUSES: &[&str] = &[
    STATUS_ACTIVE,
    STATUS_SUSPENDED,
    STATUS_EXPIRED,
    STATUS_DELETED,
];

/// Renewal period bounds, in months.
pub const MIN_RENEWAL_MONTHS: u32 = 1;
pub const MAX_RENEWAL_MONTHS: u32 = 12;

/// Expiry reminders fire this many days before the expiry date.
pub const REMINDER_LEAD_DAYS: i64 = 3;

// ---------------------------------------------------------------------------
// ProjectStatus
// ---------------------------------------------------------------------------

/// Project subscription status.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active = 1,
    Suspended = 2,
    Expired = 3,
    Deleted = 4,
    Inactive = 5,
}

impl ProjectStatus {
    /// Return the database status id.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Map a stored status id back to a status.
    ///
    /// Ids outside the seed data are treated as `Inactive` so they can never
    /// unlock access.
    pub fn from_id(id: StatusId) -> Self {
        match id {
            1 => Self::Active,
            2 => Self::Suspended,
            3 => Self::Expired,
            4 => Self::Deleted,
            _ => Self::Inactive,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => STATUS_ACTIVE,
            Self::Suspended => STATUS_SUSPENDED,
            Self::Expired => STATUS_EXPIRED,
            Self::Deleted => STATUS_DELETED,
            Self::Inactive => STATUS_INACTIVE,
        }
    }

    /// Parse an administrator-supplied status name.
    ///
    /// Only [`ASSIGNABLE_STATUSES`] are accepted; `inactive` is a read-only
    /// fallback and cannot be set.
    pub fn parse_assignable(s: &str) -> Result<Self, CoreError> {
        match s {
            STATUS_ACTIVE => Ok(Self::Active),
            STATUS_SUSPENDED => Ok(Self::Suspended),
            STATUS_EXPIRED => Ok(Self::Expired),
            STATUS_DELETED => Ok(Self::Deleted),
            other => Err(CoreError::Validation(format!(
                "Invalid status '{other}'. Must be one of: {}",
                ASSIGNABLE_STATUSES.join(", ")
            ))),
        }
    }
}

impl From<ProjectStatus> for StatusId {
    fn from(value: ProjectStatus) -> Self {
        value as StatusId
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Why a chat request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    Expired,
    Suspended,
    Deleted,
    Inactive,
    LimitExceeded,
}

impl BlockReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::Suspended => "suspended",
            Self::Deleted => "deleted",
            Self::Inactive => "inactive",
            Self::LimitExceeded => "limit_exceeded",
        }
    }

    /// Message shown to the end user in the chat widget.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::Expired => "Your subscription has expired. Please renew to continue.",
            Self::Suspended => "Your account is suspended. Please contact support.",
            Self::Deleted => "This project has been deleted.",
            Self::Inactive => "Your account is inactive. Please contact support.",
            Self::LimitExceeded => {
                "Monthly usage limit reached. Please upgrade your plan or contact support."
            }
        }
    }
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Blocked(BlockReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// The subscription fields of a project record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionState {
    pub status: ProjectStatus,
    pub expiry_date: Timestamp,
    pub total_tokens_used: i64,
    pub monthly_token_limit: i64,
}

/// Decide whether a chat request for this subscription may proceed.
///
/// Checks run in order: stored status, expiry date, token quota. The stored
/// status may lag reality, so an `active` record past its expiry date is still
/// blocked as expired; see [`needs_lazy_expiry`].
pub fn evaluate(state: &SubscriptionState, now: Timestamp) -> Decision {
    match state.status {
        ProjectStatus::Active => {}
        ProjectStatus::Expired => return Decision::Blocked(BlockReason::Expired),
        ProjectStatus::Suspended => return Decision::Blocked(BlockReason::Suspended),
        ProjectStatus::Deleted => return Decision::Blocked(BlockReason::Deleted),
        ProjectStatus::Inactive => return Decision::Blocked(BlockReason::Inactive),
    }

    if now >= state.expiry_date {
        return Decision::Blocked(BlockReason::Expired);
    }

    if state.total_tokens_used >= state.monthly_token_limit {
        return Decision::Blocked(BlockReason::LimitExceeded);
    }

    Decision::Allowed
}

/// True when the stored status still says `active` but the expiry date has
/// passed. The caller should persist `expired` out of band.
pub fn needs_lazy_expiry(state: &SubscriptionState, now: Timestamp) -> bool {
    state.status == ProjectStatus::Active && now >= state.expiry_date
}

/// Status as it should be reported right now, with lazy expiry applied.
pub fn effective_status(state: &SubscriptionState, now: Timestamp) -> ProjectStatus {
    if needs_lazy_expiry(state, now) {
        ProjectStatus::Expired
    } else {
        state.status
    }
}

/// True if the subscription is past its expiry date or marked expired.
pub fn is_expired(state: &SubscriptionState, now: Timestamp) -> bool {
    now >= state.expiry_date || state.status == ProjectStatus::Expired
}

// ---------------------------------------------------------------------------
// Lifecycle transitions
// ---------------------------------------------------------------------------

/// A lifecycle transition that the current state does not permit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("Cannot reactivate expired subscription (expired {expiry_date}). Please renew first.")]
    AlreadyExpired { expiry_date: Timestamp },

    #[error("Subscription is already active")]
    AlreadyActive,

    #[error("Project has been deleted")]
    Deleted,

    #[error("Cannot set status to active: subscription expired {expiry_date}")]
    ActivateExpired { expiry_date: Timestamp },
}

/// Parameters of a renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalRequest {
    pub months: u32,
    pub reset_tokens: bool,
    pub new_limit: Option<i64>,
    /// Extend from `now` even when the current term has not run out.
    pub extend_from_now: bool,
}

/// Field updates a renewal applies. The status always becomes `active` and the
/// reminder flag is always cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalPlan {
    pub new_expiry: Timestamp,
    pub reset_tokens: bool,
    pub new_limit: Option<i64>,
}

/// Add calendar months, clamping to the last day of the target month.
pub fn add_months(ts: Timestamp, months: u32) -> Result<Timestamp, CoreError> {
    ts.checked_add_months(Months::new(months))
        .ok_or_else(|| CoreError::Validation(format!("Cannot add {months} months to {ts}")))
}

/// Validate a monthly token limit supplied by an administrator.
pub fn validate_token_limit(limit: i64) -> Result<(), CoreError> {
    if limit <= 0 {
        return Err(CoreError::Validation(
            "Token limit must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Compute the outcome of a renewal.
///
/// An expired subscription restarts from `now`; a running one is extended from
/// its current expiry date so paid time is not lost.
pub fn plan_renewal(
    state: &SubscriptionState,
    request: &RenewalRequest,
    now: Timestamp,
) -> Result<RenewalPlan, CoreError> {
    if state.status == ProjectStatus::Deleted {
        return Err(CoreError::Conflict(LifecycleError::Deleted.to_string()));
    }
    if !(MIN_RENEWAL_MONTHS..=MAX_RENEWAL_MONTHS).contains(&request.months) {
        return Err(CoreError::Validation(format!(
            "Months must be between {MIN_RENEWAL_MONTHS} and {MAX_RENEWAL_MONTHS}"
        )));
    }
    if let Some(limit) = request.new_limit {
        validate_token_limit(limit)?;
    }

    let base = if request.extend_from_now || is_expired(state, now) {
        now
    } else {
        state.expiry_date
    };

    Ok(RenewalPlan {
        new_expiry: add_months(base, request.months)?,
        reset_tokens: request.reset_tokens,
        new_limit: request.new_limit,
    })
}

/// Check that a suspended (or otherwise inactive) project may go back to
/// `active`.
pub fn check_reactivation(state: &SubscriptionState, now: Timestamp) -> Result<(), LifecycleError> {
    if state.status == ProjectStatus::Deleted {
        return Err(LifecycleError::Deleted);
    }
    if now >= state.expiry_date {
        return Err(LifecycleError::AlreadyExpired {
            expiry_date: state.expiry_date,
        });
    }
    if state.status == ProjectStatus::Active {
        return Err(LifecycleError::AlreadyActive);
    }
    Ok(())
}

/// Check that a project may be suspended. Anything short of deletion may.
pub fn check_suspension(state: &SubscriptionState) -> Result<(), LifecycleError> {
    if state.status == ProjectStatus::Deleted {
        return Err(LifecycleError::Deleted);
    }
    Ok(())
}

/// Check an administrator status override.
///
/// `deleted` is terminal, and `active` is only allowed while the term is
/// still running.
pub fn check_status_override(
    state: &SubscriptionState,
    target: ProjectStatus,
    now: Timestamp,
) -> Result<(), LifecycleError> {
    if state.status == ProjectStatus::Deleted {
        return Err(LifecycleError::Deleted);
    }
    if target == ProjectStatus::Active && now >= state.expiry_date {
        return Err(LifecycleError::ActivateExpired {
            expiry_date: state.expiry_date,
        });
    }
    Ok(())
}

/// True when an expiry reminder is due: the subscription is active, no
/// reminder has been sent this term, and expiry is within
/// [`REMINDER_LEAD_DAYS`].
pub fn needs_expiry_reminder(state: &SubscriptionState, reminder_sent: bool, now: Timestamp) -> bool {
    if reminder_sent || state.status != ProjectStatus::Active {
        return false;
    }
    let reminder_from = state.expiry_date - chrono::Duration::days(REMINDER_LEAD_DAYS);
    now >= reminder_from && now < state.expiry_date
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
