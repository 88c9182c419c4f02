//! Token usage math and threshold notification policy.
//!
//! The accumulator in the API layer performs the atomic increment; this module
//! decides what the resulting totals mean.

use serde::Serialize;

use crate::notification::NotificationKind;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Usage percentage at which a warning notice fires.
pub const WARNING_THRESHOLD_PERCENT: f64 = 80.0;
/// Usage percentage at which the limit notice fires.
pub const LIMIT_THRESHOLD_PERCENT: f64 = 100.0;

/// Dedup window for `usage_warning` notices.
pub const WARNING_DEDUP_HOURS: i64 = 12;
/// Dedup window for `monthly_limit` notices.
pub const LIMIT_DEDUP_HOURS: i64 = 24;

/// Usage at or above this percentage counts as "high usage" in statistics.
pub const HIGH_USAGE_PERCENT: f64 = 80.0;

// ---------------------------------------------------------------------------
// Cost estimation
// ---------------------------------------------------------------------------

/// Assumed share of input tokens when only a total is known.
const INPUT_TOKEN_SHARE: f64 = 0.6;
/// USD per input token.
const INPUT_TOKEN_PRICE: f64 = 0.000_002;
/// USD per output token.
const OUTPUT_TOKEN_PRICE: f64 = 0.000_008;

/// Rough USD cost of `tokens`, split 60/40 between input and output.
pub fn estimate_cost_usd(tokens: i64) -> f64 {
    let tokens = tokens.max(0) as f64;
    let input = tokens * INPUT_TOKEN_SHARE;
    let output = tokens - input;
    input * INPUT_TOKEN_PRICE + output * OUTPUT_TOKEN_PRICE
}

// ---------------------------------------------------------------------------
// Usage math
// ---------------------------------------------------------------------------

/// Usage as a percentage of the limit. A non-positive limit reads as 100%.
pub fn usage_percent(used: i64, limit: i64) -> f64 {
    if limit <= 0 {
        return LIMIT_THRESHOLD_PERCENT;
    }
    used as f64 * 100.0 / limit as f64
}

/// Tokens left before the limit, never negative.
pub fn remaining_tokens(used: i64, limit: i64) -> i64 {
    (limit - used).max(0)
}

/// Whole days until `expiry`, negative once it has passed.
pub fn days_until(expiry: Timestamp, now: Timestamp) -> i64 {
    (expiry - now).num_days()
}

/// Average tokens per day since `start`, counting the first day as a full day.
pub fn daily_average(used: i64, start: Timestamp, now: Timestamp) -> f64 {
    let days = (now - start).num_days().max(0) + 1;
    used as f64 / days as f64
}

/// A notice the accumulator should attempt after a charge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdNotice {
    pub kind: NotificationKind,
    pub dedup_hours: i64,
    pub usage_percent: f64,
}

/// Pick the threshold notice for a post-charge usage percentage, if any.
///
/// Only the highest crossed threshold is returned.
pub fn threshold_notice(usage_percent: f64) -> Option<ThresholdNotice> {
    if usage_percent >= LIMIT_THRESHOLD_PERCENT {
        Some(ThresholdNotice {
            kind: NotificationKind::MonthlyLimit,
            dedup_hours: LIMIT_DEDUP_HOURS,
            usage_percent,
        })
    } else if usage_percent >= WARNING_THRESHOLD_PERCENT {
        Some(ThresholdNotice {
            kind: NotificationKind::UsageWarning,
            dedup_hours: WARNING_DEDUP_HOURS,
            usage_percent,
        })
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Usage report warnings
// ---------------------------------------------------------------------------

/// Human-readable warnings for the admin usage report.
pub fn usage_warnings(usage_percent: f64, days_remaining: i64) -> Vec<String> {
    let mut warnings = Vec::new();

    if usage_percent >= 100.0 {
        warnings.push("Monthly token limit exceeded".to_string());
    } else if usage_percent >= 90.0 {
        warnings.push("Approaching monthly token limit (90%+)".to_string());
    } else if usage_percent >= 80.0 {
        warnings.push("High token usage (80%+)".to_string());
    }

    if days_remaining <= 0 {
        warnings.push("Subscription has expired".to_string());
    } else if days_remaining <= 3 {
        warnings.push("Subscription expires soon (3 days or less)".to_string());
    } else if days_remaining <= 7 {
        warnings.push("Subscription expires within a week".to_string());
    }

    warnings
}

/// Derived usage figures for one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub total_tokens_used: i64,
    pub monthly_token_limit: i64,
    pub remaining_tokens: i64,
    pub usage_percent: f64,
    pub days_remaining: i64,
    pub estimated_cost_usd: f64,
    pub daily_average: f64,
    pub warnings: Vec<String>,
}

impl UsageSnapshot {
    pub fn compute(
        used: i64,
        limit: i64,
        start: Timestamp,
        expiry: Timestamp,
        now: Timestamp,
    ) -> Self {
        let percent = usage_percent(used, limit);
        let days_remaining = days_until(expiry, now);
        Self {
            total_tokens_used: used,
            monthly_token_limit: limit,
            remaining_tokens: remaining_tokens(used, limit),
            usage_percent: percent,
            days_remaining,
            estimated_cost_usd: estimate_cost_usd(used),
            daily_average: daily_average(used, start, now),
            warnings: usage_warnings(percent, days_remaining),
        }
    }
}
