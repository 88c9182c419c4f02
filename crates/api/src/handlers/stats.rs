//! Admin subscription statistics.

use axum::extract::State;
use axum::Json;
use parley_core::usage::HIGH_USAGE_PERCENT;
use parley_db::models::stats::SubscriptionStats;
use parley_db::repositories::{ChatMessageRepo, ProjectRepo};

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Window for the "expiring soon" count.
const EXPIRING_SOON_DAYS: i64 = 7;

/// GET /api/v1/admin/subscriptions/stats
///
/// Project counts per status plus today's chat traffic across all projects.
pub async fn subscription_stats(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> AppResult<Json<DataResponse<SubscriptionStats>>> {
    let by_status = ProjectRepo::status_summary(&state.pool).await?;
    let expiring_within_7_days =
        ProjectRepo::count_expiring_within(&state.pool, EXPIRING_SOON_DAYS).await?;
    let high_usage_projects = ProjectRepo::count_high_usage(&state.pool, HIGH_USAGE_PERCENT).await?;
    let traffic = ChatMessageRepo::traffic_today(&state.pool).await?;

    Ok(Json(DataResponse {
        data: SubscriptionStats {
            by_status,
            expiring_within_7_days,
            high_usage_projects,
            traffic,
        },
    }))
}
