//! Admin trigger for the maintenance sweep.

use axum::extract::State;
use axum::Json;

use crate::background::expiry_sweep::{self, SweepReport};
use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/admin/maintenance/sweep
///
/// Runs one sweep cycle immediately, outside the regular schedule.
pub async fn run_sweep(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> AppResult<Json<DataResponse<SweepReport>>> {
    tracing::info!(operator = %admin.operator, "Manual maintenance sweep requested");
    let report = expiry_sweep::run_cycle(&state.pool, &state.notifier).await?;
    Ok(Json(DataResponse { data: report }))
}
