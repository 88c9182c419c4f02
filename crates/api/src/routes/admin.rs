//! Admin routes mounted at `/admin`. Every handler requires the `admin` role.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::{maintenance, notification, project, stats, subscription};
use crate::state::AppState;

/// ```text
/// GET    /projects                              -> project::list
/// POST   /projects                              -> project::create
/// GET    /projects/{id}                         -> project::get_by_id
/// PATCH  /projects/{id}                         -> project::update
/// DELETE /projects/{id}                         -> project::delete
/// POST   /projects/{id}/renew                   -> subscription::renew
/// POST   /projects/{id}/suspend                 -> subscription::suspend
/// POST   /projects/{id}/reactivate              -> subscription::reactivate
/// PATCH  /projects/{id}/status                  -> subscription::set_status
/// GET    /projects/{id}/usage                   -> subscription::usage
/// POST   /projects/{id}/usage/reset             -> subscription::reset_usage
/// POST   /projects/{id}/limit                   -> subscription::update_limit
/// GET    /projects/{id}/notifications           -> notification::list_for_project
/// POST   /projects/{id}/notifications/test      -> notification::send_test
/// GET    /notifications                         -> notification::list
/// GET    /subscriptions/stats                   -> stats::subscription_stats
/// POST   /maintenance/sweep                     -> maintenance::run_sweep
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", get(project::list).post(project::create))
        .route(
            "/projects/{id}",
            get(project::get_by_id)
                .patch(project::update)
                .delete(project::delete),
        )
        .route("/projects/{id}/renew", post(subscription::renew))
        .route("/projects/{id}/suspend", post(subscription::suspend))
        .route("/projects/{id}/reactivate", post(subscription::reactivate))
        .route("/projects/{id}/status", patch(subscription::set_status))
        .route("/projects/{id}/usage", get(subscription::usage))
        .route("/projects/{id}/usage/reset", post(subscription::reset_usage))
        .route("/projects/{id}/limit", post(subscription::update_limit))
        .route(
            "/projects/{id}/notifications",
            get(notification::list_for_project),
        )
        .route(
            "/projects/{id}/notifications/test",
            post(notification::send_test),
        )
        .route("/notifications", get(notification::list))
        .route("/subscriptions/stats", get(stats::subscription_stats))
        .route("/maintenance/sweep", post(maintenance::run_sweep))
}
