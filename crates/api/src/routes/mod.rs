pub mod admin;
pub mod health;
pub mod public;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /projects/{project_id}/chat                        metered chat (POST, public)
/// /projects/{project_id}/history                     chat history (GET, public)
/// /projects/{project_id}/messages/{message_id}/rating rate a message (POST, public)
/// /projects/{project_id}/subscription                subscription status (GET, public)
///
/// /admin/projects                                    list, create (admin only)
/// /admin/projects/{id}                               get, update, soft-delete
/// /admin/projects/{id}/renew                         renewal (POST)
/// /admin/projects/{id}/suspend                       suspension (POST)
/// /admin/projects/{id}/reactivate                    reactivation (POST)
/// /admin/projects/{id}/status                        status override (PATCH)
/// /admin/projects/{id}/usage                         usage report (GET)
/// /admin/projects/{id}/usage/reset                   reset usage (POST)
/// /admin/projects/{id}/limit                         set token limit (POST)
/// /admin/projects/{id}/notifications                 last 30 days (GET)
/// /admin/projects/{id}/notifications/test            log a test notice (POST)
/// /admin/notifications                               notification history (GET)
/// /admin/subscriptions/stats                         aggregate stats (GET)
/// /admin/maintenance/sweep                           run one sweep cycle (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Widget-facing routes.
        .nest("/projects", public::router())
        // Admin routes.
        .nest("/admin", admin::router())
}
