//! Widget-facing routes mounted at `/projects`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::chat;
use crate::state::AppState;

/// ```text
/// POST /{project_id}/chat                          -> chat
/// GET  /{project_id}/history                       -> history
/// POST /{project_id}/messages/{message_id}/rating  -> rate_message
/// GET  /{project_id}/subscription                  -> subscription_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{project_id}/chat", post(chat::chat))
        .route("/{project_id}/history", get(chat::history))
        .route(
            "/{project_id}/messages/{message_id}/rating",
            post(chat::rate_message),
        )
        .route("/{project_id}/subscription", get(chat::subscription_status))
}
