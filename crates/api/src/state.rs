use std::sync::Arc;

use parley_events::{EventBus, NotificationLogger};
use parley_llm::LlmClient;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: parley_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Bus carrying fire-and-forget threshold notices to the logger task.
    pub event_bus: Arc<EventBus>,
    /// Direct notification writer for administrative actions.
    pub notifier: NotificationLogger,
    /// Model provider.
    pub llm: Arc<dyn LlmClient>,
}
