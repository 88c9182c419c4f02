//! Subscription metering service.
//!
//! A chat request flows through [`gate`] (subscription evaluation), the model
//! provider, and [`accumulator`] (atomic usage charge). [`lifecycle`] holds
//! the administrative state transitions and [`chat`] composes the request
//! flow end to end.

pub mod accumulator;
pub mod chat;
pub mod gate;
pub mod lifecycle;

use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

/// Run one project store round-trip under `timeout`.
///
/// Timeouts and connection-level failures become
/// [`AppError::StoreUnavailable`]; other database errors pass through.
pub async fn with_store_timeout<T, F>(timeout: Duration, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(
            e @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)),
        )) => Err(AppError::StoreUnavailable(e.to_string())),
        Ok(Err(e)) => Err(AppError::Database(e)),
        Err(_) => Err(AppError::StoreUnavailable(format!(
            "store call timed out after {timeout:?}"
        ))),
    }
}
