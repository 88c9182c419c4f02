//! Repository for the `notifications` table.

use parley_core::types::DbId;
use sqlx::PgPool;

use crate::models::notification::{Notification, NotificationWithProject};

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, project_id, type, message, sent_at";

/// Default page size for the admin history listing.
pub const DEFAULT_LIST_LIMIT: i64 = 50;
/// Upper bound on the admin history page size.
pub const MAX_LIST_LIMIT: i64 = 500;

/// Append-only access to the notification log.
pub struct NotificationRepo;

impl NotificationRepo {
    /// True if a notification of `kind` was logged for the project within the
    /// last `within_hours` hours.
    pub async fn was_recently_sent(
        pool: &PgPool,
        project_id: DbId,
        kind: &str,
        within_hours: i64,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM notifications
                WHERE project_id = $1
                  AND type = $2
                  AND sent_at > NOW() - make_interval(hours => $3::int)
             )",
        )
        .bind(project_id)
        .bind(kind)
        .bind(within_hours)
        .fetch_one(pool)
        .await
    }

    /// Append a notification record.
    pub async fn record(
        pool: &PgPool,
        project_id: DbId,
        kind: &str,
        message: &str,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications (project_id, type, message)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(project_id)
            .bind(kind)
            .bind(message)
            .fetch_one(pool)
            .await
    }

    /// Notifications for one project from the last `days` days, newest first.
    pub async fn list_for_project(
        pool: &PgPool,
        project_id: DbId,
        days: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications
             WHERE project_id = $1
               AND sent_at > NOW() - make_interval(days => $2::int)
             ORDER BY sent_at DESC, id DESC"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(project_id)
            .bind(days)
            .fetch_all(pool)
            .await
    }

    /// Notification history across projects, optionally filtered by type and
    /// external project id, newest first.
    pub async fn list(
        pool: &PgPool,
        kind: Option<&str>,
        project_external_id: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NotificationWithProject>, sqlx::Error> {
        sqlx::query_as::<_, NotificationWithProject>(
            "SELECT n.id, n.project_id,
                    p.external_id AS project_external_id,
                    p.name AS project_name,
                    n.type, n.message, n.sent_at
             FROM notifications n
             JOIN projects p ON p.id = n.project_id
             WHERE ($1::TEXT IS NULL OR n.type = $1)
               AND ($2::TEXT IS NULL OR p.external_id = $2)
             ORDER BY n.sent_at DESC, n.id DESC
             LIMIT $3 OFFSET $4",
        )
        .bind(kind)
        .bind(project_external_id)
        .bind(limit.clamp(1, MAX_LIST_LIMIT))
        .bind(offset.max(0))
        .fetch_all(pool)
        .await
    }

    /// Count notifications of `kind` for a project. Used by tests and
    /// diagnostics.
    pub async fn count_by_kind(
        pool: &PgPool,
        project_id: DbId,
        kind: &str,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE project_id = $1 AND type = $2")
            .bind(project_id)
            .bind(kind)
            .fetch_one(pool)
            .await
    }
}
