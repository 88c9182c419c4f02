//! Repository for the `projects` table.

use parley_core::subscription::ProjectStatus;
use parley_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::project::{
    ExpiredProject, NewProject, Project, ReminderCandidate, UpdateProject, UsageTotals,
};
use crate::models::stats::StatusSummary;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, external_id, name, description, client_email, model, document_text, \
     status_id, reminder_sent, start_date, expiry_date, monthly_token_limit, \
     total_tokens_used, created_at, updated_at";

/// Provides persistence for project records and their subscription fields.
pub struct ProjectRepo;

impl ProjectRepo {
    // -----------------------------------------------------------------------
    // CRUD
    // -----------------------------------------------------------------------

    /// Insert a new project, returning the created row. Status starts `active`.
    pub async fn create(pool: &PgPool, input: &NewProject) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects
                (external_id, name, description, client_email, model, document_text,
                 status_id, start_date, expiry_date, monthly_token_limit)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.external_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.client_email)
            .bind(&input.model)
            .bind(&input.document_text)
            .bind(ProjectStatus::Active.id())
            .bind(input.start_date)
            .bind(input.expiry_date)
            .bind(input.monthly_token_limit)
            .fetch_one(pool)
            .await
    }

    /// Find a project by its external id. Deleted projects are included so
    /// callers can report them as deleted.
    pub async fn find_by_external_id(
        pool: &PgPool,
        external_id: &str,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE external_id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(external_id)
            .fetch_optional(pool)
            .await
    }

    /// List all non-deleted projects, most recently created first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects WHERE status_id <> $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(ProjectStatus::Deleted.id())
            .fetch_all(pool)
            .await
    }

    /// Update descriptive fields. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no non-deleted row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                client_email = COALESCE($4, client_email),
                model = COALESCE($5, model),
                document_text = COALESCE($6, document_text)
             WHERE id = $1 AND status_id <> $7
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.client_email)
            .bind(&input.model)
            .bind(&input.document_text)
            .bind(ProjectStatus::Deleted.id())
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a project. Returns `true` if the row was newly marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE projects SET status_id = $2 WHERE id = $1 AND status_id <> $2")
                .bind(id)
                .bind(ProjectStatus::Deleted.id())
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Usage
    // -----------------------------------------------------------------------

    /// Atomically add `delta` tokens to the running total.
    ///
    /// The increment happens inside a single UPDATE, so concurrent charges
    /// never lose writes. Returns `None` if the project does not exist.
    pub async fn increment_usage(
        pool: &PgPool,
        id: DbId,
        delta: i64,
    ) -> Result<Option<UsageTotals>, sqlx::Error> {
        sqlx::query_as::<_, UsageTotals>(
            "UPDATE projects
             SET total_tokens_used = total_tokens_used + $2
             WHERE id = $1
             RETURNING total_tokens_used, monthly_token_limit",
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(pool)
        .await
    }

    /// Set a new monthly token limit.
    pub async fn update_limit(
        pool: &PgPool,
        id: DbId,
        limit: i64,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET monthly_token_limit = $2
             WHERE id = $1 AND status_id <> $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(limit)
            .bind(ProjectStatus::Deleted.id())
            .fetch_optional(pool)
            .await
    }

    /// Reset the running usage total to zero.
    pub async fn reset_usage(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET total_tokens_used = 0
             WHERE id = $1 AND status_id <> $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(ProjectStatus::Deleted.id())
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Set the status unconditionally (except on deleted rows).
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: ProjectStatus,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET status_id = $2
             WHERE id = $1 AND status_id <> $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(status.id())
            .bind(ProjectStatus::Deleted.id())
            .fetch_optional(pool)
            .await
    }

    /// Flip an `active` project whose term has lapsed to `expired`.
    ///
    /// Conditional on the current row, so a concurrent renewal is never
    /// overwritten. Returns `true` if the row changed.
    pub async fn expire_if_lapsed(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET status_id = $2
             WHERE id = $1 AND status_id = $3 AND expiry_date <= NOW()",
        )
        .bind(id)
        .bind(ProjectStatus::Expired.id())
        .bind(ProjectStatus::Active.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Apply a renewal: new expiry, status `active`, reminder flag cleared,
    /// and optionally a usage reset and a new limit.
    pub async fn update_expiry(
        pool: &PgPool,
        id: DbId,
        new_expiry: Timestamp,
        reset_usage: bool,
        new_limit: Option<i64>,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                expiry_date = $2,
                status_id = $3,
                reminder_sent = FALSE,
                total_tokens_used = CASE WHEN $4 THEN 0 ELSE total_tokens_used END,
                monthly_token_limit = COALESCE($5, monthly_token_limit)
             WHERE id = $1 AND status_id <> $6
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(new_expiry)
            .bind(ProjectStatus::Active.id())
            .bind(reset_usage)
            .bind(new_limit)
            .bind(ProjectStatus::Deleted.id())
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Ids of projects past their expiry date that are not yet marked
    /// expired (deleted projects excluded).
    pub async fn find_expired_active(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT id FROM projects
             WHERE expiry_date < NOW() AND status_id NOT IN ($1, $2)
             ORDER BY id",
        )
        .bind(ProjectStatus::Expired.id())
        .bind(ProjectStatus::Deleted.id())
        .fetch_all(pool)
        .await
    }

    /// Mark every lapsed, non-deleted, not-yet-expired project as expired in
    /// one statement. Returns the rows that changed; a second run returns none.
    pub async fn mark_expired_batch(pool: &PgPool) -> Result<Vec<ExpiredProject>, sqlx::Error> {
        sqlx::query_as::<_, ExpiredProject>(
            "UPDATE projects SET status_id = $1
             WHERE expiry_date < NOW() AND status_id NOT IN ($1, $2)
             RETURNING id, external_id, name",
        )
        .bind(ProjectStatus::Expired.id())
        .bind(ProjectStatus::Deleted.id())
        .fetch_all(pool)
        .await
    }

    /// Active projects expiring within `lead_days` that have not had a
    /// reminder this term.
    pub async fn find_reminder_candidates(
        pool: &PgPool,
        lead_days: i64,
    ) -> Result<Vec<ReminderCandidate>, sqlx::Error> {
        sqlx::query_as::<_, ReminderCandidate>(
            "SELECT id, external_id, name, expiry_date FROM projects
             WHERE status_id = $1
               AND reminder_sent = FALSE
               AND expiry_date > NOW()
               AND expiry_date <= NOW() + make_interval(days => $2::int)
             ORDER BY expiry_date",
        )
        .bind(ProjectStatus::Active.id())
        .bind(lead_days)
        .fetch_all(pool)
        .await
    }

    /// Set the reminder flag. Returns `false` if it was already set.
    pub async fn mark_reminder_sent(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET reminder_sent = TRUE WHERE id = $1 AND reminder_sent = FALSE",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    /// Per-status project counts and token totals. Every status appears,
    /// with zeros when no project has it.
    pub async fn status_summary(pool: &PgPool) -> Result<Vec<StatusSummary>, sqlx::Error> {
        sqlx::query_as::<_, StatusSummary>(
            "SELECT s.id AS status_id,
                    s.name AS status,
                    COUNT(p.id) AS project_count,
                    COALESCE(SUM(p.total_tokens_used), 0)::BIGINT AS total_tokens_used,
                    COALESCE(SUM(p.monthly_token_limit), 0)::BIGINT AS total_token_limit
             FROM project_statuses s
             LEFT JOIN projects p ON p.status_id = s.id
             GROUP BY s.id, s.name
             ORDER BY s.id",
        )
        .fetch_all(pool)
        .await
    }

    /// Active projects whose term ends within `days`.
    pub async fn count_expiring_within(pool: &PgPool, days: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM projects
             WHERE status_id = $1
               AND expiry_date > NOW()
               AND expiry_date <= NOW() + make_interval(days => $2::int)",
        )
        .bind(ProjectStatus::Active.id())
        .bind(days)
        .fetch_one(pool)
        .await
    }

    /// Active projects at or above `percent` of their limit.
    pub async fn count_high_usage(pool: &PgPool, percent: f64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM projects
             WHERE status_id = $1
               AND total_tokens_used::DOUBLE PRECISION * 100.0
                   >= monthly_token_limit::DOUBLE PRECISION * $2",
        )
        .bind(ProjectStatus::Active.id())
        .bind(percent)
        .fetch_one(pool)
        .await
    }
}
