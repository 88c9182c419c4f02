use sqlx::PgPool;

/// All `id` columns must be bigint (entity tables) or smallint (lookup tables).
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_all_pks_are_correct_type(pool: PgPool) {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT table_name, data_type
         FROM information_schema.columns
         WHERE column_name = 'id'
           AND table_schema = 'public'
           AND table_name != '_sqlx_migrations'
         ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(!rows.is_empty());
    for (table, data_type) in &rows {
        assert!(
            data_type == "bigint" || data_type == "smallint",
            "Table {table}.id should be bigint or smallint, got {data_type}"
        );
    }
}

/// Status lookup seed ids must match the in-code status enum.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_status_seed_matches_enum(pool: PgPool) {
    use parley_core::subscription::ProjectStatus;

    let rows: Vec<(i16, String)> =
        sqlx::query_as("SELECT id, name FROM project_statuses ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();

    assert_eq!(rows.len(), 5);
    for (id, name) in rows {
        assert_eq!(ProjectStatus::from_id(id).as_str(), name);
    }
}

/// Health check succeeds against a migrated database.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_health_check(pool: PgPool) {
    parley_db::health_check(&pool).await.unwrap();
}
