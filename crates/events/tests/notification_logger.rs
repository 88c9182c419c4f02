//! Integration tests for the notification logger.

use std::time::Duration;

use chrono::Utc;
use parley_core::notification::NotificationKind;
use parley_db::models::project::{NewProject, Project};
use parley_db::repositories::{NotificationRepo, ProjectRepo};
use parley_events::{EventBus, LogOutcome, NotificationLogger, SubscriptionEvent};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed(pool: &PgPool) -> Project {
    let now = Utc::now();
    let input = NewProject {
        external_id: "proj_logger".to_string(),
        name: "Logger".to_string(),
        description: None,
        client_email: None,
        model: "gpt-4o".to_string(),
        document_text: String::new(),
        start_date: now,
        expiry_date: now + chrono::Duration::days(30),
        monthly_token_limit: 1000,
    };
    ProjectRepo::create(pool, &input).await.unwrap()
}

fn warning(project: &Project) -> SubscriptionEvent {
    SubscriptionEvent::new(
        project.id,
        &project.external_id,
        NotificationKind::UsageWarning,
        "Token usage warning (85.0%) for project: Logger",
    )
    .with_dedup_hours(12)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn second_warning_inside_window_is_suppressed(pool: PgPool) {
    let project = seed(&pool).await;
    let logger = NotificationLogger::new(pool.clone(), Duration::from_secs(5));

    let first = logger.handle(&warning(&project)).await.unwrap();
    let second = logger.handle(&warning(&project)).await.unwrap();

    assert!(matches!(first, LogOutcome::Recorded(_)));
    assert!(matches!(second, LogOutcome::Suppressed));
    assert_eq!(
        NotificationRepo::count_by_kind(&pool, project.id, "usage_warning")
            .await
            .unwrap(),
        1
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn events_without_window_are_always_recorded(pool: PgPool) {
    let project = seed(&pool).await;
    let logger = NotificationLogger::new(pool.clone(), Duration::from_secs(5));
    let event = SubscriptionEvent::new(
        project.id,
        &project.external_id,
        NotificationKind::Renewal,
        "Subscription renewed",
    );

    logger.handle(&event).await.unwrap();
    logger.handle(&event).await.unwrap();

    assert_eq!(
        NotificationRepo::count_by_kind(&pool, project.id, "renewal")
            .await
            .unwrap(),
        2
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bus_consumer_serialises_concurrent_crossings(pool: PgPool) {
    let project = seed(&pool).await;
    let bus = EventBus::default();
    let logger = NotificationLogger::new(pool.clone(), Duration::from_secs(5));
    let handle = tokio::spawn(logger.run(bus.subscribe()));

    for _ in 0..5 {
        bus.publish(warning(&project));
    }
    drop(bus);
    handle.await.unwrap();

    assert_eq!(
        NotificationRepo::count_by_kind(&pool, project.id, "usage_warning")
            .await
            .unwrap(),
        1
    );
}
