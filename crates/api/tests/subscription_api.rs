//! HTTP-level integration tests for the admin project, subscription,
//! notification, statistics and maintenance endpoints.

mod common;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Months, Utc};
use common::{
    admin_token, body_json, build_test_app, build_test_app_with_config, delete_auth, get,
    get_auth, patch_json_auth, post_auth, post_json, post_json_auth, reload, seed_project, signed_token,
    test_config, user_token, ScriptedLlm,
};
use parley_core::subscription::ProjectStatus;
use parley_db::repositories::{NotificationRepo, ProjectRepo};
use serde_json::json;
use sqlx::PgPool;

fn parse_ts(value: &serde_json::Value) -> DateTime<Utc> {
    value.as_str().unwrap().parse().unwrap()
}

fn assert_close(actual: DateTime<Utc>, expected: DateTime<Utc>) {
    let drift = (actual - expected).num_seconds().abs();
    assert!(drift < 60, "expected {expected}, got {actual}");
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_routes_require_a_token(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get(app, "/api/v1/admin/projects").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_routes_require_the_admin_role(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get_auth(app, "/api/v1/admin/projects", &user_token()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn garbage_token_is_rejected(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get_auth(app, "/api/v1/admin/projects", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn expired_or_anonymous_operator_tokens_are_rejected(pool: PgPool) {
    let app = build_test_app(pool);
    let now = Utc::now().timestamp();

    let expired = signed_token(json!({"sub": "ops", "role": "admin", "exp": now - 600}));
    let response = get_auth(app.clone(), "/api/v1/admin/projects", &expired).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let anonymous = signed_token(json!({"role": "admin", "exp": now + 600}));
    let response = get_auth(app, "/api/v1/admin/projects", &anonymous).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Project CRUD
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_applies_subscription_defaults(pool: PgPool) {
    let app = build_test_app(pool);
    let token = admin_token();

    let response = post_json_auth(
        app,
        "/api/v1/admin/projects",
        json!({ "name": "Support Bot", "document_text": "FAQ" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let data = body_json(response).await["data"].clone();
    assert!(data["external_id"].as_str().unwrap().starts_with("proj_"));
    assert_eq!(data["monthly_token_limit"], 100_000);
    assert_eq!(data["total_tokens_used"], 0);
    assert_eq!(data["model"], "gpt-4o");
    assert_eq!(data["status_id"], 1);
    assert!(data.get("document_text").is_none());

    let expected = Utc::now().checked_add_months(Months::new(12)).unwrap();
    assert_close(parse_ts(&data["expiry_date"]), expected);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_validates_input(pool: PgPool) {
    let app = build_test_app(pool);
    let token = admin_token();

    let response = post_json_auth(
        app.clone(),
        "/api/v1/admin/projects",
        json!({ "name": "" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/admin/projects",
        json!({ "name": "Bot", "monthly_token_limit": 0 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let past = (Utc::now() - Duration::days(1)).to_rfc3339();
    let response = post_json_auth(
        app,
        "/api/v1/admin/projects",
        json!({ "name": "Bot", "expiry_date": past }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_and_soft_delete(pool: PgPool) {
    seed_project(&pool, "proj_crud", 30, 1000, 0).await;
    let app = build_test_app(pool.clone());
    let token = admin_token();

    let response = patch_json_auth(
        app.clone(),
        "/api/v1/admin/projects/proj_crud",
        json!({ "name": "Renamed" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["name"], "Renamed");

    let response = delete_auth(app.clone(), "/api/v1/admin/projects/proj_crud", &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        reload(&pool, "proj_crud").await.status(),
        ProjectStatus::Deleted
    );

    let response = get_auth(app.clone(), "/api/v1/admin/projects/proj_crud", &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let list = body_json(get_auth(app, "/api/v1/admin/projects", &token).await).await;
    assert!(list["data"].as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Renewal
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn renewal_from_expired_restarts_from_now(pool: PgPool) {
    let project = seed_project(&pool, "proj_renew_exp", -5, 1000, 900).await;
    ProjectRepo::update_status(&pool, project.id, ProjectStatus::Expired)
        .await
        .unwrap();
    let app = build_test_app(pool.clone());

    let response = post_json_auth(
        app,
        "/api/v1/admin/projects/proj_renew_exp/renew",
        json!({ "months": 1, "reset_tokens": true }),
        &admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let renewed = reload(&pool, "proj_renew_exp").await;
    assert_eq!(renewed.status(), ProjectStatus::Active);
    assert_eq!(renewed.total_tokens_used, 0);
    assert!(!renewed.reminder_sent);
    assert_close(
        renewed.expiry_date,
        Utc::now().checked_add_months(Months::new(1)).unwrap(),
    );
    assert_eq!(
        NotificationRepo::count_by_kind(&pool, project.id, "renewal")
            .await
            .unwrap(),
        1
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn renewal_from_active_extends_current_term(pool: PgPool) {
    let project = seed_project(&pool, "proj_renew_act", 10, 1000, 300).await;
    let app = build_test_app(pool.clone());

    let response = post_json_auth(
        app,
        "/api/v1/admin/projects/proj_renew_act/renew",
        json!({ "months": 1, "new_limit": 5000 }),
        &admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let renewed = reload(&pool, "proj_renew_act").await;
    assert_eq!(
        renewed.expiry_date,
        project.expiry_date.checked_add_months(Months::new(1)).unwrap()
    );
    assert_eq!(renewed.total_tokens_used, 300);
    assert_eq!(renewed.monthly_token_limit, 5000);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn renewal_rejects_out_of_range_months(pool: PgPool) {
    seed_project(&pool, "proj_renew_bad", 10, 1000, 0).await;
    let app = build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/admin/projects/proj_renew_bad/renew",
        json!({ "months": 13 }),
        &admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Suspension and reactivation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn suspend_then_reactivate(pool: PgPool) {
    let project = seed_project(&pool, "proj_susp", 30, 1000, 0).await;
    let app = build_test_app(pool.clone());
    let token = admin_token();

    let response = post_json_auth(
        app.clone(),
        "/api/v1/admin/projects/proj_susp/suspend",
        json!({ "reason": "abuse" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        reload(&pool, "proj_susp").await.status(),
        ProjectStatus::Suspended
    );

    let notices = NotificationRepo::list_for_project(&pool, project.id, 30)
        .await
        .unwrap();
    assert_eq!(notices[0].kind, "suspension");
    assert!(notices[0].message.contains("abuse"));

    let response = post_auth(
        app.clone(),
        "/api/v1/admin/projects/proj_susp/reactivate",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        reload(&pool, "proj_susp").await.status(),
        ProjectStatus::Active
    );

    // Reactivating an active project is a conflict.
    let response = post_auth(app, "/api/v1/admin/projects/proj_susp/reactivate", &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "ALREADY_ACTIVE");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reactivating_expired_project_is_refused(pool: PgPool) {
    let project = seed_project(&pool, "proj_react_exp", -3, 1000, 0).await;
    ProjectRepo::update_status(&pool, project.id, ProjectStatus::Suspended)
        .await
        .unwrap();
    let app = build_test_app(pool.clone());

    let response = post_auth(
        app,
        "/api/v1/admin/projects/proj_react_exp/reactivate",
        &admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "ALREADY_EXPIRED");
    assert_eq!(
        reload(&pool, "proj_react_exp").await.status(),
        ProjectStatus::Suspended
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn lifecycle_on_deleted_project_is_not_found(pool: PgPool) {
    let project = seed_project(&pool, "proj_gone", 30, 1000, 0).await;
    ProjectRepo::soft_delete(&pool, project.id).await.unwrap();
    let app = build_test_app(pool);
    let token = admin_token();

    for path in ["renew", "suspend"] {
        let response = post_json_auth(
            app.clone(),
            &format!("/api/v1/admin/projects/proj_gone/{path}"),
            json!({}),
            &token,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
    }
    let response = post_auth(app, "/api/v1/admin/projects/proj_gone/reactivate", &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Status override, limit, reset
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn status_override(pool: PgPool) {
    let project = seed_project(&pool, "proj_override", 30, 1000, 0).await;
    let app = build_test_app(pool.clone());
    let token = admin_token();

    let response = patch_json_auth(
        app.clone(),
        "/api/v1/admin/projects/proj_override/status",
        json!({ "status": "expired", "reason": "chargeback" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        reload(&pool, "proj_override").await.status(),
        ProjectStatus::Expired
    );
    assert_eq!(
        NotificationRepo::count_by_kind(&pool, project.id, "status_change")
            .await
            .unwrap(),
        1
    );

    let response = patch_json_auth(
        app,
        "/api/v1/admin/projects/proj_override/status",
        json!({ "status": "inactive" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn activating_a_lapsed_project_is_refused(pool: PgPool) {
    let project = seed_project(&pool, "proj_override_exp", -1, 1000, 0).await;
    ProjectRepo::update_status(&pool, project.id, ProjectStatus::Expired)
        .await
        .unwrap();
    let app = build_test_app(pool);

    let response = patch_json_auth(
        app,
        "/api/v1/admin/projects/proj_override_exp/status",
        json!({ "status": "active" }),
        &admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn limit_update_and_usage_reset(pool: PgPool) {
    let project = seed_project(&pool, "proj_quota", 30, 1000, 700).await;
    let app = build_test_app(pool.clone());
    let token = admin_token();

    let response = post_json_auth(
        app.clone(),
        "/api/v1/admin/projects/proj_quota/limit",
        json!({ "new_limit": 0 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/admin/projects/proj_quota/limit",
        json!({ "new_limit": 2000 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["monthly_token_limit"], 2000);

    let response = post_auth(app, "/api/v1/admin/projects/proj_quota/usage/reset", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(reload(&pool, "proj_quota").await.total_tokens_used, 0);

    let notices = NotificationRepo::list_for_project(&pool, project.id, 30)
        .await
        .unwrap();
    assert!(notices.iter().any(|n| n.kind == "limit_update"));
    assert!(notices
        .iter()
        .any(|n| n.kind == "usage_reset" && n.message.contains("700")));
}

// ---------------------------------------------------------------------------
// Usage report
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn usage_report(pool: PgPool) {
    seed_project(&pool, "proj_usage", 2, 1000, 950).await;
    let app = build_test_app(pool);

    let response = get_auth(
        app,
        "/api/v1/admin/projects/proj_usage/usage",
        &admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let data = body_json(response).await["data"].clone();
    assert_eq!(data["project_id"], "proj_usage");
    assert_eq!(data["status"], "active");
    assert_eq!(data["usage_percent"], 95.0);
    assert_eq!(data["remaining_tokens"], 50);
    assert_eq!(data["reminder_due"], true);
    assert!(data["estimated_cost_usd"].as_f64().unwrap() > 0.0);

    let warnings: Vec<&str> = data["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w.as_str().unwrap())
        .collect();
    assert!(warnings.contains(&"Approaching monthly token limit (90%+)"));
    assert!(warnings.contains(&"Subscription expires soon (3 days or less)"));
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_notification_and_history(pool: PgPool) {
    seed_project(&pool, "proj_notify", 30, 1000, 0).await;
    let app = build_test_app(pool);
    let token = admin_token();

    let response = post_auth(
        app.clone(),
        "/api/v1/admin/projects/proj_notify/notifications/test",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["type"], "test");

    let response = get_auth(
        app.clone(),
        "/api/v1/admin/projects/proj_notify/notifications",
        &token,
    )
    .await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);

    let response = get_auth(
        app.clone(),
        "/api/v1/admin/notifications?type=test&project_id=proj_notify",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data.as_array().unwrap().len(), 1);
    assert_eq!(data[0]["project_external_id"], "proj_notify");

    let response = get_auth(app, "/api/v1/admin/notifications?type=bogus", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Stats and maintenance
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn subscription_stats(pool: PgPool) {
    seed_project(&pool, "proj_s1", 3, 1000, 900).await;
    seed_project(&pool, "proj_s2", 60, 1000, 100).await;
    let app = build_test_app(pool);

    let response = get_auth(app, "/api/v1/admin/subscriptions/stats", &admin_token()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let data = body_json(response).await["data"].clone();
    assert_eq!(data["expiring_within_7_days"], 1);
    assert_eq!(data["high_usage_projects"], 1);

    let active = data["by_status"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["status"] == "active")
        .unwrap()
        .clone();
    assert_eq!(active["project_count"], 2);
    assert_eq!(active["total_tokens_used"], 1000);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn manual_sweep_expires_lapsed_projects(pool: PgPool) {
    let lapsed = seed_project(&pool, "proj_sweep_old", -1, 1000, 0).await;
    seed_project(&pool, "proj_sweep_soon", 2, 1000, 0).await;
    let app = build_test_app(pool.clone());
    let token = admin_token();

    let response = post_auth(app.clone(), "/api/v1/admin/maintenance/sweep", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["expired"], 1);
    assert_eq!(data["reminders"], 1);

    assert_eq!(
        reload(&pool, "proj_sweep_old").await.status(),
        ProjectStatus::Expired
    );
    assert_eq!(
        NotificationRepo::count_by_kind(&pool, lapsed.id, "expired")
            .await
            .unwrap(),
        1
    );

    // Second run finds nothing.
    let response = post_auth(app, "/api/v1/admin/maintenance/sweep", &token).await;
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["expired"], 0);
    assert_eq!(data["reminders"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn project_detail_reports_usage_and_chat_activity(pool: PgPool) {
    seed_project(&pool, "proj_detail", 20, 1000, 0).await;
    let app = build_test_app(pool);

    for question in ["Hours?", "Prices?"] {
        let response = post_json(
            app.clone(),
            "/api/v1/projects/proj_detail/chat",
            json!({ "message": question, "session_id": "s-detail" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = get_auth(app, "/api/v1/admin/projects/proj_detail", &admin_token()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();

    assert_eq!(data["external_id"], "proj_detail");
    assert_eq!(data["effective_status"], "active");
    assert_eq!(data["usage"]["total_tokens_used"], 200);
    assert_eq!(data["usage"]["usage_percent"], 20.0);
    assert_eq!(data["activity"]["total_messages"], 2);
    assert_eq!(data["activity"]["messages_today"], 2);
    assert_eq!(data["activity"]["messages_last_7_days"], 2);
    assert_eq!(data["activity"]["tokens_today"], 200);

    let recent = data["recent_chats"].as_array().unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0]["message"], "Prices?");
    assert_eq!(recent[1]["message"], "Hours?");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stats_include_todays_traffic(pool: PgPool) {
    seed_project(&pool, "proj_traffic", 20, 10_000, 0).await;
    let app = build_test_app(pool);
    let token = admin_token();

    let response = get_auth(app.clone(), "/api/v1/admin/subscriptions/stats", &token).await;
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["api_calls_today"], 0);
    assert_eq!(data["tokens_used_today"], 0);

    for _ in 0..3 {
        let response = post_json(
            app.clone(),
            "/api/v1/projects/proj_traffic/chat",
            json!({ "message": "Hello" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = get_auth(app, "/api/v1/admin/subscriptions/stats", &token).await;
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["api_calls_today"], 3);
    assert_eq!(data["tokens_used_today"], 300);
}

// ---------------------------------------------------------------------------
// Store timeouts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn lifecycle_calls_are_bounded_by_the_store_timeout(pool: PgPool) {
    seed_project(&pool, "proj_slow_store", 10, 1000, 0).await;
    let mut config = test_config();
    config.metering.store_timeout = std::time::Duration::ZERO;
    let app = build_test_app_with_config(pool.clone(), config, ScriptedLlm::answering(100));

    let response = post_json_auth(
        app,
        "/api/v1/admin/projects/proj_slow_store/renew",
        json!({ "months": 1 }),
        &admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "STORE_UNAVAILABLE");

    let project = reload(&pool, "proj_slow_store").await;
    assert!(project.expiry_date < Utc::now() + Duration::days(11));
}
