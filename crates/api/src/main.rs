use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parley_api::background::expiry_sweep;
use parley_api::config::ServerConfig;
use parley_api::router::build_app_router;
use parley_api::state::AppState;
use parley_events::{EventBus, NotificationLogger, WebhookDelivery};
use parley_llm::OpenAiClient;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = parley_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    parley_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    parley_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- LLM client ---
    let llm = OpenAiClient::new(config.llm.to_openai()).expect("Failed to build LLM client");
    tracing::info!(
        base_url = %config.llm.base_url,
        default_model = %config.llm.default_model,
        "LLM client configured"
    );

    // --- Notifications ---
    let mut notifier = NotificationLogger::new(pool.clone(), config.metering.notify_timeout);
    if let Some(url) = &config.notification_webhook_url {
        let webhook = WebhookDelivery::new(url.as_str()).expect("Failed to build webhook client");
        tracing::info!(url = %webhook.url(), "Notification webhook enabled");
        notifier = notifier.with_webhook(webhook);
    }

    let event_bus = Arc::new(EventBus::default());
    let logger_handle = tokio::spawn(notifier.clone().run(event_bus.subscribe()));
    tracing::info!("Notification logger started");

    // --- Maintenance sweep ---
    let sweep_cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(expiry_sweep::run(
        pool.clone(),
        notifier.clone(),
        config.metering.sweep_interval,
        sweep_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
        notifier,
        llm: Arc::new(llm),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweep_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweep_handle).await;
    tracing::info!("Expiry sweep stopped");

    // Dropping the last sender closes the channel and lets the logger drain.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), logger_handle).await;
    tracing::info!("Notification logger shut down");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
