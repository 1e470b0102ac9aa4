use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{error_handling::HandleErrorLayer, http::StatusCode};
use tower::{BoxError, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, Level};

use meeting_lifecycle_service::services::lifecycle::MeetingLifecycleService;
use meeting_lifecycle_service::services::occurrences::OccurrenceStore;
use meeting_lifecycle_service::services::reconciler::WebhookReconciler;
use meeting_lifecycle_service::services::store::LifecycleStore;
use meeting_lifecycle_service::{create_router, AppState, ProviderHttpClient};

// Error handler
async fn handle_error(error: BoxError) -> (StatusCode, String) {
    if error.is::<tokio::time::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            "Request took too long".to_string(),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unhandled internal error: {}", error),
        )
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    // Initialize the conferencing provider client
    let provider = Arc::new(ProviderHttpClient::new());

    // Webhook deliveries are rejected without a shared secret
    let webhook_secret = env::var("WEBHOOK_SECRET_TOKEN")
        .expect("WEBHOOK_SECRET_TOKEN must be set in environment");

    // How far ahead unbounded recurring series are resolved
    let horizon_days = env::var("RESOLUTION_HORIZON_DAYS")
        .ok()
        .and_then(|val| val.parse::<i64>().ok())
        .unwrap_or(90);
    info!("Resolving occurrences {} days ahead", horizon_days);

    // Check if running in production mode
    let is_production = env::var("ENVIRONMENT")
        .map(|val| val.to_lowercase() == "production")
        .unwrap_or(false);

    if is_production {
        info!("Running in PRODUCTION mode - restricting available endpoints");
    } else {
        info!("Running in DEVELOPMENT mode - all endpoints will be available");
    }

    // Assemble the engine around one shared state store
    let store = Arc::new(LifecycleStore::new());
    let occurrences = Arc::new(OccurrenceStore::new());
    let lifecycle = Arc::new(MeetingLifecycleService::new(
        Arc::clone(&store),
        Arc::clone(&occurrences),
        provider,
        horizon_days,
    ));
    let reconciler = Arc::new(WebhookReconciler::new(Arc::clone(&store)));

    // Create shared application state
    let app_state = Arc::new(AppState {
        lifecycle,
        reconciler,
        webhook_secret,
    });

    // Create router with appropriate routes based on environment
    let app = create_router(app_state, is_production).layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_error))
            .load_shed()
            .concurrency_limit(64)
            .timeout(Duration::from_secs(10))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::new().allow_origin(Any)),
    );

    // Bind to port 3000
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Server listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    // Set up signal handler for graceful shutdown
    let shutdown = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
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
            _ = ctrl_c => {
                info!("Received interrupt signal, starting graceful shutdown");
            },
            _ = terminate => {
                info!("Received terminate signal, starting graceful shutdown");
            },
        }
    };

    // Start server with graceful shutdown
    info!("Server is ready to accept connections");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .expect("Failed to start server");

    info!("Server has been gracefully shut down");
}
