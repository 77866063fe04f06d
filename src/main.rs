//! Application entry point and server initialization
//!
//! This module contains the main function that:
//! - Loads environment configuration
//! - Initializes the database and seeds the owner as admin
//! - Starts the HTTP server with graceful shutdown support

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use linkstash::config::Config;
use linkstash::database::{init_db, AppState};
use linkstash::route::create_app;

/// Application entry point
///
/// 1. Loads environment variables from `.env` and sets up logging
/// 2. Reads [`Config`] from the environment
/// 3. Initializes the embedded database and seeds the owner as admin
/// 4. Starts the HTTP server with graceful shutdown handling
///
/// # Environment Variables
///
/// - `PORT` - Server port number (default: 8080)
/// - `DATABASE_URL` - Path to database file (default: "data.db")
/// - `OWNER_ID`, `BOT_USERNAME`, `SHORTENER_API`, `SHORTENER_URL`, ... - see [`Config`]
/// - `RUST_LOG` - Log filter (default: "linkstash=debug,tower_http=debug")
#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("linkstash=debug,tower_http=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    let port = config.port;
    let db_name = config.database_path.clone();

    // Initialize the embedded database with the specified path
    let db = init_db(&db_name).expect("Failed to initialize database");
    let state =
        AppState::with_http_shortener(db, config).expect("Failed to build application state");

    // The owner must be listed even before any admin command runs
    state
        .roster()
        .seed_owner()
        .expect("Failed to register owner as admin");

    let app = create_app(state.clone()).layer(TraceLayer::new_for_http());

    // Bind to all network interfaces on the specified port
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind listener");

    info!(
        port,
        database = %db_name,
        bot = %state.config.bot_link(),
        owner_id = state.config.owner_id,
        max_concurrent_events = state.config.max_concurrent_events,
        "server running"
    );

    // Runs until SIGTERM or SIGINT
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM
///
/// Open connections are allowed to complete so no write transaction is cut
/// off halfway.
async fn shutdown_signal() {
    // Handle Ctrl+C (SIGINT)
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    // Handle SIGTERM on Unix systems
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
