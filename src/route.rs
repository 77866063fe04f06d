//! Route definitions for the event API
//!
//! This module configures all HTTP routes and maps them to their respective handlers.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::database::AppState;
use crate::handler::{
    add_admin, admin_recent, admin_stats, bot_info, grant_premium, health, list_admins,
    premium_status, record_contact, refresh_short_links, remove_admin, revoke_premium,
    set_shortener, set_tutorial, shortener_status, start, submit_file, submit_link,
};

use crate::middleware::{auth_middleware, event_limit};
use axum::middleware;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `GET /`, `GET /health` - Liveness probe (public)
/// - `POST /api/users` - Records first contact
/// - `GET /api/users/{id}/premium` - Premium check
/// - `GET /api/start/{token}` - Deep-link resolution
/// - `POST /api/links`, `POST /api/files` - Submissions (admins only)
/// - `GET /api/info` - Tutorial, channel and support links
/// - `/api/admin/*` - Admin dashboard commands
///
/// Everything under `/api` shares the authorization check and the event limit.
///
/// ```no_run
/// # use linkstash::config::Config;
/// # use linkstash::database::{init_db, AppState};
/// # use linkstash::route::create_app;
/// # let db = init_db("data.db").unwrap();
/// let state = AppState::with_http_shortener(db, Config::from_env()).unwrap();
/// let app = create_app(state);
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    // Dashboard commands; each handler checks the caller against the roster
    let admin_routes = Router::new()
        .route("/stats", get(admin_stats))
        .route("/resources", get(admin_recent))
        .route("/admins", get(list_admins).post(add_admin))
        .route("/admins/{id}", delete(remove_admin))
        .route("/premium", post(grant_premium))
        .route("/premium/{id}", delete(revoke_premium))
        .route("/shortener", get(shortener_status).put(set_shortener))
        .route("/tutorial", put(set_tutorial))
        .route("/refresh", post(refresh_short_links));

    // Event API called by the chat transport
    let api_routes = Router::new()
        .route("/users", post(record_contact))
        .route("/users/{id}/premium", get(premium_status))
        .route("/start/{token}", get(start))
        .route("/links", post(submit_link))
        .route("/files", post(submit_file))
        .route("/info", get(bot_info))
        .nest("/admin", admin_routes)
        // Applied bottom-up: the auth check runs before a permit is taken
        .layer(middleware::from_fn_with_state(state.clone(), event_limit))
        .layer(middleware::from_fn(auth_middleware));

    Router::new()
        // Liveness probe for the deployment platform
        .route("/", get(health))
        .route("/health", get(health))
        // Mount API routes under /api
        .nest("/api", api_routes)
        // Inject the application state into all handlers
        .with_state(state)
}
