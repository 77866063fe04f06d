//! HTTP request handlers for the event API
//!
//! The chat transport turns every inbound message or callback into one of
//! these calls:
//! - first contact and deep-link clicks (`/start <token>`)
//! - link and file submissions from admins
//! - admin dashboard commands

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::database::AppState;
use crate::error::Result;
use crate::model::{
    AdminTargetRequest, CallerParams, ContactRequest, GrantPremiumRequest, RecentParams,
    ShortenerRequest, StartParams, SubmitFileRequest, SubmitLinkRequest, TutorialRequest,
};
use crate::resolver::Submission;

/// Liveness probe for the deployment platform (`/` and `/health`)
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Records a user on first contact
///
/// # Request Body
///
/// ```json
/// { "user_id": 42, "username": "alice", "first_name": "Alice" }
/// ```
pub async fn record_contact(
    State(state): State<AppState>,
    Json(payload): Json<ContactRequest>,
) -> Result<impl IntoResponse> {
    let user = state
        .users()
        .add_user(payload.user_id, payload.username, payload.first_name)?;
    Ok(Json(user))
}

/// Resolves a deep-link token
///
/// `GET /api/start/{token}?user_id=42`
///
/// # Response
///
/// - **200 OK** - Resolution with the link to hand out
/// - **404 Not Found** - Invalid or expired link
pub async fn start(
    Path(token): Path<String>,
    State(state): State<AppState>,
    Query(params): Query<StartParams>,
) -> Result<impl IntoResponse> {
    // Registering the visitor is secondary to delivering the resource
    if let Err(e) = state
        .users()
        .add_user(params.user_id, params.username, params.first_name)
    {
        warn!(user_id = params.user_id, error = %e, "failed to record visitor");
    }

    let resolution = state.pipeline().resolve(&token, params.user_id).await?;
    Ok(Json(resolution))
}

/// Stores a link from an admin's message
///
/// # Response
///
/// - **201 Created** - New resource stored
/// - **200 OK** - Identical link was stored before, existing token returned
/// - **403 Forbidden** - Submitter is not an admin
/// - **400 Bad Request** - No Telegram link in the text
pub async fn submit_link(
    State(state): State<AppState>,
    Json(payload): Json<SubmitLinkRequest>,
) -> Result<impl IntoResponse> {
    let submission = state
        .pipeline()
        .submit_link(payload.user_id, &payload.text)
        .await?;
    Ok(submission_response(submission))
}

/// Stores a document, video, audio or photo reference from an admin
pub async fn submit_file(
    State(state): State<AppState>,
    Json(payload): Json<SubmitFileRequest>,
) -> Result<impl IntoResponse> {
    let submission = state
        .pipeline()
        .submit_file(payload.user_id, payload.file)
        .await?;
    Ok(submission_response(submission))
}

fn submission_response(submission: Submission) -> impl IntoResponse {
    let status = if submission.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(submission))
}

pub async fn premium_status(
    Path(user_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let premium = state.users().check_premium(user_id)?;
    Ok(Json(json!({ "user_id": user_id, "premium": premium })))
}

/// Public bot information shown on the start screen
pub async fn bot_info(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let tutorial_url = state.admin().tutorial()?;
    Ok(Json(json!({
        "bot_link": state.config.bot_link(),
        "tutorial_url": tutorial_url,
        "channel_url": state.config.channel_url,
        "support_contact": state.config.support_contact,
    })))
}

pub async fn admin_stats(
    State(state): State<AppState>,
    Query(params): Query<CallerParams>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.admin().stats(params.caller)?))
}

/// Latest stored resources, newest first (`?caller=1&limit=10`)
pub async fn admin_recent(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> Result<impl IntoResponse> {
    let resources = state
        .admin()
        .recent_resources(params.caller, params.limit)?;
    Ok(Json(json!({
        "total_fetched": resources.len(),
        "data": resources
    })))
}

pub async fn list_admins(
    State(state): State<AppState>,
    Query(params): Query<CallerParams>,
) -> Result<impl IntoResponse> {
    let admins = state.admin().list_admins(params.caller)?;
    Ok(Json(json!({ "admins": admins })))
}

pub async fn add_admin(
    State(state): State<AppState>,
    Json(payload): Json<AdminTargetRequest>,
) -> Result<impl IntoResponse> {
    let added = state.admin().add_admin(payload.caller, payload.user_id)?;
    Ok(Json(json!({ "user_id": payload.user_id, "added": added })))
}

pub async fn remove_admin(
    Path(user_id): Path<i64>,
    State(state): State<AppState>,
    Query(params): Query<CallerParams>,
) -> Result<impl IntoResponse> {
    let removed = state.admin().remove_admin(params.caller, user_id)?;
    Ok(Json(json!({ "user_id": user_id, "removed": removed })))
}

pub async fn grant_premium(
    State(state): State<AppState>,
    Json(payload): Json<GrantPremiumRequest>,
) -> Result<impl IntoResponse> {
    let user = state
        .admin()
        .grant_premium(payload.caller, payload.user_id, payload.days)?;
    Ok(Json(user))
}

pub async fn revoke_premium(
    Path(user_id): Path<i64>,
    State(state): State<AppState>,
    Query(params): Query<CallerParams>,
) -> Result<impl IntoResponse> {
    let revoked = state.admin().revoke_premium(params.caller, user_id)?;
    Ok(Json(json!({ "user_id": user_id, "revoked": revoked })))
}

/// Sets shortener credentials from `key|url` input
pub async fn set_shortener(
    State(state): State<AppState>,
    Json(payload): Json<ShortenerRequest>,
) -> Result<impl IntoResponse> {
    state.admin().set_shortener(payload.caller, &payload.input)?;
    Ok(Json(json!({ "message": "Shortener settings updated" })))
}

pub async fn shortener_status(
    State(state): State<AppState>,
    Query(params): Query<CallerParams>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.admin().shortener_status(params.caller)?))
}

pub async fn set_tutorial(
    State(state): State<AppState>,
    Json(payload): Json<TutorialRequest>,
) -> Result<impl IntoResponse> {
    state.admin().set_tutorial(payload.caller, &payload.url)?;
    Ok(Json(json!({ "message": "Tutorial link updated" })))
}

/// Clears every cached short link
pub async fn refresh_short_links(
    State(state): State<AppState>,
    Json(payload): Json<CallerParams>,
) -> Result<impl IntoResponse> {
    let cleared = state.admin().refresh_short_links(payload.caller)?;
    Ok(Json(json!({ "cleared": cleared })))
}
