use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::env;

use crate::database::AppState;

/// Middleware to check for Authorization header
///
/// Only the transport adapter is supposed to call the event API. When the
/// `AUTHORIZATION` environment variable is set, requests must carry the same
/// value in their `Authorization` header. If it is unset or empty, the check
/// is skipped.
pub async fn auth_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    if let Ok(auth_secret) = env::var("AUTHORIZATION") {
        if !auth_secret.is_empty() {
            let provided = headers
                .get("Authorization")
                .and_then(|value| value.to_str().ok());

            if provided != Some(auth_secret.as_str()) {
                return Err((
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": "Unauthorized",
                        "message": "Invalid or missing authorization header"
                    })),
                )
                    .into_response());
            }
        }
    }

    Ok(next.run(request).await)
}

/// Caps how many events are processed at once
///
/// Requests beyond the limit wait for a permit instead of being rejected.
pub async fn event_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let _permit = match state.events.acquire().await {
        Ok(permit) => permit,
        Err(_) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Shutting down",
                    "code": "unavailable"
                })),
            )
                .into_response()
        }
    };

    next.run(request).await
}
