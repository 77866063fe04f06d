//! Shortener gateway
//!
//! Exchanges a destination URL for a short one through the external
//! shortener API. Failures are reported as [`ShortenOutcome::Unavailable`],
//! never as errors, so callers always have a fallback path. No caching
//! happens here; callers check and persist `Resource::short_url` themselves.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::settings::SettingsStore;

/// Longest alias the upstream accepts
pub const MAX_ALIAS_LENGTH: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortenOutcome {
    Shortened(String),
    Unavailable(UnavailableReason),
}

/// Why no short URL could be produced
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    #[error("credentials could not be read: {0}")]
    Settings(String),
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream answered with status {0}")]
    Status(u16),
    #[error("upstream rejected the request (status {0:?})")]
    Rejected(Option<String>),
    #[error("unrecognized response body")]
    UnrecognizedBody,
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Shortens `destination`, asking the upstream to use `alias` as the code
    async fn shorten(&self, destination: &str, alias: &str) -> ShortenOutcome;
}

/// JSON reply shape: `{"status": "success", "shortenedUrl": "https://..."}`
#[derive(Deserialize)]
struct ShortenerReply {
    status: Option<String>,
    #[serde(rename = "shortenedUrl")]
    shortened_url: Option<String>,
}

/// Shortener backed by the HTTP API configured in settings
pub struct HttpShortener {
    client: Client,
    settings: SettingsStore,
    config: Arc<Config>,
}

impl HttpShortener {
    pub fn new(settings: SettingsStore, config: Arc<Config>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.shortener_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            settings,
            config,
        })
    }
}

#[async_trait]
impl Shortener for HttpShortener {
    async fn shorten(&self, destination: &str, alias: &str) -> ShortenOutcome {
        // Read on every call so admin updates apply immediately
        let credentials = match self.settings.resolve_shortener(&self.config) {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "could not read shortener settings");
                return ShortenOutcome::Unavailable(UnavailableReason::Settings(e.to_string()));
            }
        };
        let alias = truncate_alias(alias, MAX_ALIAS_LENGTH);

        let response = self
            .client
            .get(&credentials.endpoint)
            .query(&[
                ("api", credentials.api_key.as_str()),
                ("url", destination),
                ("alias", alias.as_str()),
                ("format", "text"),
            ])
            .send()
            .await;

        let outcome = match response {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => match parse_response(&body) {
                    Ok(url) => ShortenOutcome::Shortened(url),
                    Err(reason) => ShortenOutcome::Unavailable(reason),
                },
                Err(e) => ShortenOutcome::Unavailable(transport_reason(&e)),
            },
            Ok(response) => {
                ShortenOutcome::Unavailable(UnavailableReason::Status(response.status().as_u16()))
            }
            Err(e) => ShortenOutcome::Unavailable(transport_reason(&e)),
        };

        match &outcome {
            ShortenOutcome::Shortened(url) => debug!(%alias, short_url = %url, "shortened"),
            ShortenOutcome::Unavailable(reason) => {
                warn!(%alias, endpoint = %credentials.endpoint, %reason, "shortener unavailable")
            }
        }
        outcome
    }
}

fn transport_reason(err: &reqwest::Error) -> UnavailableReason {
    if err.is_timeout() {
        UnavailableReason::Timeout
    } else {
        UnavailableReason::Transport(err.to_string())
    }
}

/// Accepts either the JSON reply or a bare URL body
pub fn parse_response(body: &str) -> std::result::Result<String, UnavailableReason> {
    let body = body.trim();

    if let Ok(reply) = serde_json::from_str::<ShortenerReply>(body) {
        return match (reply.status.as_deref(), reply.shortened_url) {
            (Some("success"), Some(url)) if !url.trim().is_empty() => Ok(url.trim().to_string()),
            (status, _) => Err(UnavailableReason::Rejected(status.map(str::to_string))),
        };
    }

    if body.starts_with("http") {
        Ok(body.to_string())
    } else {
        Err(UnavailableReason::UnrecognizedBody)
    }
}

/// Truncates on character boundaries
pub fn truncate_alias(alias: &str, max: usize) -> String {
    alias.chars().take(max).collect()
}
