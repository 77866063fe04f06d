//! Access resolution and ingestion
//!
//! Both flows end the same way: make sure the resource has a short link,
//! generating and caching it if needed, or fall back to the raw deep link
//! when the shortener is unavailable.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::admin::AdminRoster;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::model::{FileRef, Origin, Resource};
use crate::resources::ResourceStore;
use crate::settings::SettingsStore;
use crate::shortener::{ShortenOutcome, Shortener};
use crate::token;
use crate::users::UserStore;

/// Links accepted for storage
static TELEGRAM_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://t\.me/\S+").expect("valid link pattern"));

/// Where the link handed back to the user came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkSource {
    /// Short URL already stored on the resource
    Cached,
    /// Freshly produced by the shortener and now cached
    Generated,
    /// Shortener unavailable, raw deep link returned
    Fallback,
}

/// Outcome of a deep-link click
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub resource: Resource,

    /// Link to hand to the user
    pub link: String,
    pub source: LinkSource,

    /// Whether the requester currently holds premium
    pub premium: bool,

    pub tutorial_url: String,
}

/// Outcome of storing a link or file
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub token: String,

    /// `false` when identical content had been stored before
    pub created: bool,

    pub deep_link: String,
    pub link: String,
    pub source: LinkSource,
}

pub struct Pipeline {
    resources: ResourceStore,
    users: UserStore,
    settings: SettingsStore,
    roster: AdminRoster,
    shortener: Arc<dyn Shortener>,
    config: Arc<Config>,
}

impl Pipeline {
    pub fn new(
        resources: ResourceStore,
        users: UserStore,
        settings: SettingsStore,
        roster: AdminRoster,
        shortener: Arc<dyn Shortener>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            resources,
            users,
            settings,
            roster,
            shortener,
            config,
        }
    }

    /// Bot deep link for `token`; this is what gets shortened
    pub fn deep_link(&self, token: &str) -> String {
        format!("{}?start={}", self.config.bot_link(), token)
    }

    /// Resolves a deep-link token for `requester`.
    ///
    /// Any holder of a valid token may resolve it. Counter and cache writes
    /// are best effort and never block the answer.
    pub async fn resolve(&self, token: &str, requester: i64) -> Result<Resolution> {
        if !token::is_well_formed(token) {
            return Err(AppError::NotFound(token.to_string()));
        }
        let mut resource = self
            .resources
            .get(token)?
            .ok_or_else(|| AppError::NotFound(token.to_string()))?;

        let premium = self.users.check_premium(requester).unwrap_or_else(|e| {
            warn!(requester, error = %e, "premium check failed, treating as free user");
            false
        });

        match self.resources.increment_access(token) {
            Ok(Some(count)) => resource.access_count = count,
            Ok(None) => warn!(%token, "resource vanished before access was counted"),
            Err(e) => warn!(%token, error = %e, "failed to count access"),
        }

        let (link, source) = self.ensure_short_link(&mut resource).await;
        let tutorial_url = self
            .settings
            .tutorial_url(&self.config)
            .unwrap_or_else(|e| {
                warn!(error = %e, "tutorial setting unreadable, using default");
                self.config.tutorial_url.clone()
            });

        info!(%token, requester, ?source, premium, "resolved deep link");
        Ok(Resolution {
            resource,
            link,
            source,
            premium,
            tutorial_url,
        })
    }

    /// Stores the first Telegram link found in `text`
    pub async fn submit_link(&self, submitter: i64, text: &str) -> Result<Submission> {
        self.authorize(submitter)?;
        let url = extract_link(text)
            .ok_or_else(|| AppError::InvalidInput("no Telegram link found".to_string()))?;
        self.submit(submitter, Origin::link(url)).await
    }

    pub async fn submit_file(&self, submitter: i64, file: FileRef) -> Result<Submission> {
        self.authorize(submitter)?;
        if file.unique_id.trim().is_empty() {
            return Err(AppError::InvalidInput("file unique id is empty".to_string()));
        }
        self.submit(submitter, Origin::File(file)).await
    }

    fn authorize(&self, submitter: i64) -> Result<()> {
        if self.roster.is_privileged(submitter)? {
            Ok(())
        } else {
            warn!(submitter, "rejected submission from non-admin");
            Err(AppError::Unauthorized(
                "only admins can store links and files".to_string(),
            ))
        }
    }

    async fn submit(&self, submitter: i64, origin: Origin) -> Result<Submission> {
        let outcome = self.resources.store(origin, submitter)?;
        let mut resource = outcome.resource;

        if outcome.created {
            if let Err(e) = self.users.increment_user_resources(submitter) {
                warn!(submitter, error = %e, "failed to bump submission counter");
            }
        }

        let (link, source) = self.ensure_short_link(&mut resource).await;
        Ok(Submission {
            deep_link: self.deep_link(&resource.token),
            token: resource.token,
            created: outcome.created,
            link,
            source,
        })
    }

    /// Cached short URL, or a new one from the gateway, or the raw deep link
    async fn ensure_short_link(&self, resource: &mut Resource) -> (String, LinkSource) {
        if let Some(short_url) = &resource.short_url {
            debug!(token = %resource.token, "short link cache hit");
            return (short_url.clone(), LinkSource::Cached);
        }

        let destination = self.deep_link(&resource.token);
        match self.shortener.shorten(&destination, &resource.token).await {
            ShortenOutcome::Shortened(short_url) => {
                if let Err(e) = self.resources.save_short_url(&resource.token, &short_url) {
                    warn!(token = %resource.token, error = %e, "failed to cache short link");
                }
                resource.short_url = Some(short_url.clone());
                (short_url, LinkSource::Generated)
            }
            ShortenOutcome::Unavailable(reason) => {
                warn!(token = %resource.token, %reason, "falling back to raw deep link");
                (destination, LinkSource::Fallback)
            }
        }
    }
}

pub fn extract_link(text: &str) -> Option<&str> {
    TELEGRAM_LINK.find(text).map(|m| m.as_str())
}
