//! Admin roster and the admin/settings plane
//!
//! The plane keeps no state of its own. Every mutating operation checks the
//! caller against the roster before anything is written.

use std::sync::Arc;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable};
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use crate::config::Config;
use crate::database::TABLE_ADMINS;
use crate::error::{AppError, Result};
use crate::model::{Resource, User};
use crate::resources::ResourceStore;
use crate::settings::{keys, SettingsStore};
use crate::users::UserStore;

const DEFAULT_RECENT_LIMIT: usize = 10;
const MAX_RECENT_LIMIT: usize = 100;

/// Persisted set of admins plus the implicit owner
#[derive(Clone)]
pub struct AdminRoster {
    db: Arc<Database>,
    owner_id: i64,
}

impl AdminRoster {
    pub fn new(db: Arc<Database>, owner_id: i64) -> Self {
        Self { db, owner_id }
    }

    /// Owner or roster member
    pub fn is_privileged(&self, user_id: i64) -> Result<bool> {
        if user_id == self.owner_id {
            return Ok(true);
        }
        let read_txn = self.db.begin_read()?;
        let admins = read_txn.open_table(TABLE_ADMINS)?;
        let present = admins.get(user_id)?.is_some();
        Ok(present)
    }

    /// Returns `false` if the user was already an admin
    pub fn add(&self, user_id: i64) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let added = {
            let mut admins = write_txn.open_table(TABLE_ADMINS)?;
            let exists = admins.get(user_id)?.is_some();
            if !exists {
                admins.insert(user_id, Utc::now().timestamp())?;
            }
            !exists
        };
        write_txn.commit()?;
        Ok(added)
    }

    /// The owner can never be removed
    pub fn remove(&self, user_id: i64) -> Result<bool> {
        if user_id == self.owner_id {
            return Err(AppError::InvalidInput(
                "the owner cannot be removed from the admin roster".to_string(),
            ));
        }
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut admins = write_txn.open_table(TABLE_ADMINS)?;
            let previous = admins.remove(user_id)?;
            previous.is_some()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Roster ids in ascending order, always including the owner
    pub fn list(&self) -> Result<Vec<i64>> {
        let read_txn = self.db.begin_read()?;
        let admins = read_txn.open_table(TABLE_ADMINS)?;

        let mut ids = Vec::new();
        for entry in admins.iter()? {
            let (user_id, _) = entry?;
            ids.push(user_id.value());
        }
        if !ids.contains(&self.owner_id) {
            ids.push(self.owner_id);
            ids.sort_unstable();
        }
        Ok(ids)
    }

    /// Makes the owner an explicit roster entry, run once at start-up
    pub fn seed_owner(&self) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut admins = write_txn.open_table(TABLE_ADMINS)?;
            let exists = admins.get(self.owner_id)?.is_some();
            if !exists {
                admins.insert(self.owner_id, Utc::now().timestamp())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}

/// Aggregate counters shown on the admin dashboard
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Stats {
    pub users: u64,
    pub premium_users: u64,
    pub resources: u64,
    pub admins: u64,
}

/// Which shortener settings are overridden at runtime. The key itself is never echoed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShortenerStatus {
    pub api_key_set: bool,
    pub endpoint_set: bool,

    /// Endpoint in effect, override or default
    pub endpoint: String,
}

pub struct AdminPlane {
    roster: AdminRoster,
    resources: ResourceStore,
    users: UserStore,
    settings: SettingsStore,
    config: Arc<Config>,
}

impl AdminPlane {
    pub fn new(
        roster: AdminRoster,
        resources: ResourceStore,
        users: UserStore,
        settings: SettingsStore,
        config: Arc<Config>,
    ) -> Self {
        Self {
            roster,
            resources,
            users,
            settings,
            config,
        }
    }

    fn authorize(&self, caller: i64) -> Result<()> {
        if self.roster.is_privileged(caller)? {
            Ok(())
        } else {
            warn!(caller, "rejected admin operation");
            Err(AppError::Unauthorized("admin only command".to_string()))
        }
    }

    pub fn add_admin(&self, caller: i64, user_id: i64) -> Result<bool> {
        self.authorize(caller)?;
        let added = self.roster.add(user_id)?;
        info!(caller, user_id, added, "admin added");
        Ok(added)
    }

    pub fn remove_admin(&self, caller: i64, user_id: i64) -> Result<bool> {
        self.authorize(caller)?;
        let removed = self.roster.remove(user_id)?;
        info!(caller, user_id, removed, "admin removed");
        Ok(removed)
    }

    pub fn list_admins(&self, caller: i64) -> Result<Vec<i64>> {
        self.authorize(caller)?;
        self.roster.list()
    }

    pub fn grant_premium(&self, caller: i64, user_id: i64, days: u32) -> Result<User> {
        self.authorize(caller)?;
        self.users.grant_premium(user_id, days)
    }

    pub fn revoke_premium(&self, caller: i64, user_id: i64) -> Result<bool> {
        self.authorize(caller)?;
        self.users.revoke_premium(user_id)
    }

    /// Stores shortener credentials given as `key|url`
    pub fn set_shortener(&self, caller: i64, input: &str) -> Result<()> {
        self.authorize(caller)?;
        let (api_key, endpoint) = parse_shortener_input(input)?;
        self.settings.set_many(&[
            (keys::SHORTENER_API, api_key.as_str()),
            (keys::SHORTENER_URL, endpoint.as_str()),
        ])?;
        info!(caller, endpoint = %endpoint, "shortener settings updated");
        Ok(())
    }

    pub fn shortener_status(&self, caller: i64) -> Result<ShortenerStatus> {
        self.authorize(caller)?;
        let credentials = self.settings.resolve_shortener(&self.config)?;
        Ok(ShortenerStatus {
            api_key_set: is_set(self.settings.get(keys::SHORTENER_API)?),
            endpoint_set: is_set(self.settings.get(keys::SHORTENER_URL)?),
            endpoint: credentials.endpoint,
        })
    }

    pub fn set_tutorial(&self, caller: i64, url: &str) -> Result<()> {
        self.authorize(caller)?;
        let url = validate_http_url(url)?;
        self.settings.set(keys::TUTORIAL, &url)
    }

    /// Readable by everyone
    pub fn tutorial(&self) -> Result<String> {
        self.settings.tutorial_url(&self.config)
    }

    /// Forces every short link to be regenerated on next access
    pub fn refresh_short_links(&self, caller: i64) -> Result<usize> {
        self.authorize(caller)?;
        self.resources.clear_all_short_urls()
    }

    pub fn stats(&self, caller: i64) -> Result<Stats> {
        self.authorize(caller)?;
        Ok(Stats {
            users: self.users.count()?,
            premium_users: self.users.premium_count()?,
            resources: self.resources.count()?,
            admins: self.roster.list()?.len() as u64,
        })
    }

    pub fn recent_resources(&self, caller: i64, limit: Option<usize>) -> Result<Vec<Resource>> {
        self.authorize(caller)?;
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT).clamp(1, MAX_RECENT_LIMIT);
        self.resources.recent(limit)
    }
}

fn is_set(value: Option<String>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Splits `key|url` on the first `|`
pub fn parse_shortener_input(input: &str) -> Result<(String, String)> {
    let (key, url) = input.split_once('|').ok_or_else(|| {
        AppError::InvalidInput("expected shortener settings as key|url".to_string())
    })?;

    let key = key.trim();
    if key.is_empty() {
        return Err(AppError::InvalidInput("shortener API key is empty".to_string()));
    }
    let url = validate_http_url(url)?;

    Ok((key.to_string(), url))
}

fn validate_http_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let parsed =
        Url::parse(raw).map_err(|e| AppError::InvalidInput(format!("invalid URL {raw:?}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(raw.to_string()),
        other => Err(AppError::InvalidInput(format!(
            "unsupported URL scheme {other:?}"
        ))),
    }
}
