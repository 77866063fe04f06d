//! Runtime settings with static fallbacks
//!
//! Every lookup goes to the database, so a value written by an admin is
//! visible to the very next shortener call.

use std::sync::Arc;

use redb::{Database, ReadableDatabase};
use tracing::info;

use crate::config::Config;
use crate::database::TABLE_SETTINGS;
use crate::error::Result;

pub mod keys {
    pub const SHORTENER_API: &str = "shortener_api";
    pub const SHORTENER_URL: &str = "shortener_url";
    pub const TUTORIAL: &str = "tutorial";
}

/// Effective shortener credentials for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortenerCredentials {
    pub api_key: String,
    pub endpoint: String,
}

#[derive(Clone)]
pub struct SettingsStore {
    db: Arc<Database>,
}

impl SettingsStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let settings = read_txn.open_table(TABLE_SETTINGS)?;
        let value = settings.get(key)?.map(|guard| guard.value().to_string());
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut settings = write_txn.open_table(TABLE_SETTINGS)?;
            settings.insert(key, value)?;
        }
        write_txn.commit()?;
        info!(key, "setting updated");
        Ok(())
    }

    /// Writes several settings in one transaction
    pub fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut settings = write_txn.open_table(TABLE_SETTINGS)?;
            for (key, value) in entries {
                settings.insert(*key, *value)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Removes an override so the static default applies again
    pub fn unset(&self, key: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut settings = write_txn.open_table(TABLE_SETTINGS)?;
            let previous = settings.remove(key)?;
            previous.is_some()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Persisted value unless missing or blank, static default otherwise
    pub fn get_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self
            .get(key)?
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    pub fn resolve_shortener(&self, config: &Config) -> Result<ShortenerCredentials> {
        Ok(ShortenerCredentials {
            api_key: self.get_or(keys::SHORTENER_API, &config.shortener_api)?,
            endpoint: self.get_or(keys::SHORTENER_URL, &config.shortener_url)?,
        })
    }

    pub fn tutorial_url(&self, config: &Config) -> Result<String> {
        self.get_or(keys::TUTORIAL, &config.tutorial_url)
    }
}
