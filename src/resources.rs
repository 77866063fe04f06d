//! Resource store
//!
//! Owns resource records, the dedup index and the chronological index.
//! redb runs one write transaction at a time, so every check-then-write
//! below happens inside a single write transaction and cannot interleave with
//! another event touching the same token or uniqueness key.

use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata};
use tracing::{debug, info};

use crate::database::{TABLE_RECENT, TABLE_RESOURCES, TABLE_UNIQUENESS};
use crate::error::{AppError, Result};
use crate::model::{Origin, Resource};
use crate::token;

/// Fresh tokens tried before giving up on an insert
const MAX_TOKEN_ATTEMPTS: usize = 8;

/// Result of [`ResourceStore::store`]
#[derive(Debug, Clone)]
pub struct StoreOutcome {
    pub resource: Resource,

    /// `false` when the content was already stored and the existing token was reused
    pub created: bool,
}

#[derive(Clone)]
pub struct ResourceStore {
    db: Arc<Database>,
}

impl ResourceStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Stores `origin` unless identical content is already present.
    ///
    /// Resubmitting the same content returns the resource created the first
    /// time, whoever submits it.
    pub fn store(&self, origin: Origin, submitter: i64) -> Result<StoreOutcome> {
        let key = origin.uniqueness_key();

        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut index = write_txn.open_table(TABLE_UNIQUENESS)?;
            let mut resources = write_txn.open_table(TABLE_RESOURCES)?;

            let indexed = index.get(key.as_str())?.map(|guard| guard.value().to_string());
            let existing = match indexed {
                Some(token) => load(&resources, &token)?,
                None => None,
            };

            match existing {
                Some(resource) => StoreOutcome {
                    resource,
                    created: false,
                },
                None => {
                    let token = unused_token(&resources, &origin)?;
                    let resource = Resource::new(token, origin, submitter);
                    let json = serde_json::to_string(&resource)?;

                    resources.insert(resource.token.as_str(), json.as_str())?;
                    // Also repoints an index entry whose resource went missing
                    index.insert(key.as_str(), resource.token.as_str())?;

                    let mut recent = write_txn.open_table(TABLE_RECENT)?;
                    recent.insert(recent_key(&resource).as_str(), resource.token.as_str())?;

                    StoreOutcome {
                        resource,
                        created: true,
                    }
                }
            }
        };

        if outcome.created {
            write_txn.commit()?;
            info!(
                token = %outcome.resource.token,
                created_by = outcome.resource.created_by,
                "stored new resource"
            );
        } else {
            write_txn.abort()?;
            debug!(token = %outcome.resource.token, "content already stored, reusing token");
        }

        Ok(outcome)
    }

    pub fn get(&self, token: &str) -> Result<Option<Resource>> {
        let read_txn = self.db.begin_read()?;
        let resources = read_txn.open_table(TABLE_RESOURCES)?;
        load(&resources, token)
    }

    pub fn get_by_uniqueness_key(&self, key: &str) -> Result<Option<Resource>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(TABLE_UNIQUENESS)?;
        let resources = read_txn.open_table(TABLE_RESOURCES)?;

        let token = index.get(key)?.map(|guard| guard.value().to_string());
        match token {
            Some(token) => load(&resources, &token),
            None => Ok(None),
        }
    }

    /// Bumps the access counter and returns the new value.
    ///
    /// An unknown token is not an error; `None` is returned and nothing is written.
    pub fn increment_access(&self, token: &str) -> Result<Option<u64>> {
        let updated = self.update(token, |resource| resource.access_count += 1)?;
        Ok(updated.map(|resource| resource.access_count))
    }

    /// Caches the shortened form of the resource's deep link
    pub fn save_short_url(&self, token: &str, short_url: &str) -> Result<bool> {
        let updated = self.update(token, |resource| {
            resource.short_url = Some(short_url.to_string())
        })?;
        Ok(updated.is_some())
    }

    /// Drops every cached short URL so the next access regenerates it.
    ///
    /// Resources themselves are kept. Returns how many caches were cleared.
    pub fn clear_all_short_urls(&self) -> Result<usize> {
        let write_txn = self.db.begin_write()?;
        let cleared = {
            let mut resources = write_txn.open_table(TABLE_RESOURCES)?;

            let mut cached = Vec::new();
            for entry in resources.iter()? {
                let (_, value) = entry?;
                let resource: Resource = serde_json::from_str(value.value())?;
                if resource.short_url.is_some() {
                    cached.push(resource);
                }
            }

            let cleared = cached.len();
            for mut resource in cached {
                resource.short_url = None;
                let json = serde_json::to_string(&resource)?;
                resources.insert(resource.token.as_str(), json.as_str())?;
            }

            cleared
        };
        write_txn.commit()?;

        info!(cleared, "cleared cached short links");
        Ok(cleared)
    }

    pub fn count(&self) -> Result<u64> {
        let read_txn = self.db.begin_read()?;
        let resources = read_txn.open_table(TABLE_RESOURCES)?;
        Ok(resources.len()?)
    }

    /// Latest stored resources, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<Resource>> {
        let read_txn = self.db.begin_read()?;
        let recent = read_txn.open_table(TABLE_RECENT)?;
        let resources = read_txn.open_table(TABLE_RESOURCES)?;

        let mut items = Vec::with_capacity(limit);
        for entry in recent.iter()?.rev() {
            if items.len() >= limit {
                break;
            }
            let (_, token) = entry?;
            if let Some(resource) = load(&resources, token.value())? {
                items.push(resource);
            }
        }
        Ok(items)
    }

    /// Read-modify-write of one record inside a single write transaction
    fn update<F>(&self, token: &str, apply: F) -> Result<Option<Resource>>
    where
        F: FnOnce(&mut Resource),
    {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut resources = write_txn.open_table(TABLE_RESOURCES)?;
            match load(&resources, token)? {
                Some(mut resource) => {
                    apply(&mut resource);
                    let json = serde_json::to_string(&resource)?;
                    resources.insert(token, json.as_str())?;
                    Some(resource)
                }
                None => None,
            }
        };

        match updated {
            Some(_) => write_txn.commit()?,
            None => write_txn.abort()?,
        }
        Ok(updated)
    }
}

fn load(
    table: &impl ReadableTable<&'static str, &'static str>,
    token: &str,
) -> Result<Option<Resource>> {
    match table.get(token)? {
        Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
        None => Ok(None),
    }
}

/// Draws tokens until one is free in `resources`
fn unused_token(
    resources: &impl ReadableTable<&'static str, &'static str>,
    origin: &Origin,
) -> Result<String> {
    for _ in 0..MAX_TOKEN_ATTEMPTS {
        let candidate = token::generate_for(origin.token_kind());
        if resources.get(candidate.as_str())?.is_none() {
            return Ok(candidate);
        }
        debug!(token = %candidate, "token collision, drawing again");
    }
    Err(AppError::Internal(format!(
        "no free token after {} attempts",
        MAX_TOKEN_ATTEMPTS
    )))
}

fn recent_key(resource: &Resource) -> String {
    format!(
        "{:020}:{}",
        resource.created_at.timestamp_micros(),
        resource.token
    )
}
