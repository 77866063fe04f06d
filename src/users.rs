//! User records and the premium lifecycle
//!
//! Premium expiry is reconciled lazily: reading a user whose grant has run out
//! clears the flag and writes the record back. No background task is needed.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata};
use tracing::info;

use crate::database::TABLE_USERS;
use crate::error::{AppError, Result};
use crate::model::User;

#[derive(Clone)]
pub struct UserStore {
    db: Arc<Database>,
}

impl UserStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Records first contact, or refreshes the profile fields of a known user.
    ///
    /// Counters and premium state are never touched here.
    pub fn add_user(
        &self,
        user_id: i64,
        username: Option<String>,
        first_name: Option<String>,
    ) -> Result<User> {
        self.upsert(user_id, |user| {
            if username.is_some() {
                user.username = username;
            }
            if first_name.is_some() {
                user.first_name = first_name;
            }
        })
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(TABLE_USERS)?;
        load(&users, user_id)
    }

    pub fn increment_user_resources(&self, user_id: i64) -> Result<u64> {
        let user = self.upsert(user_id, |user| user.total_resources += 1)?;
        Ok(user.total_resources)
    }

    pub fn grant_premium(&self, user_id: i64, days: u32) -> Result<User> {
        if days == 0 {
            return Err(AppError::InvalidInput(
                "premium must last at least one day".to_string(),
            ));
        }
        let expiry = Utc::now()
            .checked_add_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| {
                AppError::InvalidInput(format!("premium of {days} days is out of range"))
            })?;
        self.grant_premium_until(user_id, expiry)
    }

    pub fn grant_premium_until(&self, user_id: i64, expiry: DateTime<Utc>) -> Result<User> {
        let user = self.upsert(user_id, |user| {
            user.is_premium = true;
            user.premium_expiry = Some(expiry);
        })?;
        info!(user_id, %expiry, "premium granted");
        Ok(user)
    }

    /// Returns `false` when the user was unknown or not premium
    pub fn revoke_premium(&self, user_id: i64) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let revoked = {
            let mut users = write_txn.open_table(TABLE_USERS)?;
            match load(&users, user_id)? {
                Some(mut user) if user.is_premium || user.premium_expiry.is_some() => {
                    user.is_premium = false;
                    user.premium_expiry = None;
                    let json = serde_json::to_string(&user)?;
                    users.insert(user_id, json.as_str())?;
                    true
                }
                _ => false,
            }
        };

        if revoked {
            write_txn.commit()?;
            info!(user_id, "premium revoked");
        } else {
            write_txn.abort()?;
        }
        Ok(revoked)
    }

    pub fn check_premium(&self, user_id: i64) -> Result<bool> {
        self.check_premium_at(user_id, Utc::now())
    }

    /// Premium check against an explicit clock.
    ///
    /// A lapsed grant is cleared in storage before returning `false`.
    pub fn check_premium_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<bool> {
        let user = match self.get_user(user_id)? {
            Some(user) => user,
            None => return Ok(false),
        };
        if user.premium_active_at(now) {
            return Ok(true);
        }
        if !user.premium_lapsed_at(now) {
            return Ok(false);
        }

        // Re-read under the write lock; a grant may have landed in between
        let write_txn = self.db.begin_write()?;
        let active = {
            let mut users = write_txn.open_table(TABLE_USERS)?;
            match load(&users, user_id)? {
                Some(user) if user.premium_active_at(now) => true,
                Some(mut user) => {
                    user.is_premium = false;
                    user.premium_expiry = None;
                    let json = serde_json::to_string(&user)?;
                    users.insert(user_id, json.as_str())?;
                    false
                }
                None => false,
            }
        };
        write_txn.commit()?;

        if !active {
            info!(user_id, "premium expired, flag cleared");
        }
        Ok(active)
    }

    pub fn count(&self) -> Result<u64> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(TABLE_USERS)?;
        Ok(users.len()?)
    }

    /// Users whose premium is active right now. Lapsed records are not healed here.
    pub fn premium_count(&self) -> Result<u64> {
        let now = Utc::now();
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(TABLE_USERS)?;

        let mut active = 0;
        for entry in users.iter()? {
            let (_, value) = entry?;
            let user: User = serde_json::from_str(value.value())?;
            if user.premium_active_at(now) {
                active += 1;
            }
        }
        Ok(active)
    }

    /// Applies `apply` to the stored user, creating a bare record first if needed
    fn upsert<F>(&self, user_id: i64, apply: F) -> Result<User>
    where
        F: FnOnce(&mut User),
    {
        let write_txn = self.db.begin_write()?;
        let user = {
            let mut users = write_txn.open_table(TABLE_USERS)?;
            let mut user = load(&users, user_id)?.unwrap_or_else(|| User::new(user_id, None, None));
            apply(&mut user);
            let json = serde_json::to_string(&user)?;
            users.insert(user_id, json.as_str())?;
            user
        };
        write_txn.commit()?;
        Ok(user)
    }
}

fn load(table: &impl ReadableTable<i64, &'static str>, user_id: i64) -> Result<Option<User>> {
    match table.get(user_id)? {
        Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
        None => Ok(None),
    }
}
