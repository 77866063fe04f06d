//! Database initialization and table definitions
//!
//! This module handles the setup of the embedded redb database and the
//! application state shared by every request handler. All records are stored
//! as JSON strings so the tables behave like a small document store.

use redb::{Database, TableDefinition};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::admin::{AdminPlane, AdminRoster};
use crate::config::Config;
use crate::error::Result;
use crate::resolver::Pipeline;
use crate::resources::ResourceStore;
use crate::settings::SettingsStore;
use crate::shortener::{HttpShortener, Shortener};
use crate::users::UserStore;

/// Main table for stored resources
///
/// Key: token (e.g. "aZ3kLm9QxYtR" or "get-aZ3kLm9QxYtR")
/// Value: JSON-serialized Resource
pub const TABLE_RESOURCES: TableDefinition<&str, &str> = TableDefinition::new("resources_v1");

/// Dedup index
///
/// Key: uniqueness key ("link:<url>" or "file:<unique id>")
/// Value: token of the resource holding that content
pub const TABLE_UNIQUENESS: TableDefinition<&str, &str> = TableDefinition::new("uniqueness_v1");

/// Chronological index for listing the latest resources
///
/// Key: "{created_at_micros:020}:{token}", zero padded so that byte order
/// matches time order
/// Value: token
pub const TABLE_RECENT: TableDefinition<&str, &str> = TableDefinition::new("recent_v1");

/// Key: user id, Value: JSON-serialized User
pub const TABLE_USERS: TableDefinition<i64, &str> = TableDefinition::new("users_v1");

/// Admin roster. Key: user id, Value: unix timestamp of the grant
pub const TABLE_ADMINS: TableDefinition<i64, i64> = TableDefinition::new("admins_v1");

/// Runtime settings. Key: setting name, Value: raw string
pub const TABLE_SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings_v1");

/// Application state shared across all request handlers
///
/// Stores are cheap handles over the same database, so they are built on
/// demand instead of being kept here.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
    pub shortener: Arc<dyn Shortener>,

    /// Permits for concurrently handled events
    pub events: Arc<Semaphore>,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Arc<Config>, shortener: Arc<dyn Shortener>) -> Self {
        let events = Arc::new(Semaphore::new(config.max_concurrent_events));
        Self {
            db,
            config,
            shortener,
            events,
        }
    }

    /// State wired to the real shortener API
    pub fn with_http_shortener(db: Database, config: Config) -> Result<Self> {
        let db = Arc::new(db);
        let config = Arc::new(config);
        let shortener = HttpShortener::new(SettingsStore::new(db.clone()), config.clone())?;
        Ok(Self::new(db, config, Arc::new(shortener)))
    }

    pub fn resources(&self) -> ResourceStore {
        ResourceStore::new(self.db.clone())
    }

    pub fn users(&self) -> UserStore {
        UserStore::new(self.db.clone())
    }

    pub fn settings(&self) -> SettingsStore {
        SettingsStore::new(self.db.clone())
    }

    pub fn roster(&self) -> AdminRoster {
        AdminRoster::new(self.db.clone(), self.config.owner_id)
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            self.resources(),
            self.users(),
            self.settings(),
            self.roster(),
            self.shortener.clone(),
            self.config.clone(),
        )
    }

    pub fn admin(&self) -> AdminPlane {
        AdminPlane::new(
            self.roster(),
            self.resources(),
            self.users(),
            self.settings(),
            self.config.clone(),
        )
    }
}

/// Initializes the embedded database and creates required tables
///
/// # Arguments
///
/// * `db_path` - File path where the database should be stored (e.g., "data.db")
///
/// # Example
///
/// ```no_run
/// # use linkstash::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> std::result::Result<Database, redb::Error> {
    // Create or open the database file
    let db = Database::create(db_path)?;

    // Begin a write transaction to create tables
    let write_txn = db.begin_write()?;
    {
        // Resource records and their two indexes
        write_txn.open_table(TABLE_RESOURCES)?;
        write_txn.open_table(TABLE_UNIQUENESS)?;
        write_txn.open_table(TABLE_RECENT)?;

        // Users, admin roster and runtime settings
        write_txn.open_table(TABLE_USERS)?;
        write_txn.open_table(TABLE_ADMINS)?;
        write_txn.open_table(TABLE_SETTINGS)?;
    }

    // Commit the transaction to persist the table structures
    write_txn.commit()?;

    Ok(db)
}
