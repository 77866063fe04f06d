//! Static configuration loaded from the environment
//!
//! These values are the fallbacks for everything the admin plane can override
//! at runtime (see [`crate::settings`]). A `.env` file is honoured through
//! `dotenvy` in `main`.

use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SHORTENER_URL: &str = "https://arolinks.com/api";
pub const DEFAULT_SHORTENER_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CONCURRENT_EVENTS: usize = 50;

#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listener port (event API and health check)
    pub port: u16,

    /// Path of the redb database file
    pub database_path: String,

    /// Username of the bot, used to build `<base>/<username>?start=<token>`
    pub bot_username: String,

    /// Base of the bot entry link, without trailing slash
    pub bot_entry_base: String,

    /// The single immutable owner. Always privileged.
    pub owner_id: i64,

    pub shortener_api: String,
    pub shortener_url: String,
    pub shortener_timeout: Duration,

    pub tutorial_url: String,
    pub channel_url: String,
    pub support_contact: String,

    /// Upper bound on events handled at the same time
    pub max_concurrent_events: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_path: "data.db".to_string(),
            bot_username: "linkstash_bot".to_string(),
            bot_entry_base: "https://t.me".to_string(),
            owner_id: 0,
            shortener_api: String::new(),
            shortener_url: DEFAULT_SHORTENER_URL.to_string(),
            shortener_timeout: Duration::from_secs(DEFAULT_SHORTENER_TIMEOUT_SECS),
            tutorial_url: "https://t.me/your_tutorial_video_link".to_string(),
            channel_url: String::new(),
            support_contact: String::new(),
            max_concurrent_events: DEFAULT_MAX_CONCURRENT_EVENTS,
        }
    }
}

impl Config {
    /// Reads every setting from the environment, keeping the default for
    /// anything missing or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: parsed("PORT", defaults.port),
            database_path: string("DATABASE_URL", defaults.database_path),
            bot_username: string("BOT_USERNAME", defaults.bot_username),
            bot_entry_base: string("BOT_ENTRY_BASE", defaults.bot_entry_base)
                .trim_end_matches('/')
                .to_string(),
            owner_id: parsed("OWNER_ID", defaults.owner_id),
            shortener_api: string("SHORTENER_API", defaults.shortener_api),
            shortener_url: string("SHORTENER_URL", defaults.shortener_url),
            shortener_timeout: Duration::from_secs(parsed(
                "SHORTENER_TIMEOUT_SECS",
                DEFAULT_SHORTENER_TIMEOUT_SECS,
            )),
            tutorial_url: string("TUTORIAL_URL", defaults.tutorial_url),
            channel_url: string("CHANNEL_URL", defaults.channel_url),
            support_contact: string("SUPPORT_CONTACT", defaults.support_contact),
            max_concurrent_events: parsed("MAX_CONCURRENT_EVENTS", defaults.max_concurrent_events)
                .max(1),
        }
    }

    /// Public entry link of the bot, e.g. `https://t.me/linkstash_bot`
    pub fn bot_link(&self) -> String {
        format!("{}/{}", self.bot_entry_base, self.bot_username)
    }
}

fn string(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}
