//! Shared helpers for the integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::NamedTempFile;

use linkstash::config::Config;
use linkstash::database::{init_db, AppState};
use linkstash::shortener::{
    truncate_alias, ShortenOutcome, Shortener, UnavailableReason, MAX_ALIAS_LENGTH,
};

pub const OWNER: i64 = 1;
pub const BOT: &str = "stash_bot";

/// In-process shortener that counts calls and can be switched off
#[derive(Default)]
pub struct StubShortener {
    calls: AtomicUsize,
    down: AtomicBool,
}

impl StubShortener {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_available(&self, available: bool) {
        self.down.store(!available, Ordering::SeqCst);
    }
}

#[async_trait]
impl Shortener for StubShortener {
    async fn shorten(&self, _destination: &str, alias: &str) -> ShortenOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            ShortenOutcome::Unavailable(UnavailableReason::Timeout)
        } else {
            ShortenOutcome::Shortened(format!(
                "https://short.test/{}",
                truncate_alias(alias, MAX_ALIAS_LENGTH)
            ))
        }
    }
}

pub fn test_config() -> Config {
    Config {
        owner_id: OWNER,
        bot_username: BOT.to_string(),
        tutorial_url: "https://t.me/tutorial_default".to_string(),
        ..Config::default()
    }
}

/// App state over a temporary database and a [`StubShortener`]
pub fn setup() -> (AppState, Arc<StubShortener>, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db = init_db(temp_db.path().to_str().unwrap()).expect("Failed to initialize test database");

    let shortener = Arc::new(StubShortener::default());
    let state = AppState::new(Arc::new(db), Arc::new(test_config()), shortener.clone());
    state.roster().seed_owner().expect("Failed to seed owner");

    (state, shortener, temp_db)
}

pub fn deep_link(token: &str) -> String {
    format!("https://t.me/{}?start={}", BOT, token)
}

pub async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}
