//! Storage layer tests: resources, users, settings and the admin roster

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{setup, test_config, OWNER};
use linkstash::error::AppError;
use linkstash::model::{FileKind, FileRef, Origin};
use linkstash::settings::{keys, ShortenerCredentials};

#[test]
fn test_store_reuses_token_for_same_content() {
    let (state, _shortener, _temp_db) = setup();
    let resources = state.resources();

    let first = resources.store(Origin::link("https://t.me/abc"), 42).unwrap();
    let second = resources.store(Origin::link("https://t.me/abc"), 99).unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.resource.token, second.resource.token);
    assert_eq!(second.resource.created_by, 42);
    assert_eq!(first.resource.access_count, 0);
    assert!(first.resource.short_url.is_none());
    assert_eq!(resources.count().unwrap(), 1);
}

#[test]
fn test_lookup_by_uniqueness_key() {
    let (state, _shortener, _temp_db) = setup();
    let resources = state.resources();

    let origin = Origin::File(FileRef {
        kind: FileKind::Document,
        chat_id: 10,
        message_id: 20,
        unique_id: "AgADdoc".to_string(),
        file_id: "BQAC-doc".to_string(),
        caption: None,
    });
    let stored = resources.store(origin, OWNER).unwrap().resource;

    let found = resources.get_by_uniqueness_key("file:AgADdoc").unwrap().unwrap();
    assert_eq!(found, stored);
    assert!(resources.get_by_uniqueness_key("link:AgADdoc").unwrap().is_none());
    assert!(resources.get_by_uniqueness_key("file:missing").unwrap().is_none());
}

#[test]
fn test_link_and_file_keys_never_collide() {
    let (state, _shortener, _temp_db) = setup();
    let resources = state.resources();

    let link = resources.store(Origin::link("AgADsame"), OWNER).unwrap();
    let file = resources
        .store(
            Origin::File(FileRef {
                kind: FileKind::Photo,
                chat_id: 1,
                message_id: 2,
                unique_id: "AgADsame".to_string(),
                file_id: "AgAC-photo".to_string(),
                caption: None,
            }),
            OWNER,
        )
        .unwrap();

    assert!(file.created);
    assert_ne!(link.resource.token, file.resource.token);
}

#[test]
fn test_increment_and_cache_on_missing_token_are_noops() {
    let (state, _shortener, _temp_db) = setup();
    let resources = state.resources();

    assert_eq!(resources.increment_access("aZ3kLm9QxYtR").unwrap(), None);
    assert!(!resources.save_short_url("aZ3kLm9QxYtR", "https://s.test/x").unwrap());
    assert_eq!(resources.count().unwrap(), 0);
}

#[test]
fn test_short_url_cache_round_trip() {
    let (state, _shortener, _temp_db) = setup();
    let resources = state.resources();
    let token = resources
        .store(Origin::link("https://t.me/abc"), OWNER)
        .unwrap()
        .resource
        .token;

    assert!(resources.save_short_url(&token, "https://s.test/abc").unwrap());
    assert_eq!(
        resources.get(&token).unwrap().unwrap().short_url.as_deref(),
        Some("https://s.test/abc")
    );

    assert_eq!(resources.clear_all_short_urls().unwrap(), 1);
    assert!(resources.get(&token).unwrap().unwrap().short_url.is_none());
    // Nothing left to clear, resource still there
    assert_eq!(resources.clear_all_short_urls().unwrap(), 0);
    assert_eq!(resources.count().unwrap(), 1);
}

#[test]
fn test_recent_lists_newest_first() {
    let (state, _shortener, _temp_db) = setup();
    let resources = state.resources();

    let mut tokens = Vec::new();
    for i in 0..5 {
        let outcome = resources
            .store(Origin::link(format!("https://t.me/item{}", i)), OWNER)
            .unwrap();
        tokens.push(outcome.resource.token);
        thread::sleep(Duration::from_millis(2));
    }

    let recent: Vec<String> = resources
        .recent(3)
        .unwrap()
        .into_iter()
        .map(|resource| resource.token)
        .collect();
    assert_eq!(recent, vec![tokens[4].clone(), tokens[3].clone(), tokens[2].clone()]);
}

#[test]
fn test_parallel_store_keeps_one_record() {
    let (state, _shortener, _temp_db) = setup();
    let resources = Arc::new(state.resources());

    let handles: Vec<_> = (0..16)
        .map(|submitter| {
            let resources = resources.clone();
            thread::spawn(move || {
                resources
                    .store(Origin::link("https://t.me/race"), submitter)
                    .unwrap()
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let created = outcomes.iter().filter(|outcome| outcome.created).count();
    let token = &outcomes[0].resource.token;

    assert_eq!(created, 1);
    assert!(outcomes.iter().all(|outcome| &outcome.resource.token == token));
    assert_eq!(resources.count().unwrap(), 1);
}

#[test]
fn test_parallel_increments_are_not_lost() {
    let (state, _shortener, _temp_db) = setup();
    let resources = Arc::new(state.resources());
    let token = resources
        .store(Origin::link("https://t.me/abc"), OWNER)
        .unwrap()
        .resource
        .token;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let resources = resources.clone();
            let token = token.clone();
            thread::spawn(move || {
                for _ in 0..10 {
                    resources.increment_access(&token).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(resources.get(&token).unwrap().unwrap().access_count, 80);
}

#[test]
fn test_add_user_refreshes_profile_only() {
    let (state, _shortener, _temp_db) = setup();
    let users = state.users();

    let first = users
        .add_user(42, Some("alice".to_string()), Some("Alice".to_string()))
        .unwrap();
    users.increment_user_resources(42).unwrap();
    users.grant_premium(42, 3).unwrap();

    let refreshed = users.add_user(42, Some("alice_new".to_string()), None).unwrap();
    assert_eq!(refreshed.username.as_deref(), Some("alice_new"));
    assert_eq!(refreshed.first_name.as_deref(), Some("Alice"));
    assert_eq!(refreshed.joined_at, first.joined_at);
    assert_eq!(refreshed.total_resources, 1);
    assert!(refreshed.is_premium);
    assert_eq!(users.count().unwrap(), 1);
}

#[test]
fn test_premium_grant_and_revoke() {
    let (state, _shortener, _temp_db) = setup();
    let users = state.users();

    assert!(matches!(users.grant_premium(8, 0), Err(AppError::InvalidInput(_))));
    assert!(!users.revoke_premium(8).unwrap());

    users.grant_premium(8, 7).unwrap();
    assert!(users.check_premium(8).unwrap());
    assert_eq!(users.premium_count().unwrap(), 1);

    assert!(users.revoke_premium(8).unwrap());
    assert!(!users.check_premium(8).unwrap());
    assert_eq!(users.premium_count().unwrap(), 0);
    assert!(!users.revoke_premium(8).unwrap());
}

#[test]
fn test_premium_beyond_calendar_range_is_rejected() {
    let (state, _shortener, _temp_db) = setup();

    let result = state.admin().grant_premium(OWNER, 5, 100_000_000);
    assert!(matches!(result, Err(AppError::InvalidInput(_))));
    assert!(state.users().get_user(5).unwrap().is_none());

    // Largest value the request type allows
    let result = state.users().grant_premium(5, u32::MAX);
    assert!(matches!(result, Err(AppError::InvalidInput(_))));
    assert!(!state.users().check_premium(5).unwrap());
}

#[test]
fn test_unknown_user_is_not_premium() {
    let (state, _shortener, _temp_db) = setup();
    assert!(!state.users().check_premium(404).unwrap());
    assert!(state.users().get_user(404).unwrap().is_none());
}

#[test]
fn test_settings_fall_back_to_config() {
    let (state, _shortener, _temp_db) = setup();
    let settings = state.settings();
    let config = test_config();

    assert_eq!(
        settings.resolve_shortener(&config).unwrap(),
        ShortenerCredentials {
            api_key: config.shortener_api.clone(),
            endpoint: config.shortener_url.clone(),
        }
    );

    settings.set(keys::SHORTENER_URL, "https://other.example/api").unwrap();
    let resolved = settings.resolve_shortener(&config).unwrap();
    assert_eq!(resolved.endpoint, "https://other.example/api");
    assert_eq!(resolved.api_key, config.shortener_api);

    // Blank overrides do not count
    settings.set(keys::SHORTENER_API, "  ").unwrap();
    assert_eq!(settings.resolve_shortener(&config).unwrap().api_key, config.shortener_api);

    assert!(settings.unset(keys::SHORTENER_URL).unwrap());
    assert_eq!(
        settings.resolve_shortener(&config).unwrap().endpoint,
        config.shortener_url
    );
    assert_eq!(settings.tutorial_url(&config).unwrap(), config.tutorial_url);
}

#[test]
fn test_owner_is_always_privileged() {
    let (state, _shortener, _temp_db) = setup();
    let roster = state.roster();

    assert!(roster.is_privileged(OWNER).unwrap());
    assert!(!roster.is_privileged(2).unwrap());

    assert!(roster.add(2).unwrap());
    assert!(!roster.add(2).unwrap());
    assert!(roster.is_privileged(2).unwrap());
    assert_eq!(roster.list().unwrap(), vec![OWNER, 2]);

    assert!(matches!(roster.remove(OWNER), Err(AppError::InvalidInput(_))));
    assert!(roster.remove(2).unwrap());
    assert!(!roster.is_privileged(2).unwrap());
    assert_eq!(roster.list().unwrap(), vec![OWNER]);
}

#[test]
fn test_admin_plane_rejects_non_admins_without_mutation() {
    let (state, _shortener, _temp_db) = setup();
    let admin = state.admin();
    let outsider = 3;

    assert!(matches!(admin.add_admin(outsider, outsider), Err(AppError::Unauthorized(_))));
    assert!(matches!(admin.grant_premium(outsider, outsider, 30), Err(AppError::Unauthorized(_))));
    assert!(matches!(
        admin.set_shortener(outsider, "key|https://evil.example/api"),
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        admin.set_tutorial(outsider, "https://evil.example"),
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(admin.refresh_short_links(outsider), Err(AppError::Unauthorized(_))));
    assert!(matches!(admin.stats(outsider), Err(AppError::Unauthorized(_))));

    assert!(!state.roster().is_privileged(outsider).unwrap());
    assert!(state.users().get_user(outsider).unwrap().is_none());
    assert!(state.settings().get(keys::SHORTENER_URL).unwrap().is_none());
    assert!(state.settings().get(keys::TUTORIAL).unwrap().is_none());
}

#[test]
fn test_admin_plane_stats_and_shortener_status() {
    let (state, _shortener, _temp_db) = setup();
    let admin = state.admin();

    admin.add_admin(OWNER, 2).unwrap();
    // A newly added admin may use the plane as well
    admin.grant_premium(2, 10, 5).unwrap();
    state.users().add_user(11, None, None).unwrap();
    state.resources().store(Origin::link("https://t.me/abc"), OWNER).unwrap();

    let stats = admin.stats(OWNER).unwrap();
    assert_eq!(stats.users, 2);
    assert_eq!(stats.premium_users, 1);
    assert_eq!(stats.resources, 1);
    assert_eq!(stats.admins, 2);

    let status = admin.shortener_status(OWNER).unwrap();
    assert!(!status.api_key_set);
    assert!(!status.endpoint_set);
    assert_eq!(status.endpoint, test_config().shortener_url);

    admin.set_shortener(2, "secret|https://short.example/api").unwrap();
    let status = admin.shortener_status(OWNER).unwrap();
    assert!(status.api_key_set);
    assert!(status.endpoint_set);
    assert_eq!(status.endpoint, "https://short.example/api");
    assert_eq!(
        state.settings().get(keys::SHORTENER_API).unwrap().as_deref(),
        Some("secret")
    );
}
