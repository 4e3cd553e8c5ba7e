// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tests for session cache freshness and rehydration.
//!
//! These run against the offline mock database. A database error from
//! `get_client` is the tell that rehydration was attempted; a clean
//! result proves the cache was served without I/O.

use chrono::{Duration, Utc};
use std::sync::Arc;
use stride_coach::services::garmin::{CachedSession, GarminSession};

mod common;
use common::{test_db_offline, test_garmin_service};

fn test_session() -> GarminSession {
    GarminSession {
        oauth1_token: Some(r#"{"token":"t1"}"#.to_string()),
        oauth2_token: Some(r#"{"access_token":"t2"}"#.to_string()),
    }
}

#[tokio::test]
async fn test_fresh_cache_entry_served_without_io() {
    let (service, cache) = test_garmin_service(test_db_offline(), false);

    cache.insert(
        "user-1".to_string(),
        CachedSession {
            session: test_session(),
            cached_at: Utc::now(),
        },
    );

    // Offline DB would error on any touch, so a success here means the
    // cached session was returned directly.
    let session = service.get_client("user-1").await.unwrap();
    assert!(session.is_some(), "Fresh cache entry should be served");
}

#[tokio::test]
async fn test_entry_under_window_still_fresh() {
    let (service, cache) = test_garmin_service(test_db_offline(), false);
    let now = Utc::now();
    let service = service.with_clock(Arc::new(move || now));

    cache.insert(
        "user-1".to_string(),
        CachedSession {
            session: test_session(),
            cached_at: now - Duration::minutes(29),
        },
    );

    assert!(service.get_client("user-1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_stale_cache_entry_triggers_rehydration() {
    let (service, cache) = test_garmin_service(test_db_offline(), false);
    let now = Utc::now();
    let service = service.with_clock(Arc::new(move || now));

    // 31 minutes old: past the 30-minute window.
    cache.insert(
        "user-1".to_string(),
        CachedSession {
            session: test_session(),
            cached_at: now - Duration::minutes(31),
        },
    );

    // Rehydration hits the (offline) store and fails - the stale handle
    // must not be returned.
    let result = service.get_client("user-1").await;
    assert!(
        result.is_err(),
        "Stale entry must trigger rehydration, not be returned"
    );
}

#[tokio::test]
async fn test_uncached_user_hits_store() {
    let (service, _cache) = test_garmin_service(test_db_offline(), false);

    let result = service.get_client("nobody").await;
    assert!(result.is_err(), "No cache entry should mean a store lookup");
}

#[tokio::test]
async fn test_disconnect_evicts_cache_before_store() {
    let (service, cache) = test_garmin_service(test_db_offline(), false);

    cache.insert(
        "user-1".to_string(),
        CachedSession {
            session: test_session(),
            cached_at: Utc::now(),
        },
    );

    // The store delete fails offline, but the cache eviction happens first.
    let _ = service.disconnect("user-1").await;
    assert!(
        !cache.contains_key("user-1"),
        "Disconnect must evict the cached session"
    );
}
