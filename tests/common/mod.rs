// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::sync::Arc;
use stride_coach::config::Config;
use stride_coach::db::FirestoreDb;
use stride_coach::middleware::auth::create_jwt;
use stride_coach::models::Role;
use stride_coach::routes::create_router;
use stride_coach::services::garmin::SessionCache;
use stride_coach::services::{GarminService, MockGarminApi, VaultService};
use stride_coach::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a Garmin service backed by the mock provider.
/// Returns the service and its cache handle for inspection.
#[allow(dead_code)]
pub fn test_garmin_service(db: FirestoreDb, mock_mode: bool) -> (GarminService, SessionCache) {
    let config = Config::test_default();
    let vault = VaultService::new(&config.encryption_key).expect("vault init");
    let cache: SessionCache = Arc::new(dashmap::DashMap::new());

    let service = GarminService::new(
        Arc::new(MockGarminApi::new()),
        db,
        vault,
        cache.clone(),
        mock_mode,
    );
    (service, cache)
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_db(test_db_offline())
}

/// Create a test app on a specific database (e.g. the emulator).
#[allow(dead_code)]
pub fn create_test_app_with_db(db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let (garmin_service, _) = test_garmin_service(db.clone(), config.garmin_mock_mode);

    let state = Arc::new(AppState {
        config,
        db,
        garmin_service,
    });

    (create_router(state.clone()), state)
}

/// Create a signed JWT for a test user.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, role: Role, signing_key: &[u8]) -> String {
    create_jwt(user_id, role, signing_key).expect("Failed to create test JWT")
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Response body is not JSON")
}
