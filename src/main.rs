// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Stride-Coach API Server
//!
//! Backend for the coach/athlete training log: run scheduling, athlete
//! management, and weekly stats synced from Garmin Connect.

use std::sync::Arc;
use stride_coach::{
    config::Config,
    db::FirestoreDb,
    services::{GarminApi, GarminConnectClient, GarminService, MockGarminApi, VaultService},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Stride-Coach API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Initialize the credential vault (fatal without a key)
    let vault = VaultService::from_config(&config).expect("Failed to initialize credential vault");
    tracing::info!("Credential vault initialized");

    // Pick the Garmin provider: live client, or the mock in demo mode
    let garmin_api: Arc<dyn GarminApi> = if config.garmin_mock_mode {
        tracing::warn!("GARMIN_MOCK_MODE enabled - serving generated Garmin data");
        Arc::new(MockGarminApi::new())
    } else {
        Arc::new(GarminConnectClient::new())
    };

    // Initialize shared session cache
    // Shared across all requests within this server instance
    let session_cache = Arc::new(dashmap::DashMap::new());
    tracing::info!("Session cache initialized");

    let garmin_service = GarminService::new(
        garmin_api,
        db.clone(),
        vault,
        session_cache,
        config.garmin_mock_mode,
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        garmin_service,
    });

    // Build router
    let app = stride_coach::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stride_coach=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
