// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Stride-Coach: training-log backend for coaches and athletes
//!
//! This crate provides the backend API for scheduling runs on a calendar,
//! tracking completion, and syncing weekly running statistics from a
//! Garmin Connect account.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::GarminService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub garmin_service: GarminService,
}
