// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod garmin;
pub mod garmin_mock;
pub mod stats;
pub mod vault;

pub use garmin::{GarminApi, GarminConnectClient, GarminService, SessionCache};
pub use garmin_mock::MockGarminApi;
pub use vault::VaultService;
