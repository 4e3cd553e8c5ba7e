// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Scheduled run model for storage and API.

use serde::{Deserialize, Serialize};

/// A scheduled run on an athlete's calendar.
///
/// `coach_id` and `athlete_name` are denormalized at creation time so
/// that coach-wide listings and display never need a join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Run ID (uuid, also used as document ID)
    pub id: String,
    /// Athlete the run is scheduled for
    pub athlete_id: String,
    /// Coach who created the run
    pub coach_id: String,
    /// Athlete display name (denormalized)
    pub athlete_name: String,
    /// Scheduled date (YYYY-MM-DD)
    pub date: String,
    /// Run title
    pub title: String,
    /// Run type (easy, tempo, long, interval, recovery, race)
    pub run_type: String,
    /// Planned distance in kilometers
    pub distance_km: Option<f64>,
    /// Coach notes
    pub notes: Option<String>,
    /// Whether the athlete marked the run complete
    pub completed: bool,
    /// When the run was created (ISO 8601)
    pub created_at: String,
}
