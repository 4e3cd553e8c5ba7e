//! Weekly running statistics aggregated from Garmin activities.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Aggregated running statistics for one ISO week (Monday-keyed).
///
/// Produced by the weekly aggregator or the mock generator; carries no
/// owner. The persisted form is [`WeeklyStatRow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WeeklyStat {
    /// Monday of the week (YYYY-MM-DD)
    pub week_start: String,
    /// Total distance in kilometers (1 decimal)
    pub total_distance_km: f64,
    /// Number of runs
    pub total_runs: u32,
    /// Distance-weighted average pace in min/km (2 decimals)
    pub avg_pace_min_km: f64,
    /// Total time in minutes (rounded)
    pub total_time_minutes: i64,
}

/// Persisted weekly stat, keyed by `{athlete_id}_{week_start}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyStatRow {
    /// Owning athlete
    pub athlete_id: String,
    /// Monday of the week (YYYY-MM-DD)
    pub week_start: String,
    /// Total distance in kilometers (1 decimal)
    pub total_distance_km: f64,
    /// Number of runs
    pub total_runs: u32,
    /// Distance-weighted average pace in min/km (2 decimals)
    pub avg_pace_min_km: f64,
    /// Total time in minutes (rounded)
    pub total_time_minutes: i64,
    /// When this row was computed (ISO 8601)
    pub created_at: String,
}

impl WeeklyStatRow {
    /// Build a persisted row from an aggregated stat.
    pub fn from_stat(athlete_id: &str, stat: &WeeklyStat, now: &str) -> Self {
        Self {
            athlete_id: athlete_id.to_string(),
            week_start: stat.week_start.clone(),
            total_distance_km: stat.total_distance_km,
            total_runs: stat.total_runs,
            avg_pace_min_km: stat.avg_pace_min_km,
            total_time_minutes: stat.total_time_minutes,
            created_at: now.to_string(),
        }
    }

    /// Document ID: one row per (athlete, week).
    pub fn doc_id(&self) -> String {
        format!("{}_{}", self.athlete_id, self.week_start)
    }
}
