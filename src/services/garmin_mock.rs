// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mock Garmin data for demo/offline mode.
//!
//! Generates realistic marathon-training numbers so the app is usable
//! without a Garmin account: weekly stats directly in aggregated form,
//! plus a provider fake that stands in for the live SSO flow.

use crate::models::WeeklyStat;
use crate::services::garmin::{
    GarminActivity, GarminActivityType, GarminApi, GarminProfile, GarminSession, ProviderError,
};
use crate::services::stats::{round1, round2};
use crate::time_utils::{format_date, week_start_monday};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;

/// Generate `num_weeks` of synthetic weekly stats, one per consecutive
/// Monday going backward from the current week.
///
/// Ranges model a marathon block: 4-6 runs, 30-70 km, 4:30-6:00 min/km.
/// Total time is derived from distance and pace so the numbers agree.
pub fn generate_mock_weekly_stats(num_weeks: usize) -> Vec<WeeklyStat> {
    let mut rng = rand::thread_rng();
    let current_monday = week_start_monday(Utc::now().date_naive());

    (0..num_weeks)
        .map(|i| {
            let week_start = current_monday - Duration::weeks(i as i64);
            let total_runs = rng.gen_range(4..=6);
            let total_distance_km = round1(rng.gen_range(30.0..70.0));
            let avg_pace_min_km = round2(rng.gen_range(4.5..6.0));

            WeeklyStat {
                week_start: format_date(week_start),
                total_distance_km,
                total_runs,
                avg_pace_min_km,
                total_time_minutes: (total_distance_km * avg_pace_min_km).round() as i64,
            }
        })
        .collect()
}

/// Generate `count` synthetic raw activities, one per day going backward
/// from today.
pub fn generate_mock_activities(count: usize) -> Vec<GarminActivity> {
    const RUN_NAMES: [&str; 5] = [
        "Easy Run",
        "Tempo Run",
        "Long Run",
        "Interval Training",
        "Recovery Run",
    ];

    let mut rng = rand::thread_rng();
    let today = Utc::now().date_naive();

    (0..count)
        .map(|i| {
            let date = today - Duration::days(i as i64);
            let distance_km = round1(rng.gen_range(5.0..25.0));
            let pace_min_km = round2(rng.gen_range(4.5..6.5));

            GarminActivity {
                activity_id: Some(1_000_000 + i as i64),
                activity_name: Some(RUN_NAMES[rng.gen_range(0..RUN_NAMES.len())].to_string()),
                activity_type: Some(GarminActivityType {
                    type_key: "running".to_string(),
                }),
                start_time_local: Some(format!("{} 07:30:00", format_date(date))),
                start_time_gmt: None,
                distance: Some(distance_km * 1000.0),
                duration: Some(distance_km * pace_min_km * 60.0),
                moving_duration: None,
            }
        })
        .collect()
}

/// Provider fake used in demo mode and tests.
///
/// Accepts any non-empty credentials and serves synthetic activities.
pub struct MockGarminApi;

impl MockGarminApi {
    pub fn new() -> Self {
        Self
    }

    fn session() -> GarminSession {
        GarminSession {
            oauth1_token: Some(r#"{"token":"mock-oauth1","secret":"mock-secret"}"#.to_string()),
            oauth2_token: Some(
                r#"{"access_token":"mock-access","refresh_token":"mock-refresh"}"#.to_string(),
            ),
        }
    }
}

impl Default for MockGarminApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GarminApi for MockGarminApi {
    async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<GarminSession, ProviderError> {
        if username.is_empty() || password.is_empty() {
            return Err(ProviderError::InvalidCredentials);
        }
        Ok(Self::session())
    }

    async fn validate_session(
        &self,
        session: &GarminSession,
    ) -> Result<GarminProfile, ProviderError> {
        if session.oauth2_token.is_none() {
            return Err(ProviderError::SessionExpired);
        }
        Ok(GarminProfile {
            display_name: "demo.runner".to_string(),
            full_name: Some("Demo Runner".to_string()),
        })
    }

    async fn list_recent_activities(
        &self,
        _session: &GarminSession,
        limit: u32,
    ) -> Result<Vec<GarminActivity>, ProviderError> {
        Ok(generate_mock_activities(limit.min(30) as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::stats::calculate_weekly_stats;

    #[test]
    fn test_mock_stats_count_and_order() {
        let stats = generate_mock_weekly_stats(8);
        assert_eq!(stats.len(), 8);

        for pair in stats.windows(2) {
            assert!(pair[0].week_start > pair[1].week_start);
        }
    }

    #[test]
    fn test_mock_stats_start_on_mondays() {
        for stat in generate_mock_weekly_stats(4) {
            let date = chrono::NaiveDate::parse_from_str(&stat.week_start, "%Y-%m-%d").unwrap();
            assert_eq!(week_start_monday(date), date);
        }
    }

    #[test]
    fn test_mock_stats_within_ranges() {
        for stat in generate_mock_weekly_stats(20) {
            assert!((4..=6).contains(&stat.total_runs));
            assert!((30.0..=70.0).contains(&stat.total_distance_km));
            assert!((4.5..=6.0).contains(&stat.avg_pace_min_km));
            assert_eq!(
                stat.total_time_minutes,
                (stat.total_distance_km * stat.avg_pace_min_km).round() as i64
            );
        }
    }

    #[test]
    fn test_mock_activities_aggregate_cleanly() {
        let activities = generate_mock_activities(30);
        let stats = calculate_weekly_stats(&activities, 8);

        assert!(!stats.is_empty());
        assert!(stats.iter().all(|week| week.total_runs > 0));
    }

    #[tokio::test]
    async fn test_mock_api_rejects_empty_credentials() {
        let api = MockGarminApi::new();
        assert!(api.login("", "secret").await.is_err());
        assert!(api.login("user@example.com", "").await.is_err());
        assert!(api.login("user@example.com", "secret").await.is_ok());
    }
}
