// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weekly running statistics calculated from Garmin activities.
//!
//! Pure functions, no I/O: the Garmin service fetches raw activities and
//! hands them here; persistence of the result is the caller's problem.

use crate::models::WeeklyStat;
use crate::services::garmin::GarminActivity;
use crate::time_utils::{format_date, parse_activity_date, week_start_monday};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;

/// Activity type keys that count as running.
const RUNNING_TYPE_KEYS: [&str; 4] = [
    "running",
    "trail_running",
    "treadmill_running",
    "track_running",
];

/// Whether an activity belongs to the running family.
///
/// Matches the named running type keys plus any label containing "run"
/// (Garmin has grown variants like "indoor_running" over the years).
/// Activities without a type label are not running.
pub fn is_running_activity(activity: &GarminActivity) -> bool {
    let label = activity.type_key().to_lowercase();
    if label.is_empty() {
        return false;
    }
    RUNNING_TYPE_KEYS.iter().any(|key| label.contains(key)) || label.contains("run")
}

/// Per-week accumulator used while bucketing.
#[derive(Default)]
struct WeekTotals {
    distance_km: f64,
    runs: u32,
    time_minutes: f64,
    // sum(pace_i * distance_i) over activities with positive distance
    weighted_pace: f64,
}

/// Calculate weekly stats from a list of activities.
///
/// Activities are filtered to the running family, bucketed by the Monday
/// of their calendar week, and summed. The average pace is the
/// distance-weighted mean of per-activity paces, so a 20 km long run
/// moves the needle more than a 3 km recovery jog. Zero-distance runs
/// (treadmill entries without distance) count toward run and time totals
/// but not toward the pace weighting.
///
/// Returns at most `num_weeks` entries, most recent week first.
pub fn calculate_weekly_stats(activities: &[GarminActivity], num_weeks: usize) -> Vec<WeeklyStat> {
    let mut weeks: HashMap<NaiveDate, WeekTotals> = HashMap::new();

    for activity in activities.iter().filter(|a| is_running_activity(a)) {
        // Local start time preferred; activities with no usable
        // timestamp cannot be bucketed and are dropped.
        let Some(date) = activity.start_date() else {
            continue;
        };
        let week = weeks.entry(week_start_monday(date)).or_default();

        // Missing distance/duration zero-default rather than erroring.
        let distance_km = activity.distance.unwrap_or(0.0) / 1000.0;
        let duration_minutes =
            activity.duration.or(activity.moving_duration).unwrap_or(0.0) / 60.0;

        week.distance_km += distance_km;
        week.runs += 1;
        week.time_minutes += duration_minutes;

        if distance_km > 0.0 {
            let pace_min_per_km = duration_minutes / distance_km;
            week.weighted_pace += pace_min_per_km * distance_km;
        }
    }

    let mut results: Vec<WeeklyStat> = weeks
        .into_iter()
        .map(|(week_start, totals)| {
            let avg_pace = if totals.distance_km > 0.0 {
                totals.weighted_pace / totals.distance_km
            } else {
                0.0
            };

            WeeklyStat {
                week_start: format_date(week_start),
                total_distance_km: round1(totals.distance_km),
                total_runs: totals.runs,
                avg_pace_min_km: round2(avg_pace),
                total_time_minutes: totals.time_minutes.round() as i64,
            }
        })
        .collect();

    // Most recent week first; YYYY-MM-DD keys sort lexicographically.
    results.sort_by(|a, b| b.week_start.cmp(&a.week_start));
    results.truncate(num_weeks);
    results
}

/// Date range covering the last `num_weeks` weeks, ending now.
pub fn activity_date_range(num_weeks: usize, now: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
    let end = now.date_naive();
    let start = end - Duration::days(7 * num_weeks as i64);
    (start, end)
}

/// Round to 1 decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to 2 decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl GarminActivity {
    /// Activity type key, empty string if untyped.
    pub fn type_key(&self) -> &str {
        self.activity_type
            .as_ref()
            .map(|t| t.type_key.as_str())
            .unwrap_or("")
    }

    /// Calendar date of the activity start, local time preferred.
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_time_local
            .as_deref()
            .or(self.start_time_gmt.as_deref())
            .and_then(parse_activity_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::garmin::GarminActivityType;

    fn make_activity(
        type_key: &str,
        start: &str,
        distance_m: f64,
        duration_s: f64,
    ) -> GarminActivity {
        GarminActivity {
            activity_id: None,
            activity_name: Some(format!("Test {}", type_key)),
            activity_type: Some(GarminActivityType {
                type_key: type_key.to_string(),
            }),
            start_time_local: Some(start.to_string()),
            start_time_gmt: None,
            distance: Some(distance_m),
            duration: Some(duration_s),
            moving_duration: None,
        }
    }

    #[test]
    fn test_weighted_pace_scenario() {
        // 10 km in 50 min (5:00/km) + 5 km in 30 min (6:00/km), same Monday.
        // Weighted pace = (5.0*10 + 6.0*5) / 15 = 5.33
        let activities = vec![
            make_activity("running", "2024-01-15 08:00:00", 10000.0, 3000.0),
            make_activity("running", "2024-01-15 17:00:00", 5000.0, 1800.0),
        ];

        let stats = calculate_weekly_stats(&activities, 8);

        assert_eq!(stats.len(), 1);
        let week = &stats[0];
        assert_eq!(week.week_start, "2024-01-15");
        assert_eq!(week.total_distance_km, 15.0);
        assert_eq!(week.total_runs, 2);
        assert_eq!(week.total_time_minutes, 80);
        assert_eq!(week.avg_pace_min_km, 5.33);
    }

    #[test]
    fn test_non_running_activities_excluded() {
        let activities = vec![
            make_activity("running", "2024-01-15 08:00:00", 10000.0, 3000.0),
            make_activity("cycling", "2024-01-15 09:00:00", 40000.0, 5400.0),
            make_activity("lap_swimming", "2024-01-16 07:00:00", 2000.0, 2400.0),
        ];

        let stats = calculate_weekly_stats(&activities, 8);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].total_runs, 1);
        assert_eq!(stats[0].total_distance_km, 10.0);
    }

    #[test]
    fn test_running_family_variants_included() {
        let activities = vec![
            make_activity("trail_running", "2024-01-15 08:00:00", 8000.0, 3000.0),
            make_activity("treadmill_running", "2024-01-16 08:00:00", 5000.0, 1500.0),
            make_activity("track_running", "2024-01-17 08:00:00", 3000.0, 720.0),
            make_activity("indoor_running", "2024-01-18 08:00:00", 4000.0, 1200.0),
        ];

        let stats = calculate_weekly_stats(&activities, 8);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].total_runs, 4);
    }

    #[test]
    fn test_untyped_activity_excluded() {
        let mut activity = make_activity("running", "2024-01-15 08:00:00", 5000.0, 1500.0);
        activity.activity_type = None;

        assert!(calculate_weekly_stats(&[activity], 8).is_empty());
    }

    #[test]
    fn test_weeks_bucket_on_monday() {
        // Sunday 2024-01-14 belongs to the week of Monday 2024-01-08;
        // Monday 2024-01-15 starts a new week.
        let activities = vec![
            make_activity("running", "2024-01-14 08:00:00", 10000.0, 3000.0),
            make_activity("running", "2024-01-15 08:00:00", 10000.0, 3000.0),
        ];

        let stats = calculate_weekly_stats(&activities, 8);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].week_start, "2024-01-15");
        assert_eq!(stats[1].week_start, "2024-01-08");
    }

    #[test]
    fn test_sorted_descending_and_truncated() {
        let first_monday = NaiveDate::from_ymd_opt(2024, 2, 5).unwrap();
        let activities: Vec<GarminActivity> = (0..6)
            .map(|i| {
                let monday = first_monday + Duration::weeks(i);
                make_activity(
                    "running",
                    &format!("{} 08:00:00", format_date(monday)),
                    10000.0,
                    3000.0,
                )
            })
            .collect();

        let stats = calculate_weekly_stats(&activities, 4);

        assert_eq!(stats.len(), 4);
        for pair in stats.windows(2) {
            assert!(pair[0].week_start > pair[1].week_start);
        }
        assert_eq!(stats[0].week_start, "2024-03-11");
    }

    #[test]
    fn test_zero_distance_week_has_zero_pace() {
        let activities = vec![
            make_activity("treadmill_running", "2024-01-15 08:00:00", 0.0, 1800.0),
            make_activity("treadmill_running", "2024-01-16 08:00:00", 0.0, 2400.0),
        ];

        let stats = calculate_weekly_stats(&activities, 8);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].total_runs, 2);
        assert_eq!(stats[0].avg_pace_min_km, 0.0);
        assert_eq!(stats[0].total_time_minutes, 70);
    }

    #[test]
    fn test_zero_distance_run_does_not_skew_pace() {
        // The distance-less treadmill entry adds a run and 30 minutes but
        // must leave the weighted pace untouched.
        let activities = vec![
            make_activity("running", "2024-01-15 08:00:00", 10000.0, 3000.0),
            make_activity("treadmill_running", "2024-01-16 08:00:00", 0.0, 1800.0),
        ];

        let stats = calculate_weekly_stats(&activities, 8);

        assert_eq!(stats[0].total_runs, 2);
        assert_eq!(stats[0].avg_pace_min_km, 5.0);
        assert_eq!(stats[0].total_time_minutes, 80);
    }

    #[test]
    fn test_missing_fields_zero_default() {
        let activity = GarminActivity {
            activity_id: None,
            activity_name: None,
            activity_type: Some(GarminActivityType {
                type_key: "running".to_string(),
            }),
            start_time_local: Some("2024-01-15 08:00:00".to_string()),
            start_time_gmt: None,
            distance: None,
            duration: None,
            moving_duration: None,
        };

        let stats = calculate_weekly_stats(&[activity], 8);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].total_runs, 1);
        assert_eq!(stats[0].total_distance_km, 0.0);
        assert_eq!(stats[0].total_time_minutes, 0);
    }

    #[test]
    fn test_moving_duration_fallback() {
        let mut activity = make_activity("running", "2024-01-15 08:00:00", 5000.0, 0.0);
        activity.duration = None;
        activity.moving_duration = Some(1500.0);

        let stats = calculate_weekly_stats(&[activity], 8);

        assert_eq!(stats[0].total_time_minutes, 25);
        assert_eq!(stats[0].avg_pace_min_km, 5.0);
    }

    #[test]
    fn test_gmt_fallback_when_local_missing() {
        let mut activity = make_activity("running", "2024-01-15 08:00:00", 5000.0, 1500.0);
        activity.start_time_local = None;
        activity.start_time_gmt = Some("2024-01-15T07:00:00.000Z".to_string());

        let stats = calculate_weekly_stats(&[activity], 8);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].week_start, "2024-01-15");
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert!(calculate_weekly_stats(&[], 8).is_empty());
        assert!(calculate_weekly_stats(&[], 0).is_empty());
    }

    #[test]
    fn test_activity_date_range_spans_requested_weeks() {
        let now = DateTime::parse_from_rfc3339("2024-03-04T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let (start, end) = activity_date_range(8, now);

        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
    }
}
