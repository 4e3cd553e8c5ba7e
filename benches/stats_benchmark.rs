use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stride_coach::services::garmin::{GarminActivity, GarminActivityType};
use stride_coach::services::stats::calculate_weekly_stats;

/// Build a deterministic season of activities: one per day, cycling
/// through sport types so roughly half survive the running filter.
fn synthetic_season(days: usize) -> Vec<GarminActivity> {
    const TYPES: [&str; 4] = ["running", "cycling", "trail_running", "lap_swimming"];
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    (0..days)
        .map(|i| {
            let date = start + Duration::days(i as i64);
            let distance_m = 5000.0 + (i % 20) as f64 * 750.0;

            GarminActivity {
                activity_id: Some(i as i64),
                activity_name: Some(format!("Session {}", i)),
                activity_type: Some(GarminActivityType {
                    type_key: TYPES[i % TYPES.len()].to_string(),
                }),
                start_time_local: Some(format!("{} 07:30:00", date.format("%Y-%m-%d"))),
                start_time_gmt: None,
                distance: Some(distance_m),
                duration: Some(distance_m * 0.32),
                moving_duration: None,
            }
        })
        .collect()
}

fn benchmark_weekly_aggregation(c: &mut Criterion) {
    let recent_page = synthetic_season(100);
    let full_season = synthetic_season(2000);

    let mut group = c.benchmark_group("weekly_aggregation");

    group.bench_function("recent_page_8_weeks", |b| {
        b.iter(|| calculate_weekly_stats(black_box(&recent_page), 8))
    });

    group.bench_function("full_season_52_weeks", |b| {
        b.iter(|| calculate_weekly_stats(black_box(&full_season), 52))
    });

    group.finish();
}

criterion_group!(benches, benchmark_weekly_aggregation);
criterion_main!(benches);
