// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Athlete roster routes for coaches.

use crate::db::firestore::RunFilter;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Role, Run, WeeklyStatRow};
use crate::time_utils::format_date;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Extension, Json, Router,
};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Weekly stats shown on the athlete detail view.
const DETAIL_STATS_WEEKS: u32 = 4;
/// Upcoming runs shown on the athlete detail view.
const DETAIL_UPCOMING_RUNS: u32 = 7;

const MAX_CONCURRENT_SUMMARIES: usize = 8;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/athletes", get(list_athletes))
        .route("/api/athletes/{id}", get(get_athlete))
        .route("/api/athletes/{id}", delete(remove_athlete))
}

// ─── Responses ───────────────────────────────────────────────

/// Roster entry with per-athlete progress counters.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AthleteSummary {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: String,
    pub garmin_connected: bool,
    pub completed_runs: u32,
    pub total_runs: u32,
}

/// Athlete detail with recent stats and upcoming schedule.
#[derive(Serialize)]
pub struct AthleteDetail {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: String,
    pub coach_id: Option<String>,
    pub garmin_connected: bool,
    pub weekly_stats: Vec<WeeklyStatRow>,
    pub upcoming_runs: Vec<Run>,
}

// ─── Handlers ────────────────────────────────────────────────

/// List a coach's athletes with progress counters.
async fn list_athletes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<AthleteSummary>>> {
    if !user.is_coach() {
        return Err(AppError::Forbidden);
    }

    let athletes = state.db.list_athletes(&user.user_id).await?;

    // Enrich each athlete concurrently; `buffered` keeps name order.
    let db = state.db.clone();
    let summaries: Vec<AthleteSummary> = stream::iter(athletes)
        .map(|athlete| {
            let db = db.clone();
            async move {
                let garmin_connected =
                    db.get_garmin_connection(&athlete.id).await?.is_some();
                let runs = db
                    .list_runs(&RunFilter {
                        athlete_id: Some(athlete.id.clone()),
                        ..Default::default()
                    })
                    .await?;

                Ok::<_, AppError>(AthleteSummary {
                    id: athlete.id,
                    email: athlete.email,
                    name: athlete.name,
                    created_at: athlete.created_at,
                    garmin_connected,
                    completed_runs: runs.iter().filter(|run| run.completed).count() as u32,
                    total_runs: runs.len() as u32,
                })
            }
        })
        .buffered(MAX_CONCURRENT_SUMMARIES)
        .collect::<Vec<Result<AthleteSummary>>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    Ok(Json(summaries))
}

/// Get a single athlete with recent weekly stats and upcoming runs.
async fn get_athlete(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(athlete_id): Path<String>,
) -> Result<Json<AthleteDetail>> {
    if !user.is_coach() && user.user_id != athlete_id {
        return Err(AppError::Forbidden);
    }

    let athlete = state
        .db
        .get_user(&athlete_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Athlete not found".to_string()))?;

    let garmin_connected = state
        .db
        .get_garmin_connection(&athlete.id)
        .await?
        .is_some();
    let weekly_stats = state
        .db
        .list_weekly_stats(&athlete.id, DETAIL_STATS_WEEKS)
        .await?;

    let today = format_date(chrono::Utc::now().date_naive());
    let upcoming_runs = state
        .db
        .list_upcoming_runs(&athlete.id, &today, DETAIL_UPCOMING_RUNS)
        .await?;

    Ok(Json(AthleteDetail {
        id: athlete.id,
        email: athlete.email,
        name: athlete.name,
        created_at: athlete.created_at,
        coach_id: athlete.coach_id,
        garmin_connected,
        weekly_stats,
        upcoming_runs,
    }))
}

#[derive(Serialize)]
struct RemoveAthleteResponse {
    message: String,
}

/// Remove an athlete from the coach's team.
///
/// Detaches the athlete rather than deleting the account; their runs and
/// stats stay with them.
async fn remove_athlete(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(athlete_id): Path<String>,
) -> Result<Json<RemoveAthleteResponse>> {
    if !user.is_coach() {
        return Err(AppError::Forbidden);
    }

    let mut athlete = state
        .db
        .get_user(&athlete_id)
        .await?
        .filter(|candidate| {
            candidate.role == Role::Athlete
                && candidate.coach_id.as_deref() == Some(user.user_id.as_str())
        })
        .ok_or_else(|| AppError::NotFound("Athlete not found".to_string()))?;

    athlete.coach_id = None;
    state.db.upsert_user(&athlete).await?;

    tracing::info!(athlete_id = %athlete.id, coach_id = %user.user_id, "Athlete removed from team");
    Ok(Json(RemoveAthleteResponse {
        message: "Athlete removed from team".to_string(),
    }))
}
