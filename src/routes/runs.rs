// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduled run routes.
//!
//! Coaches create, edit, and delete runs on their athletes' calendars.
//! Athletes see their own runs and may only toggle completion.

use crate::db::firestore::RunFilter;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Run;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/runs", get(list_runs))
        .route("/api/runs", post(create_run))
        .route("/api/runs/{id}", get(get_run))
        .route("/api/runs/{id}", put(update_run))
        .route("/api/runs/{id}", delete(delete_run))
}

// ─── Requests ────────────────────────────────────────────────

#[derive(Deserialize)]
struct RunsQuery {
    start_date: Option<String>,
    end_date: Option<String>,
    athlete_id: Option<String>,
}

#[derive(Deserialize, Validate)]
struct CreateRunRequest {
    athlete_id: String,
    date: String,
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    title: String,
    run_type: Option<String>,
    distance_km: Option<f64>,
    notes: Option<String>,
}

#[derive(Deserialize)]
struct UpdateRunRequest {
    date: Option<String>,
    title: Option<String>,
    run_type: Option<String>,
    distance_km: Option<f64>,
    notes: Option<String>,
    completed: Option<bool>,
}

/// Reject anything that is not a calendar date (YYYY-MM-DD).
fn validate_run_date(raw: &str) -> Result<()> {
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| AppError::BadRequest("Date must be YYYY-MM-DD".to_string()))
}

// ─── Handlers ────────────────────────────────────────────────

/// List runs. Coaches see their athletes' runs, athletes only their own.
async fn list_runs(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<Vec<Run>>> {
    for date in [&query.start_date, &query.end_date].into_iter().flatten() {
        validate_run_date(date)?;
    }

    let filter = if user.is_coach() {
        match query.athlete_id {
            Some(athlete_id) => RunFilter {
                athlete_id: Some(athlete_id),
                start_date: query.start_date,
                end_date: query.end_date,
                ..Default::default()
            },
            None => RunFilter {
                coach_id: Some(user.user_id),
                start_date: query.start_date,
                end_date: query.end_date,
                ..Default::default()
            },
        }
    } else {
        RunFilter {
            athlete_id: Some(user.user_id),
            start_date: query.start_date,
            end_date: query.end_date,
            ..Default::default()
        }
    };

    Ok(Json(state.db.list_runs(&filter).await?))
}

/// Get a single run.
async fn get_run(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(run_id): Path<String>,
) -> Result<Json<Run>> {
    let run = state
        .db
        .get_run(&run_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Run not found".to_string()))?;

    if !user.is_coach() && run.athlete_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    Ok(Json(run))
}

/// Create a run (coach only).
async fn create_run(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateRunRequest>,
) -> Result<(StatusCode, Json<Run>)> {
    if !user.is_coach() {
        return Err(AppError::Forbidden);
    }
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    validate_run_date(&req.date)?;

    let athlete = state
        .db
        .get_user(&req.athlete_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Athlete not found".to_string()))?;

    let run = Run {
        id: uuid::Uuid::new_v4().to_string(),
        athlete_id: req.athlete_id,
        coach_id: user.user_id,
        athlete_name: athlete.name,
        date: req.date,
        title: req.title,
        run_type: req.run_type.unwrap_or_else(|| "easy".to_string()),
        distance_km: req.distance_km,
        notes: req.notes,
        completed: false,
        created_at: format_utc_rfc3339(chrono::Utc::now()),
    };
    state.db.upsert_run(&run).await?;

    tracing::info!(run_id = %run.id, athlete_id = %run.athlete_id, "Run created");
    Ok((StatusCode::CREATED, Json(run)))
}

/// Update a run.
///
/// Athletes may only toggle completion on their own runs; coaches may
/// change any field.
async fn update_run(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(run_id): Path<String>,
    Json(req): Json<UpdateRunRequest>,
) -> Result<Json<Run>> {
    let mut run = state
        .db
        .get_run(&run_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Run not found".to_string()))?;

    if !user.is_coach() {
        if run.athlete_id != user.user_id {
            return Err(AppError::Forbidden);
        }
        if let Some(completed) = req.completed {
            run.completed = completed;
            state.db.upsert_run(&run).await?;
        }
        return Ok(Json(run));
    }

    if let Some(date) = req.date {
        validate_run_date(&date)?;
        run.date = date;
    }
    if let Some(title) = req.title {
        run.title = title;
    }
    if let Some(run_type) = req.run_type {
        run.run_type = run_type;
    }
    if let Some(distance_km) = req.distance_km {
        run.distance_km = Some(distance_km);
    }
    if let Some(notes) = req.notes {
        run.notes = Some(notes);
    }
    if let Some(completed) = req.completed {
        run.completed = completed;
    }
    state.db.upsert_run(&run).await?;

    Ok(Json(run))
}

#[derive(serde::Serialize)]
struct DeleteRunResponse {
    message: String,
}

/// Delete a run (coach only).
async fn delete_run(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(run_id): Path<String>,
) -> Result<Json<DeleteRunResponse>> {
    if !user.is_coach() {
        return Err(AppError::Forbidden);
    }

    if state.db.get_run(&run_id).await?.is_none() {
        return Err(AppError::NotFound("Run not found".to_string()));
    }

    state.db.delete_run(&run_id).await?;
    Ok(Json(DeleteRunResponse {
        message: "Run deleted".to_string(),
    }))
}
