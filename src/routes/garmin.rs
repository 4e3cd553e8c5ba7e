// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Garmin integration routes.
//!
//! Thin handlers over `GarminService`: the session lifecycle, activity
//! fetching, and weekly stats refresh all live in the service layer.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::WeeklyStatRow;
use crate::services::garmin::{ConnectionStatus, GarminActivity, DEFAULT_STATS_WEEKS};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Weekly stats page size for the dashboard chart.
const WEEKLY_STATS_LIMIT: u32 = 8;

/// Default activity window when no range is given (last 30 days).
const DEFAULT_ACTIVITY_WINDOW_DAYS: i64 = 30;

const DEFAULT_ACTIVITY_LIMIT: usize = 50;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/garmin/status", get(get_status))
        .route("/api/garmin/connect", post(connect))
        .route("/api/garmin/disconnect", post(disconnect))
        .route("/api/garmin/stats/weekly", get(get_weekly_stats))
        .route("/api/garmin/activities", get(get_activities))
        .route("/api/garmin/refresh", post(refresh))
}

// ─── Requests / Responses ────────────────────────────────────

#[derive(Deserialize, Validate)]
struct ConnectRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ConnectResponse {
    pub connected: bool,
    pub garmin_user_id: String,
    pub message: String,
    pub stats_count: usize,
}

#[derive(Deserialize)]
struct WeeklyStatsQuery {
    athlete_id: Option<String>,
}

#[derive(Deserialize)]
struct ActivitiesQuery {
    start_date: Option<String>,
    end_date: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
pub struct ActivitiesResponse {
    pub activities: Vec<GarminActivity>,
    pub count: usize,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RefreshResponse {
    pub message: String,
    pub stats_count: usize,
}

// ─── Handlers ────────────────────────────────────────────────

/// Get Garmin connection status.
async fn get_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ConnectionStatus>> {
    Ok(Json(
        state.garmin_service.connection_status(&user.user_id).await?,
    ))
}

/// Connect a Garmin account with username/password.
///
/// On success, seeds the athlete's weekly stats with an initial refresh.
async fn connect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ConnectRequest>,
) -> Result<Json<ConnectResponse>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let garmin_user_id = state
        .garmin_service
        .connect(&user.user_id, &req.username, &req.password)
        .await?;

    // Seed initial stats; a refresh failure leaves the connection intact.
    let stats_count = match state
        .garmin_service
        .refresh_stats(&user.user_id, DEFAULT_STATS_WEEKS)
        .await
    {
        Ok(stats) => stats.len(),
        Err(e) => {
            tracing::warn!(
                user_id = %user.user_id,
                error = %e,
                "Initial stats refresh failed, continuing"
            );
            0
        }
    };

    Ok(Json(ConnectResponse {
        connected: true,
        garmin_user_id,
        message: "Garmin connected successfully".to_string(),
        stats_count,
    }))
}

/// Disconnect Garmin and remove all stored connection state.
async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MessageResponse>> {
    state.garmin_service.disconnect(&user.user_id).await?;
    Ok(Json(MessageResponse {
        message: "Garmin disconnected".to_string(),
    }))
}

/// Get stored weekly stats. Athletes may only read their own.
async fn get_weekly_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<WeeklyStatsQuery>,
) -> Result<Json<Vec<WeeklyStatRow>>> {
    let athlete_id = query.athlete_id.unwrap_or_else(|| user.user_id.clone());

    if !user.is_coach() && athlete_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    Ok(Json(
        state
            .db
            .list_weekly_stats(&athlete_id, WEEKLY_STATS_LIMIT)
            .await?,
    ))
}

/// Fetch activities from Garmin for a date range.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ActivitiesQuery>,
) -> Result<Json<ActivitiesResponse>> {
    let today = Utc::now().date_naive();
    let start = parse_query_date(query.start_date.as_deref())?
        .unwrap_or(today - Duration::days(DEFAULT_ACTIVITY_WINDOW_DAYS));
    let end = parse_query_date(query.end_date.as_deref())?.unwrap_or(today);

    let activities = state
        .garmin_service
        .fetch_activities(&user.user_id, start, end)
        .await?;

    let count = activities.len();
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    let activities = activities.into_iter().take(limit).collect();

    Ok(Json(ActivitiesResponse { activities, count }))
}

/// Refresh weekly stats from Garmin (replace-all).
async fn refresh(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<RefreshResponse>> {
    let status = state.garmin_service.connection_status(&user.user_id).await?;
    if !status.connected {
        return Err(AppError::NotConnected);
    }

    let stats = state
        .garmin_service
        .refresh_stats(&user.user_id, DEFAULT_STATS_WEEKS)
        .await?;

    Ok(Json(RefreshResponse {
        message: "Stats refreshed from Garmin".to_string(),
        stats_count: stats.len(),
    }))
}

/// Parse an optional YYYY-MM-DD query date.
fn parse_query_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(|value| {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| AppError::BadRequest("Dates must be YYYY-MM-DD".to_string()))
    })
    .transpose()
}
