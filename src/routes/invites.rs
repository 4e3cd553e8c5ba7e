// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Athlete invite routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Invite;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Invites expire after 7 days.
const INVITE_TTL_DAYS: i64 = 7;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/invites", post(create_invite))
        .route("/api/invites", get(list_invites))
        .route("/api/invites/{id}", delete(delete_invite))
}

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/invites/verify/{token}", get(verify_invite))
}

/// Whether an invite's expiry has passed. Unparseable expiry counts as
/// expired rather than immortal.
pub(crate) fn invite_expired(invite: &Invite, now: DateTime<Utc>) -> bool {
    DateTime::parse_from_rfc3339(&invite.expires_at)
        .map(|expires_at| expires_at.with_timezone(&Utc) <= now)
        .unwrap_or(true)
}

// ─── Requests / Responses ────────────────────────────────────

#[derive(Deserialize, Validate)]
struct CreateInviteRequest {
    #[validate(email(message = "Invalid email address"))]
    email: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct InviteResponse {
    pub id: String,
    pub email: String,
    pub token: String,
    pub used: bool,
    pub created_at: String,
    pub expires_at: String,
}

impl From<Invite> for InviteResponse {
    fn from(invite: Invite) -> Self {
        Self {
            id: invite.id,
            email: invite.email,
            token: invite.token,
            used: invite.used,
            created_at: invite.created_at,
            expires_at: invite.expires_at,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreateInviteResponse {
    pub id: String,
    pub email: String,
    pub token: String,
    pub expires_at: String,
    pub invite_url: String,
}

#[derive(Serialize)]
pub struct VerifyInviteResponse {
    pub email: String,
    pub coach_name: String,
    pub expires_at: String,
}

// ─── Handlers ────────────────────────────────────────────────

/// Create an invite (coach only).
async fn create_invite(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateInviteRequest>,
) -> Result<(StatusCode, Json<CreateInviteResponse>)> {
    if !user.is_coach() {
        return Err(AppError::Forbidden);
    }
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if state.db.get_user_by_email(&req.email).await?.is_some() {
        return Err(AppError::BadRequest(
            "User with this email already exists".to_string(),
        ));
    }

    let now = Utc::now();
    if let Some(existing) = state.db.get_open_invite(&user.user_id, &req.email).await? {
        if !invite_expired(&existing, now) {
            return Err(AppError::BadRequest(
                "Invite already sent to this email".to_string(),
            ));
        }
    }

    let invite = Invite {
        id: uuid::Uuid::new_v4().to_string(),
        coach_id: user.user_id.clone(),
        email: req.email,
        token: uuid::Uuid::new_v4().to_string(),
        used: false,
        created_at: format_utc_rfc3339(now),
        expires_at: format_utc_rfc3339(now + Duration::days(INVITE_TTL_DAYS)),
    };
    state.db.upsert_invite(&invite).await?;

    let invite_url = format!(
        "{}/register?invite={}",
        state.config.frontend_url, invite.token
    );

    tracing::info!(invite_id = %invite.id, coach_id = %user.user_id, "Invite created");
    Ok((
        StatusCode::CREATED,
        Json(CreateInviteResponse {
            id: invite.id,
            email: invite.email,
            token: invite.token,
            expires_at: invite.expires_at,
            invite_url,
        }),
    ))
}

/// List the coach's invites, newest first.
async fn list_invites(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<InviteResponse>>> {
    if !user.is_coach() {
        return Err(AppError::Forbidden);
    }

    let invites = state.db.list_invites(&user.user_id).await?;
    Ok(Json(invites.into_iter().map(Into::into).collect()))
}

/// Verify an invite token (public, used by the registration page).
async fn verify_invite(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<VerifyInviteResponse>> {
    let invite = state
        .db
        .get_invite_by_token(&token)
        .await?
        .filter(|invite| !invite.used && !invite_expired(invite, Utc::now()))
        .ok_or_else(|| AppError::NotFound("Invalid or expired invite".to_string()))?;

    let coach_name = state
        .db
        .get_user(&invite.coach_id)
        .await?
        .map(|coach| coach.name)
        .unwrap_or_default();

    Ok(Json(VerifyInviteResponse {
        email: invite.email,
        coach_name,
        expires_at: invite.expires_at,
    }))
}

#[derive(Serialize)]
struct DeleteInviteResponse {
    message: String,
}

/// Delete an invite (coach only, own invites).
async fn delete_invite(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(invite_id): Path<String>,
) -> Result<Json<DeleteInviteResponse>> {
    if !user.is_coach() {
        return Err(AppError::Forbidden);
    }

    let exists = state
        .db
        .get_invite(&invite_id)
        .await?
        .is_some_and(|invite| invite.coach_id == user.user_id);
    if !exists {
        return Err(AppError::NotFound("Invite not found".to_string()));
    }

    state.db.delete_invite(&invite_id).await?;
    Ok(Json(DeleteInviteResponse {
        message: "Invite deleted".to_string(),
    }))
}
