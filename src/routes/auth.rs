// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration and login routes.
//!
//! Coaches self-register; athletes register with an invite token from
//! their coach. Sessions are JWTs delivered both as an HttpOnly cookie
//! and in the response body (for non-browser clients).

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser, SESSION_COOKIE};
use crate::models::{Role, User};
use crate::routes::invites::invite_expired;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register_coach))
        .route("/api/auth/register/athlete", post(register_athlete))
        .route("/api/auth/login", post(login))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/me", get(get_me))
        .route("/api/auth/logout", post(logout))
}

// ─── Requests / Responses ────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    password: String,
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    name: String,
}

#[derive(Deserialize, Validate)]
pub struct RegisterAthleteRequest {
    #[validate(email(message = "Invalid email address"))]
    email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    password: String,
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    name: String,
    invite_token: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

/// User profile in API responses (never includes the password hash).
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub coach_id: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role.as_str().to_string(),
            coach_id: user.coach_id,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

// ─── Handlers ────────────────────────────────────────────────

/// Register a new coach account.
async fn register_coach(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>)> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if state.db.get_user_by_email(&req.email).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: req.email,
        password_hash: hash_password(&req.password)?,
        name: req.name,
        role: Role::Coach,
        coach_id: None,
        created_at: format_utc_rfc3339(chrono::Utc::now()),
    };
    state.db.upsert_user(&user).await?;

    tracing::info!(user_id = %user.id, "Coach registered");
    issue_session(&state, jar, user, StatusCode::CREATED)
}

/// Register a new athlete account using an invite token.
async fn register_athlete(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<RegisterAthleteRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>)> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let now = chrono::Utc::now();
    let mut invite = state
        .db
        .get_invite_by_token(&req.invite_token)
        .await?
        .filter(|invite| !invite.used && !invite_expired(invite, now))
        .ok_or_else(|| AppError::BadRequest("Invalid or expired invite".to_string()))?;

    if invite.email != req.email {
        return Err(AppError::BadRequest(
            "Email does not match invite".to_string(),
        ));
    }

    if state.db.get_user_by_email(&req.email).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: req.email,
        password_hash: hash_password(&req.password)?,
        name: req.name,
        role: Role::Athlete,
        coach_id: Some(invite.coach_id.clone()),
        created_at: format_utc_rfc3339(now),
    };
    state.db.upsert_user(&user).await?;

    // Invites are single-use
    invite.used = true;
    state.db.upsert_invite(&invite).await?;

    tracing::info!(user_id = %user.id, coach_id = %invite.coach_id, "Athlete registered");
    issue_session(&state, jar, user, StatusCode::CREATED)
}

/// Log in with email and password.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>)> {
    let user = state
        .db
        .get_user_by_email(&req.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let valid = bcrypt::verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password verification failed: {}", e)))?;
    if !valid {
        return Err(AppError::InvalidCredentials);
    }

    issue_session(&state, jar, user, StatusCode::OK)
}

/// Get the current user's profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(profile.into()))
}

#[derive(Serialize)]
struct LogoutResponse {
    message: String,
}

/// Clear the session cookie.
async fn logout(jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());
    (
        jar,
        Json(LogoutResponse {
            message: "Logged out".to_string(),
        }),
    )
}

// ─── Helpers ─────────────────────────────────────────────────

fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))
}

/// Issue a JWT as both cookie and body token.
fn issue_session(
    state: &AppState,
    jar: CookieJar,
    user: User,
    status: StatusCode,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>)> {
    let token = create_jwt(&user.id, user.role, &state.config.jwt_signing_key)?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(7))
        .build();

    Ok((
        status,
        jar.add(cookie),
        Json(AuthResponse {
            user: user.into(),
            token,
        }),
    ))
}
