// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Garmin Connect client and session lifecycle management.
//!
//! Handles:
//! - SSO login with username/password (no OAuth app flow exists for
//!   Garmin's consumer API)
//! - Session token validation and re-authentication fallback
//! - Activity list fetching
//! - Encrypted persistence of credentials and token artifacts

use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors surfaced by the remote provider, in the coarse categories the
/// session manager needs to classify.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Garmin rejected the credentials")]
    InvalidCredentials,

    #[error("Account requires multi-factor authentication")]
    MfaRequired,

    #[error("Garmin rate limit hit")]
    RateLimited,

    #[error("Garmin session is no longer valid")]
    SessionExpired,

    #[error("Malformed Garmin response: {0}")]
    Malformed(String),

    #[error("Garmin API error: {0}")]
    Api(String),
}

/// An authenticated Garmin session: two opaque renewable token artifacts.
///
/// The blobs are stored and replayed verbatim; only the OAuth2 artifact
/// is ever inspected (for the bearer access token).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarminSession {
    pub oauth1_token: Option<String>,
    pub oauth2_token: Option<String>,
}

/// Garmin-side user profile, fetched to verify a session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarminProfile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// A raw activity record from the Garmin activity list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarminActivity {
    pub activity_id: Option<i64>,
    pub activity_name: Option<String>,
    #[serde(default)]
    pub activity_type: Option<GarminActivityType>,
    pub start_time_local: Option<String>,
    #[serde(rename = "startTimeGMT")]
    pub start_time_gmt: Option<String>,
    /// Distance in meters
    #[serde(default)]
    pub distance: Option<f64>,
    /// Elapsed duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    /// Moving duration in seconds
    #[serde(default)]
    pub moving_duration: Option<f64>,
}

/// Activity type descriptor (`{"typeKey": "trail_running", ...}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarminActivityType {
    #[serde(rename = "typeKey")]
    pub type_key: String,
}

/// Capability interface over the remote provider.
///
/// The live implementation is [`GarminConnectClient`]; demo mode and
/// tests substitute [`crate::services::garmin_mock::MockGarminApi`].
#[async_trait]
pub trait GarminApi: Send + Sync {
    /// Authenticate with username/password, returning session tokens.
    async fn login(&self, username: &str, password: &str)
        -> Result<GarminSession, ProviderError>;

    /// Cheap "who am I" probe that verifies the session tokens.
    async fn validate_session(
        &self,
        session: &GarminSession,
    ) -> Result<GarminProfile, ProviderError>;

    /// Fetch the most recent activities (no range query exists).
    async fn list_recent_activities(
        &self,
        session: &GarminSession,
        limit: u32,
    ) -> Result<Vec<GarminActivity>, ProviderError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// GarminConnectClient - live HTTP implementation
// ─────────────────────────────────────────────────────────────────────────────

/// User agent expected by the Garmin SSO endpoints.
const GARMIN_USER_AGENT: &str = "com.garmin.android.apps.connectmobile";

/// Garmin Connect API client.
#[derive(Clone)]
pub struct GarminConnectClient {
    http: reqwest::Client,
    sso_base: String,
    api_base: String,
}

impl Default for GarminConnectClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GarminConnectClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            sso_base: "https://sso.garmin.com/sso".to_string(),
            api_base: "https://connectapi.garmin.com".to_string(),
        }
    }

    /// Bearer access token from the OAuth2 artifact.
    fn access_token(session: &GarminSession) -> Result<String, ProviderError> {
        let raw = session
            .oauth2_token
            .as_deref()
            .ok_or(ProviderError::SessionExpired)?;

        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| ProviderError::Malformed(format!("OAuth2 artifact: {}", e)))?;

        value
            .get("access_token")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Malformed("OAuth2 artifact has no access_token".to_string()))
    }

    /// Check response status and classify failures.
    async fn check_response(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status.as_u16() == 429 {
            tracing::warn!("Garmin rate limit hit (429)");
            return Err(ProviderError::RateLimited);
        }

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::SessionExpired);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Api(format!("HTTP {}: {}", status, body)))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        self.check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl GarminApi for GarminConnectClient {
    async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<GarminSession, ProviderError> {
        let signin_url = format!("{}/signin", self.sso_base);
        let widget_params = [
            ("id", "gauth-widget"),
            ("embedWidget", "true"),
            ("gauthHost", self.sso_base.as_str()),
        ];

        // 1. Prime the signin form to obtain a CSRF token.
        let page = self
            .http
            .get(&signin_url)
            .query(&widget_params)
            .header(reqwest::header::USER_AGENT, GARMIN_USER_AGENT)
            .send()
            .await
            .map_err(|e| ProviderError::Api(format!("SSO request failed: {}", e)))?;
        let page = self.check_response(page).await?.text().await.unwrap_or_default();

        let csrf = extract_between(&page, "name=\"_csrf\" value=\"", "\"")
            .ok_or_else(|| ProviderError::Malformed("CSRF token not found".to_string()))?;

        // 2. Submit credentials.
        let response = self
            .http
            .post(&signin_url)
            .query(&widget_params)
            .header(reqwest::header::USER_AGENT, GARMIN_USER_AGENT)
            .header(reqwest::header::REFERER, &signin_url)
            .form(&[
                ("username", username),
                ("password", password),
                ("embed", "true"),
                ("_csrf", csrf.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Api(format!("SSO signin failed: {}", e)))?;

        if response.status().as_u16() == 429 {
            tracing::warn!("Garmin rate limit hit (429)");
            return Err(ProviderError::RateLimited);
        }

        let body = response.text().await.unwrap_or_default();

        if body.contains("MFA") || body.contains("verification code") {
            return Err(ProviderError::MfaRequired);
        }

        // A successful signin embeds a one-time service ticket; its absence
        // means the credentials were rejected.
        let ticket = extract_between(&body, "ticket=", "\"")
            .ok_or(ProviderError::InvalidCredentials)?;

        // 3. Exchange the ticket for the OAuth1 artifact.
        let response = self
            .http
            .post(format!("{}/oauth-service/oauth/preauthorized", self.api_base))
            .query(&[
                ("ticket", ticket.as_str()),
                ("login-url", signin_url.as_str()),
                ("accepts-mfa-tokens", "true"),
            ])
            .header(reqwest::header::USER_AGENT, GARMIN_USER_AGENT)
            .send()
            .await
            .map_err(|e| ProviderError::Api(format!("OAuth1 exchange failed: {}", e)))?;
        let oauth1: serde_json::Value = self.check_response_json(response).await?;

        // 4. Upgrade to the OAuth2 bearer used by the data APIs.
        let response = self
            .http
            .post(format!(
                "{}/oauth-service/oauth/exchange/user/2.0",
                self.api_base
            ))
            .header(reqwest::header::USER_AGENT, GARMIN_USER_AGENT)
            .json(&oauth1)
            .send()
            .await
            .map_err(|e| ProviderError::Api(format!("OAuth2 exchange failed: {}", e)))?;
        let oauth2: serde_json::Value = self.check_response_json(response).await?;

        Ok(GarminSession {
            oauth1_token: Some(oauth1.to_string()),
            oauth2_token: Some(oauth2.to_string()),
        })
    }

    async fn validate_session(
        &self,
        session: &GarminSession,
    ) -> Result<GarminProfile, ProviderError> {
        let access_token = Self::access_token(session)?;

        let response = self
            .http
            .get(format!("{}/userprofile-service/socialProfile", self.api_base))
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, GARMIN_USER_AGENT)
            .send()
            .await
            .map_err(|e| ProviderError::Api(format!("Profile request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    async fn list_recent_activities(
        &self,
        session: &GarminSession,
        limit: u32,
    ) -> Result<Vec<GarminActivity>, ProviderError> {
        let access_token = Self::access_token(session)?;
        let limit = limit.to_string();

        let response = self
            .http
            .get(format!(
                "{}/activitylist-service/activities/search/activities",
                self.api_base
            ))
            .query(&[("start", "0"), ("limit", limit.as_str())])
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, GARMIN_USER_AGENT)
            .send()
            .await
            .map_err(|e| ProviderError::Api(format!("Activity list request failed: {}", e)))?;

        self.check_response_json(response).await
    }
}

/// Extract the substring between `start` and the next occurrence of `end`.
fn extract_between(haystack: &str, start: &str, end: &str) -> Option<String> {
    let from = haystack.find(start)? + start.len();
    let rest = &haystack[from..];
    let to = rest.find(end)?;
    Some(rest[..to].to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// GarminService - session lifecycle and stats orchestration
// ─────────────────────────────────────────────────────────────────────────────

use crate::db::FirestoreDb;
use crate::models::{GarminConnection, WeeklyStatRow};
use crate::services::garmin_mock::generate_mock_weekly_stats;
use crate::services::stats::{activity_date_range, calculate_weekly_stats};
use crate::services::vault::{decrypt_credentials, encrypt_credentials, VaultService};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// How long a cached session is trusted before rehydration (30 minutes).
const SESSION_CACHE_WINDOW_SECS: i64 = 30 * 60;

/// Page size for activity fetches. Garmin has no true range query, so we
/// pull the most recent page and filter locally.
const ACTIVITY_FETCH_LIMIT: u32 = 100;

/// Number of weeks a stats refresh covers.
pub const DEFAULT_STATS_WEEKS: usize = 8;

/// A live session held in the process-wide cache.
#[derive(Clone)]
pub struct CachedSession {
    pub session: GarminSession,
    pub cached_at: DateTime<Utc>,
}

/// Shared session cache type for use in AppState.
pub type SessionCache = Arc<DashMap<String, CachedSession>>;

/// Injectable time source so expiry logic is testable.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Persisted connection state, read without touching cache or network.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub garmin_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<String>,
}

/// High-level Garmin service that manages the session lifecycle.
///
/// This service encapsulates:
/// - Credential encryption and storage via the vault
/// - A two-tier session model: live (in-memory cache, 30-minute window)
///   and dormant (encrypted credentials + tokens in Firestore)
/// - Token probe before full re-authentication, to keep load off the
///   rate-limited login endpoint
/// - Weekly stats refresh (fetch, aggregate, replace all rows)
#[derive(Clone)]
pub struct GarminService {
    api: Arc<dyn GarminApi>,
    db: FirestoreDb,
    vault: VaultService,
    /// In-memory cache of live sessions (shared across requests).
    cache: SessionCache,
    clock: Clock,
    /// Serve generated stats instead of fetching from Garmin.
    mock_mode: bool,
}

impl GarminService {
    /// Create a new Garmin service with a shared session cache.
    pub fn new(
        api: Arc<dyn GarminApi>,
        db: FirestoreDb,
        vault: VaultService,
        cache: SessionCache,
        mock_mode: bool,
    ) -> Self {
        Self {
            api,
            db,
            vault,
            cache,
            clock: Arc::new(Utc::now),
            mock_mode,
        }
    }

    /// Replace the time source (tests only need this for expiry logic).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    // ─── Connect / Disconnect ────────────────────────────────────────────────

    /// Connect a Garmin account: authenticate, then replace any existing
    /// connection with freshly encrypted credentials and tokens.
    ///
    /// Authentication happens before teardown, so a failed connect leaves
    /// an existing connection untouched.
    ///
    /// Returns the Garmin-side user identifier.
    pub async fn connect(
        &self,
        user_id: &str,
        username: &str,
        password: &str,
    ) -> Result<String, AppError> {
        let session = self
            .api
            .login(username, password)
            .await
            .map_err(classify_connect_error)?;

        let profile = self
            .api
            .validate_session(&session)
            .await
            .map_err(classify_connect_error)?;

        let garmin_user_id = if profile.display_name.is_empty() {
            // Fall back to the local part of the login email.
            username.split('@').next().unwrap_or(username).to_string()
        } else {
            profile.display_name
        };

        // Unconditional replace: exactly one connection per user.
        self.disconnect(user_id).await?;

        let (encrypted_username, encrypted_password) =
            encrypt_credentials(&self.vault, username, password)?;

        let now = self.now();
        let connection = GarminConnection {
            user_id: user_id.to_string(),
            encrypted_username,
            encrypted_password,
            oauth1_token_encrypted: self.vault.encrypt_opt(session.oauth1_token.as_deref())?,
            oauth2_token_encrypted: self.vault.encrypt_opt(session.oauth2_token.as_deref())?,
            garmin_user_id: garmin_user_id.clone(),
            connected_at: format_utc_rfc3339(now),
            last_sync_at: None,
        };
        self.db.set_garmin_connection(&connection).await?;

        self.cache.insert(
            user_id.to_string(),
            CachedSession {
                session,
                cached_at: now,
            },
        );

        tracing::info!(user_id, garmin_user_id = %garmin_user_id, "Garmin connected");
        Ok(garmin_user_id)
    }

    /// Disconnect Garmin: evict the cached session and delete all
    /// persisted connection state, including the athlete's weekly stats.
    /// Idempotent: disconnecting an already-disconnected user is a no-op.
    pub async fn disconnect(&self, user_id: &str) -> Result<(), AppError> {
        self.cache.remove(user_id);
        self.db.delete_garmin_connection(user_id).await?;
        self.db.delete_weekly_stats(user_id).await?;
        Ok(())
    }

    /// Read persisted connection state. Never touches cache or network.
    pub async fn connection_status(&self, user_id: &str) -> Result<ConnectionStatus, AppError> {
        Ok(match self.db.get_garmin_connection(user_id).await? {
            Some(connection) => ConnectionStatus {
                connected: true,
                garmin_user_id: Some(connection.garmin_user_id),
                connected_at: Some(connection.connected_at),
                last_sync_at: connection.last_sync_at,
            },
            None => ConnectionStatus {
                connected: false,
                garmin_user_id: None,
                connected_at: None,
                last_sync_at: None,
            },
        })
    }

    // ─── Session Access ──────────────────────────────────────────────────────

    /// Get a usable session for the user, or `None` if not connected.
    ///
    /// Order of attempts:
    /// 1. Cached live session under the 30-minute window (no I/O)
    /// 2. Stored token artifacts, verified with a cheap profile probe
    /// 3. Full re-authentication with the decrypted credentials
    ///
    /// Concurrent requests may race through rehydration; the duplicate
    /// login is tolerated and the last write to the cache wins.
    pub async fn get_client(&self, user_id: &str) -> Result<Option<GarminSession>, AppError> {
        let now = self.now();

        if let Some(cached) = self.cache.get(user_id) {
            if now - cached.cached_at < Duration::seconds(SESSION_CACHE_WINDOW_SECS) {
                return Ok(Some(cached.session.clone()));
            }
            // Stale entry - fall through to rehydration
        }

        let Some(mut connection) = self.db.get_garmin_connection(user_id).await? else {
            return Ok(None);
        };

        let (username, password) = decrypt_credentials(
            &self.vault,
            &connection.encrypted_username,
            &connection.encrypted_password,
        )?;

        let oauth1_token = self
            .vault
            .decrypt_opt(connection.oauth1_token_encrypted.as_deref())?;
        let oauth2_token = self
            .vault
            .decrypt_opt(connection.oauth2_token_encrypted.as_deref())?;

        // Probe stored tokens before burning a login call.
        if oauth1_token.is_some() && oauth2_token.is_some() {
            let session = GarminSession {
                oauth1_token,
                oauth2_token,
            };
            match self.api.validate_session(&session).await {
                Ok(_) => {
                    self.cache_session(user_id, session.clone(), now);
                    return Ok(Some(session));
                }
                Err(e) => {
                    tracing::info!(
                        user_id,
                        error = %e,
                        "Stored Garmin session rejected, re-authenticating"
                    );
                }
            }
        }

        match self.api.login(&username, &password).await {
            Ok(session) => {
                connection.oauth1_token_encrypted =
                    self.vault.encrypt_opt(session.oauth1_token.as_deref())?;
                connection.oauth2_token_encrypted =
                    self.vault.encrypt_opt(session.oauth2_token.as_deref())?;
                self.db.set_garmin_connection(&connection).await?;

                self.cache_session(user_id, session.clone(), now);
                Ok(Some(session))
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Garmin re-authentication failed");
                Ok(None)
            }
        }
    }

    fn cache_session(&self, user_id: &str, session: GarminSession, now: DateTime<Utc>) {
        self.cache.insert(
            user_id.to_string(),
            CachedSession {
                session,
                cached_at: now,
            },
        );
    }

    // ─── Activities & Stats ──────────────────────────────────────────────────

    /// Fetch activities in the closed date interval `[start, end]`.
    ///
    /// Garmin has no range query; this pulls the most recent page and
    /// filters locally by start time (local preferred over GMT). Stamps
    /// the connection's last-sync timestamp on success.
    pub async fn fetch_activities(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<GarminActivity>, AppError> {
        let Some(session) = self.get_client(user_id).await? else {
            return Err(AppError::NotConnected);
        };

        let activities = self
            .api
            .list_recent_activities(&session, ACTIVITY_FETCH_LIMIT)
            .await
            .map_err(|e| AppError::GarminApi(e.to_string()))?;

        let filtered: Vec<GarminActivity> = activities
            .into_iter()
            .filter(|activity| {
                activity
                    .start_date()
                    .is_some_and(|date| date >= start && date <= end)
            })
            .collect();

        self.db
            .touch_last_sync(user_id, &format_utc_rfc3339(self.now()))
            .await?;

        tracing::debug!(user_id, count = filtered.len(), "Fetched Garmin activities");
        Ok(filtered)
    }

    /// Refresh weekly stats: fetch activities for the last `num_weeks`
    /// weeks, aggregate, and replace the athlete's stored stats.
    ///
    /// In mock mode the stats come straight from the generator.
    pub async fn refresh_stats(
        &self,
        user_id: &str,
        num_weeks: usize,
    ) -> Result<Vec<WeeklyStatRow>, AppError> {
        let stats = if self.mock_mode {
            generate_mock_weekly_stats(num_weeks)
        } else {
            let (start, end) = activity_date_range(num_weeks, self.now());
            let activities = self.fetch_activities(user_id, start, end).await?;
            calculate_weekly_stats(&activities, num_weeks)
        };

        let now = format_utc_rfc3339(self.now());
        let rows: Vec<WeeklyStatRow> = stats
            .iter()
            .map(|stat| WeeklyStatRow::from_stat(user_id, stat, &now))
            .collect();

        self.db.replace_weekly_stats(user_id, &rows).await?;

        tracing::info!(user_id, weeks = rows.len(), "Weekly stats refreshed");
        Ok(rows)
    }
}

/// Map a provider rejection during connect into the API error taxonomy.
fn classify_connect_error(error: ProviderError) -> AppError {
    match error {
        ProviderError::InvalidCredentials => AppError::InvalidCredentials,
        ProviderError::MfaRequired => AppError::UnsupportedAccount,
        other => AppError::GarminApi(other.to_string()),
    }
}
