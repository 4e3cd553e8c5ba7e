// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (accounts and coach/athlete relations)
//! - Invites (athlete registration tokens)
//! - Runs (scheduled training calendar)
//! - Garmin connections (encrypted credentials and session tokens)
//! - Weekly stats (replace-all-per-athlete aggregates)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{GarminConnection, Invite, Run, User, WeeklyStatRow};
use futures_util::{stream, StreamExt};

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Filters for listing runs.
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    /// Restrict to runs created by this coach
    pub coach_id: Option<String>,
    /// Restrict to one athlete
    pub athlete_id: Option<String>,
    /// Inclusive lower bound on run date (YYYY-MM-DD)
    pub start_date: Option<String>,
    /// Inclusive upper bound on run date (YYYY-MM-DD)
    pub end_date: Option<String>,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing
        // a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a user by login email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("email").eq(email.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List all athletes belonging to a coach, sorted by name.
    pub async fn list_athletes(&self, coach_id: &str) -> Result<Vec<User>, AppError> {
        let coach_id = coach_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("coach_id").eq(coach_id.clone())]))
            .order_by([("name", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Invite Operations ───────────────────────────────────────

    /// Get an invite by ID.
    pub async fn get_invite(&self, invite_id: &str) -> Result<Option<Invite>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::INVITES)
            .obj()
            .one(invite_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an invite by its registration token.
    pub async fn get_invite_by_token(&self, token: &str) -> Result<Option<Invite>, AppError> {
        let token = token.to_string();
        let invites: Vec<Invite> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::INVITES)
            .filter(move |q| q.for_all([q.field("token").eq(token.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(invites.into_iter().next())
    }

    /// List a coach's invites, newest first.
    pub async fn list_invites(&self, coach_id: &str) -> Result<Vec<Invite>, AppError> {
        let coach_id = coach_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::INVITES)
            .filter(move |q| q.for_all([q.field("coach_id").eq(coach_id.clone())]))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an unused invite for an email from a specific coach.
    pub async fn get_open_invite(
        &self,
        coach_id: &str,
        email: &str,
    ) -> Result<Option<Invite>, AppError> {
        let coach_id = coach_id.to_string();
        let email = email.to_string();
        let invites: Vec<Invite> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::INVITES)
            .filter(move |q| {
                q.for_all([
                    q.field("coach_id").eq(coach_id.clone()),
                    q.field("email").eq(email.clone()),
                    q.field("used").eq(false),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(invites.into_iter().next())
    }

    /// Create or update an invite.
    pub async fn upsert_invite(&self, invite: &Invite) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::INVITES)
            .document_id(&invite.id)
            .object(invite)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete an invite.
    pub async fn delete_invite(&self, invite_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::INVITES)
            .document_id(invite_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Run Operations ──────────────────────────────────────────

    /// Get a run by ID.
    pub async fn get_run(&self, run_id: &str) -> Result<Option<Run>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::RUNS)
            .obj()
            .one(run_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a run.
    pub async fn upsert_run(&self, run: &Run) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::RUNS)
            .document_id(&run.id)
            .object(run)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a run.
    pub async fn delete_run(&self, run_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::RUNS)
            .document_id(run_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List runs matching the filter, sorted by date ascending.
    ///
    /// Optional filter fields are composed into a single Firestore query;
    /// absent fields place no constraint.
    pub async fn list_runs(&self, filter: &RunFilter) -> Result<Vec<Run>, AppError> {
        let filter = filter.clone();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::RUNS)
            .filter(move |q| {
                q.for_all([
                    filter
                        .coach_id
                        .clone()
                        .and_then(|coach_id| q.field("coach_id").eq(coach_id)),
                    filter
                        .athlete_id
                        .clone()
                        .and_then(|athlete_id| q.field("athlete_id").eq(athlete_id)),
                    filter
                        .start_date
                        .clone()
                        .and_then(|date| q.field("date").greater_than_or_equal(date)),
                    filter
                        .end_date
                        .clone()
                        .and_then(|date| q.field("date").less_than_or_equal(date)),
                ])
            })
            .order_by([("date", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List an athlete's upcoming runs from `from_date` onward.
    pub async fn list_upcoming_runs(
        &self,
        athlete_id: &str,
        from_date: &str,
        limit: u32,
    ) -> Result<Vec<Run>, AppError> {
        let athlete_id = athlete_id.to_string();
        let from_date = from_date.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::RUNS)
            .filter(move |q| {
                q.for_all([
                    q.field("athlete_id").eq(athlete_id.clone()),
                    q.field("date").greater_than_or_equal(from_date.clone()),
                ])
            })
            .order_by([("date", firestore::FirestoreQueryDirection::Ascending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Garmin Connection Operations ────────────────────────────

    /// Get a user's Garmin connection.
    pub async fn get_garmin_connection(
        &self,
        user_id: &str,
    ) -> Result<Option<GarminConnection>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::GARMIN_CONNECTIONS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a user's Garmin connection (one per user, replace semantics).
    pub async fn set_garmin_connection(
        &self,
        connection: &GarminConnection,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::GARMIN_CONNECTIONS)
            .document_id(&connection.user_id)
            .object(connection)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a user's Garmin connection (no-op if absent).
    pub async fn delete_garmin_connection(&self, user_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::GARMIN_CONNECTIONS)
            .document_id(user_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Stamp the connection's last-sync timestamp.
    pub async fn touch_last_sync(&self, user_id: &str, now: &str) -> Result<(), AppError> {
        if let Some(mut connection) = self.get_garmin_connection(user_id).await? {
            connection.last_sync_at = Some(now.to_string());
            self.set_garmin_connection(&connection).await?;
        }
        Ok(())
    }

    // ─── Weekly Stats Operations ─────────────────────────────────

    /// List an athlete's weekly stats, most recent week first.
    pub async fn list_weekly_stats(
        &self,
        athlete_id: &str,
        limit: u32,
    ) -> Result<Vec<WeeklyStatRow>, AppError> {
        let athlete_id = athlete_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::WEEKLY_STATS)
            .filter(move |q| q.for_all([q.field("athlete_id").eq(athlete_id.clone())]))
            .order_by([("week_start", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete all weekly stats for an athlete.
    pub async fn delete_weekly_stats(&self, athlete_id: &str) -> Result<usize, AppError> {
        let athlete_id_owned = athlete_id.to_string();
        let existing: Vec<WeeklyStatRow> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::WEEKLY_STATS)
            .filter(move |q| q.for_all([q.field("athlete_id").eq(athlete_id_owned.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let count = existing.len();
        self.batch_delete(&existing, collections::WEEKLY_STATS, WeeklyStatRow::doc_id)
            .await?;

        tracing::debug!(athlete_id, count, "Deleted weekly stats");
        Ok(count)
    }

    /// Replace all weekly stats for an athlete with a fresh set.
    ///
    /// Delete and insert commit independently; a crash in between leaves
    /// the athlete with no stats until the next successful refresh.
    pub async fn replace_weekly_stats(
        &self,
        athlete_id: &str,
        rows: &[WeeklyStatRow],
    ) -> Result<(), AppError> {
        self.delete_weekly_stats(athlete_id).await?;

        let client = self.get_client()?;

        stream::iter(rows.to_vec())
            .map(|row| async move {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::WEEKLY_STATS)
                    .document_id(row.doc_id())
                    .object(&row)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                Ok::<_, AppError>(())
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        tracing::debug!(athlete_id, count = rows.len(), "Stored weekly stats");
        Ok(())
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}
