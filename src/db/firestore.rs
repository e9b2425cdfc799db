// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile and OAuth credentials)
//! - Receipts (uploaded receipt metadata)
//! - Sequences (monotonic ID counters)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{GoogleSignIn, NewReceipt, Receipt, User, UserCredentials};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counter document backing store-assigned IDs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Sequence {
    value: u64,
}

/// Commit attempts before giving up on an ID allocation.
const SEQUENCE_COMMIT_ATTEMPTS: u32 = 5;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
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

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

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

        Ok(Self { client })
    }

    /// Allocate the next ID from a named sequence.
    ///
    /// The sequence document is read inside the transaction, so two writers
    /// that read the same value conflict at commit and the loser retries.
    async fn next_id(&self, sequence: &str) -> Result<u64, AppError> {
        let mut last_error = None;

        for attempt in 1..=SEQUENCE_COMMIT_ATTEMPTS {
            match self.try_next_id(sequence).await {
                Ok(id) => return Ok(id),
                Err(e) => {
                    tracing::warn!(sequence, attempt, error = %e, "Sequence allocation failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Database("Sequence allocation failed".to_string())))
    }

    async fn try_next_id(&self, sequence: &str) -> Result<u64, AppError> {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let in_transaction = self.client.clone_with_consistency_selector(
            firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ),
        );

        let current: Option<Sequence> = in_transaction
            .fluent()
            .select()
            .by_id_in(collections::SEQUENCES)
            .obj()
            .one(sequence)
            .await
            .map_err(|e| AppError::Database(format!("Failed to read sequence: {}", e)))?;

        let next = Sequence {
            value: current.unwrap_or_default().value + 1,
        };

        self.client
            .fluent()
            .update()
            .in_col(collections::SEQUENCES)
            .document_id(sequence)
            .object(&next)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add sequence to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Sequence commit failed: {}", e)))?;

        Ok(next.value)
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by local ID.
    pub async fn get_user(&self, user_id: u64) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&user_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by Google subject ID.
    pub async fn get_user_by_google_id(&self, google_id: &str) -> Result<Option<User>, AppError> {
        let google_id = google_id.to_string();
        let users: Vec<User> = self
            .client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("googleId").eq(google_id.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    async fn set_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(user.id.to_string())
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Create the user on first sign-in, otherwise refresh their credentials.
    pub async fn upsert_google_user(
        &self,
        sign_in: GoogleSignIn,
        now: DateTime<Utc>,
    ) -> Result<User, AppError> {
        let user = match self.get_user_by_google_id(&sign_in.google_id).await? {
            Some(mut existing) => {
                existing.apply_credentials(sign_in.credentials);
                existing
            }
            None => {
                let user_id = self.next_id(collections::USERS).await?;
                User::from_sign_in(user_id, sign_in, now)
            }
        };

        self.set_user(&user).await?;
        Ok(user)
    }

    pub async fn update_user_credentials(
        &self,
        user_id: u64,
        credentials: UserCredentials,
    ) -> Result<User, AppError> {
        let mut user = self
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.apply_credentials(credentials);
        self.set_user(&user).await?;
        Ok(user)
    }

    // ─── Receipt Operations ──────────────────────────────────────

    pub async fn get_receipt(&self, receipt_id: u64) -> Result<Option<Receipt>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::RECEIPTS)
            .obj()
            .one(&receipt_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All receipts owned by a user, in no particular order.
    pub async fn list_receipts_for_user(&self, user_id: u64) -> Result<Vec<Receipt>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::RECEIPTS)
            .filter(move |q| q.for_all([q.field("userId").eq(user_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn insert_receipt(&self, receipt: NewReceipt) -> Result<Receipt, AppError> {
        let receipt_id = self.next_id(collections::RECEIPTS).await?;
        let receipt = receipt.with_id(receipt_id);

        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::RECEIPTS)
            .document_id(receipt_id.to_string())
            .object(&receipt)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(receipt)
    }

    pub async fn delete_receipt(&self, receipt_id: u64) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collections::RECEIPTS)
            .document_id(receipt_id.to_string())
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
