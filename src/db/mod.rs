// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Metadata store (users and receipts).
//!
//! `Database` is the single lookup/insert/delete contract the rest of the
//! crate uses. Ownership of receipts is checked here, not by callers.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::receipt::sort_newest_first;
use crate::models::{GoogleSignIn, NewReceipt, Receipt, User, UserCredentials};
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const RECEIPTS: &str = "receipts";
    /// ID counters (keyed by collection name)
    pub const SEQUENCES: &str = "sequences";
}

/// Metadata store backend.
#[derive(Clone)]
pub enum Database {
    Memory(MemoryDb),
    Firestore(FirestoreDb),
}

impl Database {
    /// Fresh volatile store.
    pub fn memory() -> Self {
        Database::Memory(MemoryDb::new())
    }

    // ─── Users ───────────────────────────────────────────────────

    pub async fn get_user(&self, user_id: u64) -> Result<Option<User>, AppError> {
        match self {
            Database::Memory(db) => Ok(db.get_user(user_id)),
            Database::Firestore(db) => db.get_user(user_id).await,
        }
    }

    pub async fn get_user_by_google_id(&self, google_id: &str) -> Result<Option<User>, AppError> {
        match self {
            Database::Memory(db) => Ok(db.get_user_by_google_id(google_id)),
            Database::Firestore(db) => db.get_user_by_google_id(google_id).await,
        }
    }

    /// Create a user on first sign-in; later sign-ins update credentials only.
    pub async fn upsert_google_user(&self, sign_in: GoogleSignIn) -> Result<User, AppError> {
        let now = Utc::now();
        match self {
            Database::Memory(db) => db.upsert_google_user(sign_in, now),
            Database::Firestore(db) => db.upsert_google_user(sign_in, now).await,
        }
    }

    pub async fn update_user_credentials(
        &self,
        user_id: u64,
        credentials: UserCredentials,
    ) -> Result<User, AppError> {
        match self {
            Database::Memory(db) => db.update_user_credentials(user_id, credentials),
            Database::Firestore(db) => db.update_user_credentials(user_id, credentials).await,
        }
    }

    // ─── Receipts ────────────────────────────────────────────────

    /// Fetch a receipt owned by `user_id`.
    pub async fn get_receipt_for_user(
        &self,
        receipt_id: u64,
        user_id: u64,
    ) -> Result<Receipt, AppError> {
        let receipt = match self {
            Database::Memory(db) => db.get_receipt(receipt_id),
            Database::Firestore(db) => db.get_receipt(receipt_id).await?,
        }
        .ok_or_else(|| AppError::NotFound("Receipt not found".to_string()))?;

        if receipt.user_id != user_id {
            return Err(AppError::AccessDenied);
        }
        Ok(receipt)
    }

    /// All receipts for a user, newest first.
    pub async fn list_receipts_for_user(&self, user_id: u64) -> Result<Vec<Receipt>, AppError> {
        match self {
            Database::Memory(db) => Ok(db.list_receipts_for_user(user_id)),
            Database::Firestore(db) => {
                let mut receipts = db.list_receipts_for_user(user_id).await?;
                sort_newest_first(&mut receipts);
                Ok(receipts)
            }
        }
    }

    /// The `limit` most recent receipts for a user.
    pub async fn recent_receipts_for_user(
        &self,
        user_id: u64,
        limit: usize,
    ) -> Result<Vec<Receipt>, AppError> {
        let mut receipts = self.list_receipts_for_user(user_id).await?;
        receipts.truncate(limit);
        Ok(receipts)
    }

    /// Receipts uploaded within `[start, end]`, newest first.
    pub async fn receipts_in_range(
        &self,
        user_id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Receipt>, AppError> {
        let receipts = self.list_receipts_for_user(user_id).await?;
        Ok(receipts
            .into_iter()
            .filter(|r| r.upload_date >= start && r.upload_date <= end)
            .collect())
    }

    /// Record a new receipt. No deduplication against the remote ID.
    pub async fn insert_receipt(&self, receipt: NewReceipt) -> Result<Receipt, AppError> {
        match self {
            Database::Memory(db) => Ok(db.insert_receipt(receipt)),
            Database::Firestore(db) => db.insert_receipt(receipt).await,
        }
    }

    /// Delete a receipt owned by `user_id`, returning the removed record.
    pub async fn delete_receipt_for_user(
        &self,
        receipt_id: u64,
        user_id: u64,
    ) -> Result<Receipt, AppError> {
        match self {
            Database::Memory(db) => db.delete_receipt_for_user(receipt_id, user_id),
            Database::Firestore(db) => {
                let receipt = self.get_receipt_for_user(receipt_id, user_id).await?;
                db.delete_receipt(receipt_id).await?;
                Ok(receipt)
            }
        }
    }
}
