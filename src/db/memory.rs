// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Volatile in-process metadata store.
//!
//! Tables are `DashMap`s and IDs come from atomic sequences, so concurrent
//! requests never mutate shared state without synchronization. Nothing
//! survives a restart.

use crate::error::AppError;
use crate::models::receipt::sort_newest_first;
use crate::models::{GoogleSignIn, NewReceipt, Receipt, User, UserCredentials};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Tables {
    users: DashMap<u64, User>,
    /// Google subject ID -> user ID
    users_by_google_id: DashMap<String, u64>,
    receipts: DashMap<u64, Receipt>,
    user_seq: AtomicU64,
    receipt_seq: AtomicU64,
}

/// In-memory metadata store. Cloning shares the underlying tables.
#[derive(Clone, Default)]
pub struct MemoryDb {
    tables: Arc<Tables>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── User Operations ─────────────────────────────────────────

    pub fn get_user(&self, user_id: u64) -> Option<User> {
        self.tables.users.get(&user_id).map(|u| u.value().clone())
    }

    pub fn get_user_by_google_id(&self, google_id: &str) -> Option<User> {
        let user_id = *self.tables.users_by_google_id.get(google_id)?;
        self.get_user(user_id)
    }

    /// Create the user on first sign-in, otherwise refresh their credentials.
    pub fn upsert_google_user(
        &self,
        sign_in: GoogleSignIn,
        now: DateTime<Utc>,
    ) -> Result<User, AppError> {
        match self
            .tables
            .users_by_google_id
            .entry(sign_in.google_id.clone())
        {
            Entry::Occupied(entry) => {
                let user_id = *entry.get();
                let mut user = self.tables.users.get_mut(&user_id).ok_or_else(|| {
                    AppError::Database(format!("User index points at missing user {}", user_id))
                })?;
                user.apply_credentials(sign_in.credentials);
                Ok(user.value().clone())
            }
            Entry::Vacant(entry) => {
                let user_id = self.tables.user_seq.fetch_add(1, Ordering::SeqCst) + 1;
                let user = User::from_sign_in(user_id, sign_in, now);
                self.tables.users.insert(user_id, user.clone());
                entry.insert(user_id);
                Ok(user)
            }
        }
    }

    pub fn update_user_credentials(
        &self,
        user_id: u64,
        credentials: UserCredentials,
    ) -> Result<User, AppError> {
        let mut user = self
            .tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.apply_credentials(credentials);
        Ok(user.value().clone())
    }

    // ─── Receipt Operations ──────────────────────────────────────

    pub fn get_receipt(&self, receipt_id: u64) -> Option<Receipt> {
        self.tables
            .receipts
            .get(&receipt_id)
            .map(|r| r.value().clone())
    }

    /// All receipts for a user, newest first.
    pub fn list_receipts_for_user(&self, user_id: u64) -> Vec<Receipt> {
        let mut receipts: Vec<Receipt> = self
            .tables
            .receipts
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.value().clone())
            .collect();
        sort_newest_first(&mut receipts);
        receipts
    }

    pub fn insert_receipt(&self, receipt: NewReceipt) -> Receipt {
        let receipt_id = self.tables.receipt_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let receipt = receipt.with_id(receipt_id);
        self.tables.receipts.insert(receipt_id, receipt.clone());
        receipt
    }

    /// Remove a receipt if and only if `user_id` owns it.
    pub fn delete_receipt_for_user(
        &self,
        receipt_id: u64,
        user_id: u64,
    ) -> Result<Receipt, AppError> {
        match self
            .tables
            .receipts
            .remove_if(&receipt_id, |_, r| r.user_id == user_id)
        {
            Some((_, receipt)) => Ok(receipt),
            None if self.tables.receipts.contains_key(&receipt_id) => Err(AppError::AccessDenied),
            None => Err(AppError::NotFound("Receipt not found".to_string())),
        }
    }

    pub fn receipt_count(&self) -> usize {
        self.tables.receipts.len()
    }
}
