// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Receipt upload and deletion pipeline.
//!
//! Upload: transform → derive path → resolve folder → upload → record.
//! Nothing remote is touched until the image has been transformed, so a bad
//! payload never creates folders, files or records.

use crate::db::Database;
use crate::error::AppError;
use crate::models::{NewReceipt, Receipt, User};
use crate::services::drive::{resolve_folder_path, RemoteStore};
use crate::services::folder_path::{folder_path_at, receipt_file_name};
use crate::services::google_oauth::{GoogleOAuthClient, OAuthError};
use crate::services::image_transform::{compress_receipt, CompressedImage, OUTPUT_MIME_TYPE};
use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Refresh access tokens expiring within this many seconds.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Per-key async locks.
pub type KeyedLocks<K> = Arc<DashMap<K, Arc<Mutex<()>>>>;

fn lock_for<K>(locks: &KeyedLocks<K>, key: K) -> Arc<Mutex<()>>
where
    K: std::hash::Hash + Eq,
{
    locks
        .entry(key)
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// Drop the entry for `key` once no task holds or waits on its lock.
///
/// The caller must have dropped its own handle first.
fn release_lock<K>(locks: &KeyedLocks<K>, key: &K)
where
    K: std::hash::Hash + Eq,
{
    locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
}

/// Orchestrates receipt uploads, lookups and deletion.
#[derive(Clone)]
pub struct ReceiptService {
    db: Database,
    drive: Arc<dyn RemoteStore>,
    oauth: GoogleOAuthClient,
    /// Serializes folder resolution per (user, folder path).
    folder_locks: KeyedLocks<(u64, String)>,
    /// Serializes token refresh per user.
    refresh_locks: KeyedLocks<u64>,
}

impl ReceiptService {
    pub fn new(db: Database, drive: Arc<dyn RemoteStore>, oauth: GoogleOAuthClient) -> Self {
        Self {
            db,
            drive,
            oauth,
            folder_locks: Arc::new(DashMap::new()),
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    /// Transform, store and record one uploaded image.
    pub async fn upload(
        &self,
        user_id: u64,
        original_name: String,
        bytes: Vec<u8>,
    ) -> Result<Receipt, AppError> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let input_size = bytes.len();
        let compressed = tokio::task::spawn_blocking(move || compress_receipt(&bytes))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Image transform task failed: {}", e)))??;

        tracing::debug!(
            user_id,
            input_size,
            output_size = compressed.bytes.len(),
            width = compressed.width,
            height = compressed.height,
            "Image transformed"
        );

        // One instant drives the folder, the file name and the record.
        let uploaded_at = Utc::now();
        let folder_path = folder_path_at(uploaded_at, &user.email)?;
        let file_name = receipt_file_name(uploaded_at);

        let access_token = self.valid_access_token(&user).await?;
        let folder_id = self.resolve_folder(user_id, &access_token, &folder_path).await?;

        let CompressedImage { bytes, .. } = compressed;
        let file_size = bytes.len() as u64;
        let uploaded = self
            .drive
            .upload_file(&access_token, &folder_id, &file_name, OUTPUT_MIME_TYPE, bytes)
            .await?;

        tracing::info!(
            user_id,
            drive_file_id = %uploaded.id,
            folder_path = %folder_path,
            file_size,
            "Receipt uploaded to Drive"
        );

        let receipt = self
            .db
            .insert_receipt(NewReceipt {
                user_id,
                file_name,
                original_name,
                google_drive_id: uploaded.id,
                drive_url: uploaded.web_view_link,
                thumbnail_url: uploaded.thumbnail_link,
                file_size,
                mime_type: OUTPUT_MIME_TYPE.to_string(),
                upload_date: uploaded_at,
                folder_path,
            })
            .await?;

        tracing::info!(user_id, receipt_id = receipt.id, "Receipt recorded");
        Ok(receipt)
    }

    /// Fetch a receipt owned by `user_id`.
    pub async fn get(&self, user_id: u64, receipt_id: u64) -> Result<Receipt, AppError> {
        self.db.get_receipt_for_user(receipt_id, user_id).await
    }

    /// Remove a receipt record, then its Drive file.
    ///
    /// The record is gone once this returns `Ok`; a failed remote delete only
    /// leaves an orphaned Drive file behind.
    pub async fn delete(&self, user_id: u64, receipt_id: u64) -> Result<Receipt, AppError> {
        let receipt = self.db.delete_receipt_for_user(receipt_id, user_id).await?;
        tracing::info!(user_id, receipt_id, "Receipt record deleted");

        if let Err(e) = self.delete_remote(user_id, &receipt.google_drive_id).await {
            tracing::warn!(
                user_id,
                receipt_id,
                orphaned_drive_file_id = %receipt.google_drive_id,
                error = %e,
                "Failed to delete Drive file"
            );
        }

        Ok(receipt)
    }

    async fn delete_remote(&self, user_id: u64, file_id: &str) -> Result<(), AppError> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        let access_token = self.valid_access_token(&user).await?;
        self.drive.delete_file(&access_token, file_id).await
    }

    async fn resolve_folder(
        &self,
        user_id: u64,
        access_token: &str,
        folder_path: &str,
    ) -> Result<String, AppError> {
        let key = (user_id, folder_path.to_string());
        let lock = lock_for(&self.folder_locks, key.clone());
        let resolved = {
            let _guard = lock.lock().await;
            resolve_folder_path(self.drive.as_ref(), access_token, folder_path).await
        };
        drop(lock);
        release_lock(&self.folder_locks, &key);

        let folder_id = resolved?;
        tracing::debug!(user_id, folder_path, folder_id = %folder_id, "Folder resolved");
        Ok(folder_id)
    }

    /// Access token for Drive calls, refreshed if it expires soon.
    pub async fn valid_access_token(&self, user: &User) -> Result<String, AppError> {
        if let Some(token) = usable_token(user) {
            return Ok(token);
        }

        let lock = lock_for(&self.refresh_locks, user.id);
        let refreshed = {
            let _guard = lock.lock().await;
            self.refresh_access_token(user.id).await
        };
        drop(lock);
        release_lock(&self.refresh_locks, &user.id);

        refreshed
    }

    /// Refresh and persist credentials. Caller holds the user's refresh lock.
    async fn refresh_access_token(&self, user_id: u64) -> Result<String, AppError> {
        // Another task may have refreshed while we waited.
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        if let Some(token) = usable_token(&user) {
            return Ok(token);
        }

        let refresh_token = user.refresh_token.as_deref().ok_or_else(|| {
            tracing::warn!(user_id = user.id, "Access token expired and no refresh token stored");
            AppError::Unauthorized
        })?;

        let credentials = self
            .oauth
            .refresh_access_token(refresh_token)
            .await
            .map_err(|e| match e {
                e @ (OAuthError::RefreshToken(_) | OAuthError::NoRefreshToken) => {
                    tracing::warn!(user_id = user.id, error = %e, "Refresh token rejected");
                    AppError::Unauthorized
                }
                other => other.into(),
            })?;

        let updated = self.db.update_user_credentials(user.id, credentials).await?;
        tracing::info!(user_id = user.id, "Google access token refreshed");

        updated
            .access_token
            .ok_or_else(|| AppError::OAuth("Refreshed credentials lack access token".to_string()))
    }
}

/// Stored access token, if present and not expiring within the margin.
///
/// A token with no known expiry is used as is.
fn usable_token(user: &User) -> Option<String> {
    let token = user.access_token.as_ref()?;
    match user.token_expires_at {
        Some(expires_at)
            if Utc::now() + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) >= expires_at =>
        {
            None
        }
        _ => Some(token.clone()),
    }
}
