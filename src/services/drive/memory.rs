// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process remote store for local development and tests.

use super::{RemoteStore, UploadedFile, ROOT_FOLDER_ID};
use crate::error::AppError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct Folder {
    parent_id: String,
    name: String,
}

#[derive(Debug, Clone)]
struct StoredFile {
    parent_id: String,
    size: usize,
}

#[derive(Debug, Default)]
struct DriveState {
    next_id: u64,
    /// Folder ID -> folder, in creation order by ID.
    folders: HashMap<String, Folder>,
    files: HashMap<String, StoredFile>,
    folder_creations: usize,
}

impl DriveState {
    fn allocate_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

/// Remote store held entirely in memory.
///
/// Behaves like Drive for name lookups: duplicate folder names under the same
/// parent are allowed and lookups return the earliest one.
#[derive(Debug, Default)]
pub struct InMemoryDrive {
    state: Mutex<DriveState>,
    fail_uploads: AtomicBool,
    fail_deletes: AtomicBool,
}

impl InMemoryDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent uploads fail with a remote error.
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent deletes fail with a remote error.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of folders created so far.
    pub async fn folder_creations(&self) -> usize {
        self.state.lock().await.folder_creations
    }

    /// Number of files currently stored.
    pub async fn file_count(&self) -> usize {
        self.state.lock().await.files.len()
    }

    pub async fn contains_file(&self, file_id: &str) -> bool {
        self.state.lock().await.files.contains_key(file_id)
    }

    /// Folder ID holding `file_id`.
    pub async fn file_parent(&self, file_id: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .files
            .get(file_id)
            .map(|f| f.parent_id.clone())
    }

    /// Slash-separated path of `folder_id` from the root.
    pub async fn folder_path(&self, folder_id: &str) -> Option<String> {
        let state = self.state.lock().await;
        let mut segments = Vec::new();
        let mut current = folder_id;

        while current != ROOT_FOLDER_ID {
            let folder = state.folders.get(current)?;
            segments.push(folder.name.as_str());
            current = &folder.parent_id;
        }

        segments.reverse();
        Some(segments.join("/"))
    }
}

fn folder_number(id: &str) -> u64 {
    id.rsplit('-').next().and_then(|n| n.parse().ok()).unwrap_or(u64::MAX)
}

#[async_trait]
impl RemoteStore for InMemoryDrive {
    async fn find_folder(
        &self,
        _access_token: &str,
        parent_id: &str,
        name: &str,
    ) -> Result<Option<String>, AppError> {
        // Give other tasks a chance to interleave, as a real round-trip would.
        tokio::task::yield_now().await;

        let state = self.state.lock().await;
        Ok(state
            .folders
            .iter()
            .filter(|(_, f)| f.parent_id == parent_id && f.name == name)
            .min_by_key(|(id, _)| folder_number(id))
            .map(|(id, _)| id.clone()))
    }

    async fn create_folder(
        &self,
        _access_token: &str,
        parent_id: &str,
        name: &str,
    ) -> Result<String, AppError> {
        let mut state = self.state.lock().await;
        let id = state.allocate_id("folder");
        state.folders.insert(
            id.clone(),
            Folder {
                parent_id: parent_id.to_string(),
                name: name.to_string(),
            },
        );
        state.folder_creations += 1;
        Ok(id)
    }

    async fn upload_file(
        &self,
        _access_token: &str,
        folder_id: &str,
        _file_name: &str,
        _mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, AppError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::RemoteUnavailable("upload rejected".to_string()));
        }

        let mut state = self.state.lock().await;
        let id = state.allocate_id("file");
        state.files.insert(
            id.clone(),
            StoredFile {
                parent_id: folder_id.to_string(),
                size: bytes.len(),
            },
        );
        tracing::debug!(file_id = %id, size = bytes.len(), "Stored file in memory drive");

        Ok(UploadedFile {
            web_view_link: format!("https://drive.google.com/file/d/{}/view", id),
            thumbnail_link: None,
            id,
        })
    }

    async fn delete_file(&self, _access_token: &str, file_id: &str) -> Result<(), AppError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::RemoteUnavailable("delete rejected".to_string()));
        }

        let removed = self.state.lock().await.files.remove(file_id);
        if let Some(file) = removed {
            tracing::debug!(file_id, size = file.size, "Removed file from memory drive");
        }
        Ok(())
    }
}
