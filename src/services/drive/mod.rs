// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Remote hierarchical file store (Google Drive).
//!
//! `RemoteStore` is the seam between the upload pipeline and the store;
//! `GoogleDriveClient` talks to Drive v3 and `InMemoryDrive` is an in-process
//! stand-in for local development and tests.

pub mod google;
pub mod memory;

pub use google::GoogleDriveClient;
pub use memory::InMemoryDrive;

use crate::error::AppError;
use crate::services::folder_path::path_segments;
use async_trait::async_trait;

/// Well-known ID of the Drive root folder.
pub const ROOT_FOLDER_ID: &str = "root";

/// MIME type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Result of a successful file upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Drive file ID
    pub id: String,
    /// Link to view the file in Drive
    pub web_view_link: String,
    /// Thumbnail link (absent until Drive generates one)
    pub thumbnail_link: Option<String>,
}

/// Operations the receipt pipeline needs from the remote store.
///
/// Every call is a single round-trip authorized by the user's access token.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// ID of the first non-trashed folder named `name` directly under `parent_id`.
    async fn find_folder(
        &self,
        access_token: &str,
        parent_id: &str,
        name: &str,
    ) -> Result<Option<String>, AppError>;

    /// Create a folder under `parent_id`, returning its new ID.
    async fn create_folder(
        &self,
        access_token: &str,
        parent_id: &str,
        name: &str,
    ) -> Result<String, AppError>;

    /// Upload `bytes` as a new file inside `folder_id`.
    async fn upload_file(
        &self,
        access_token: &str,
        folder_id: &str,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, AppError>;

    /// Delete a file by ID.
    async fn delete_file(&self, access_token: &str, file_id: &str) -> Result<(), AppError>;
}

/// Ensure every segment of `path` exists as a folder, returning the deepest ID.
///
/// Walks from the Drive root, reusing the first existing folder with a
/// matching name and creating it otherwise. Not atomic: a concurrent caller
/// may create a same-named folder between the lookup and the create, and a
/// failure part-way leaves any folders already created in place.
pub async fn resolve_folder_path(
    store: &dyn RemoteStore,
    access_token: &str,
    path: &str,
) -> Result<String, AppError> {
    let mut parent_id = ROOT_FOLDER_ID.to_string();

    for segment in path_segments(path) {
        parent_id = match store.find_folder(access_token, &parent_id, segment).await? {
            Some(folder_id) => folder_id,
            None => {
                let folder_id = store
                    .create_folder(access_token, &parent_id, segment)
                    .await?;
                tracing::info!(
                    folder = segment,
                    parent_id = %parent_id,
                    folder_id = %folder_id,
                    "Created Drive folder"
                );
                folder_id
            }
        };
    }

    Ok(parent_id)
}
