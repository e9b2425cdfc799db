// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Drive v3 REST client.
//!
//! Handles:
//! - Folder lookup and creation
//! - Multipart (metadata + media) file uploads
//! - File deletion
//! - Quota error detection

use super::{RemoteStore, UploadedFile, FOLDER_MIME_TYPE};
use crate::error::AppError;
use async_trait::async_trait;
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Google Drive API client.
#[derive(Clone)]
pub struct GoogleDriveClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for GoogleDriveClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleDriveClient {
    /// Create a client for the public Drive endpoint.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a different endpoint (tests, proxies).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.base_url)
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/drive/v3/files", self.base_url)
    }

    /// Check response status and return error if not successful.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status, &body))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        Self::check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::RemoteUnavailable(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl RemoteStore for GoogleDriveClient {
    async fn find_folder(
        &self,
        access_token: &str,
        parent_id: &str,
        name: &str,
    ) -> Result<Option<String>, AppError> {
        let query = folder_query(parent_id, name);

        let response = self
            .http
            .get(self.files_url())
            .bearer_auth(access_token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id, name)"),
                ("spaces", "drive"),
            ])
            .send()
            .await
            .map_err(|e| AppError::RemoteUnavailable(e.to_string()))?;

        let list: FileList = Self::check_response_json(response).await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_folder(
        &self,
        access_token: &str,
        parent_id: &str,
        name: &str,
    ) -> Result<String, AppError> {
        let body = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [parent_id],
        });

        let response = self
            .http
            .post(self.files_url())
            .bearer_auth(access_token)
            .query(&[("fields", "id")])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::RemoteUnavailable(e.to_string()))?;

        let file: DriveFile = Self::check_response_json(response).await?;
        Ok(file.id)
    }

    async fn upload_file(
        &self,
        access_token: &str,
        folder_id: &str,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, AppError> {
        let boundary = multipart_boundary()?;
        let metadata = serde_json::json!({
            "name": file_name,
            "mimeType": mime_type,
            "parents": [folder_id],
        });
        let body = multipart_related_body(&boundary, &metadata, mime_type, &bytes);

        let response = self
            .http
            .post(self.upload_url())
            .bearer_auth(access_token)
            .query(&[
                ("uploadType", "multipart"),
                ("fields", "id,webViewLink,thumbnailLink"),
            ])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::RemoteUnavailable(e.to_string()))?;

        let file: DriveFile = Self::check_response_json(response).await?;
        let web_view_link = file
            .web_view_link
            .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", file.id));

        Ok(UploadedFile {
            id: file.id,
            web_view_link,
            thumbnail_link: file.thumbnail_link,
        })
    }

    async fn delete_file(&self, access_token: &str, file_id: &str) -> Result<(), AppError> {
        let url = format!("{}/{}", self.files_url(), urlencoding::encode(file_id));

        let response = self
            .http
            .delete(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::RemoteUnavailable(e.to_string()))?;

        // Already gone is as good as deleted.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(file_id, "Drive file already absent");
            return Ok(());
        }

        Self::check_response(response).await?;
        Ok(())
    }
}

/// Escape a value for use inside a single-quoted Drive query string.
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Drive search query for a folder named `name` directly under `parent_id`.
pub fn folder_query(parent_id: &str, name: &str) -> String {
    format!(
        "name = '{}' and '{}' in parents and mimeType = '{}' and trashed = false",
        escape_query_value(name),
        escape_query_value(parent_id),
        FOLDER_MIME_TYPE
    )
}

fn multipart_boundary() -> Result<String, AppError> {
    let mut random = [0u8; 16];
    SystemRandom::new()
        .fill(&mut random)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
    Ok(format!("receipt_vault_{}", hex::encode(random)))
}

/// Build a `multipart/related` body: JSON metadata part, then the media part.
fn multipart_related_body(
    boundary: &str,
    metadata: &serde_json::Value,
    mime_type: &str,
    media: &[u8],
) -> Vec<u8> {
    let head = format!(
        "--{boundary}\r\n\
         Content-Type: application/json; charset=UTF-8\r\n\r\n\
         {metadata}\r\n\
         --{boundary}\r\n\
         Content-Type: {mime_type}\r\n\r\n"
    );
    let tail = format!("\r\n--{boundary}--\r\n");

    let mut body = Vec::with_capacity(head.len() + media.len() + tail.len());
    body.extend_from_slice(head.as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(tail.as_bytes());
    body
}

/// Map a Drive error response onto the application error taxonomy.
fn classify_error(status: reqwest::StatusCode, body: &str) -> AppError {
    let reasons: Vec<String> = serde_json::from_str::<DriveErrorBody>(body)
        .map(|e| e.error.errors.into_iter().map(|item| item.reason).collect())
        .unwrap_or_default();

    if reasons.iter().any(|r| r == "storageQuotaExceeded") {
        tracing::warn!(status = %status, "Drive storage quota exceeded");
        return AppError::QuotaExceeded(format!("HTTP {}", status));
    }

    AppError::RemoteUnavailable(format!("HTTP {}: {}", status, body))
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    web_view_link: Option<String>,
    thumbnail_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DriveErrorBody {
    error: DriveErrorDetail,
}

#[derive(Debug, Deserialize)]
struct DriveErrorDetail {
    #[serde(default)]
    errors: Vec<DriveErrorItem>,
}

#[derive(Debug, Deserialize)]
struct DriveErrorItem {
    #[serde(default)]
    reason: String,
}
