// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets are read once at startup and kept in memory.

use std::env;

/// Largest accepted receipt upload (10 MB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Where receipt and user metadata is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Volatile, single-process store.
    Memory,
    /// Cloud Firestore.
    Firestore,
}

/// Where receipt images are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveBackend {
    /// The user's Google Drive.
    Google,
    /// In-process fake, for local development.
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// OAuth redirect URI registered with Google
    pub google_redirect_uri: String,
    /// Frontend URL, used for CORS and cookie attributes
    pub frontend_url: String,
    /// GCP project ID (Firestore backend only)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub storage_backend: StorageBackend,
    pub drive_backend: DriveBackend,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// HMAC key for signing the OAuth `state` parameter (raw bytes)
    pub oauth_state_key: Vec<u8>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            google_client_id: "test_client_id".to_string(),
            google_redirect_uri: "http://localhost:5000/auth/callback".to_string(),
            frontend_url: "http://localhost:5000".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 5000,
            storage_backend: StorageBackend::Memory,
            drive_backend: DriveBackend::Memory,
            google_client_secret: "test_secret".to_string(),
            oauth_state_key: b"test_state_key_32_bytes_minimum!".to_vec(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            google_redirect_uri: env::var("GOOGLE_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:5000/auth/callback".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            storage_backend: parse_storage_backend(env::var("STORAGE_BACKEND").ok().as_deref())?,
            drive_backend: parse_drive_backend(env::var("DRIVE_BACKEND").ok().as_deref())?,

            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),
        })
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

fn parse_storage_backend(raw: Option<&str>) -> Result<StorageBackend, ConfigError> {
    match raw.map(str::trim) {
        None | Some("") | Some("memory") => Ok(StorageBackend::Memory),
        Some("firestore") => Ok(StorageBackend::Firestore),
        Some(other) => Err(ConfigError::Invalid("STORAGE_BACKEND", other.to_string())),
    }
}

fn parse_drive_backend(raw: Option<&str>) -> Result<DriveBackend, ConfigError> {
    match raw.map(str::trim) {
        None | Some("") | Some("google") => Ok(DriveBackend::Google),
        Some("memory") => Ok(DriveBackend::Memory),
        Some(other) => Err(ConfigError::Invalid("DRIVE_BACKEND", other.to_string())),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
