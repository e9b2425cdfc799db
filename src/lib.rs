// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Receipt Vault: photograph receipts and file them in Google Drive
//!
//! This crate provides the backend API that transforms uploaded receipt
//! images, files them into per-day Drive folders and keeps a searchable
//! record of every upload.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Database;
use services::{GoogleOAuthClient, ReceiptService, RemoteStore, SessionStore};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub sessions: SessionStore,
    pub oauth: GoogleOAuthClient,
    pub receipts: ReceiptService,
}

impl AppState {
    /// Wire services together over the given backends.
    pub fn new(
        config: Config,
        db: Database,
        drive: Arc<dyn RemoteStore>,
        oauth: GoogleOAuthClient,
    ) -> Self {
        let receipts = ReceiptService::new(db.clone(), drive, oauth.clone());
        Self {
            config,
            db,
            sessions: SessionStore::new(),
            oauth,
            receipts,
        }
    }
}
