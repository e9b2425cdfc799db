// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Receipt Vault API Server
//!
//! Accepts receipt photos, shrinks them and files them in the signed-in
//! user's Google Drive under `receipts/<user>/<date>`.

use receipt_vault::{
    config::{Config, DriveBackend, StorageBackend},
    db::{Database, FirestoreDb},
    services::{GoogleDriveClient, GoogleOAuthClient, InMemoryDrive, RemoteStore},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Receipt Vault API");

    let db = match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory metadata store; data is lost on restart");
            Database::memory()
        }
        StorageBackend::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            tracing::info!(project = %config.gcp_project_id, "Connected to Firestore");
            Database::Firestore(db)
        }
    };

    let drive: Arc<dyn RemoteStore> = match config.drive_backend {
        DriveBackend::Google => Arc::new(GoogleDriveClient::new()),
        DriveBackend::Memory => {
            tracing::warn!("Using in-memory Drive; uploaded images are not persisted");
            Arc::new(InMemoryDrive::new())
        }
    };

    let oauth = GoogleOAuthClient::new(&config);
    let state = Arc::new(AppState::new(config.clone(), db, drive, oauth));

    let app = receipt_vault::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("receipt_vault=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
