// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod drive;
pub mod folder_path;
pub mod gallery;
pub mod google_oauth;
pub mod image_transform;
pub mod receipts;
pub mod session;

pub use drive::{GoogleDriveClient, InMemoryDrive, RemoteStore};
pub use google_oauth::{GoogleOAuthClient, OAuthError};
pub use receipts::ReceiptService;
pub use session::SessionStore;
