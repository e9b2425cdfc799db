// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (`FIRESTORE_EMULATOR_HOST`); they are skipped otherwise.

use chrono::{Duration, Utc};
use receipt_vault::db::{Database, FirestoreDb};
use receipt_vault::error::AppError;
use receipt_vault::models::{GoogleSignIn, NewReceipt, UserCredentials};

mod common;

async fn test_db() -> Database {
    Database::Firestore(
        FirestoreDb::new("test-project")
            .await
            .expect("Failed to connect to Firestore emulator"),
    )
}

/// Unique Google subject ID for test isolation.
fn unique_google_id() -> String {
    format!("g-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

fn sign_in(google_id: &str, refresh: Option<&str>) -> GoogleSignIn {
    GoogleSignIn {
        google_id: google_id.to_string(),
        email: "jane@example.com".to_string(),
        name: "Jane".to_string(),
        profile_picture: None,
        credentials: UserCredentials {
            access_token: Some("access".to_string()),
            refresh_token: refresh.map(String::from),
            expires_at: Some(Utc::now() + Duration::hours(1)),
        },
    }
}

fn new_receipt(user_id: u64, minutes_ago: i64) -> NewReceipt {
    NewReceipt {
        user_id,
        file_name: "receipt.jpg".to_string(),
        original_name: "photo.jpg".to_string(),
        google_drive_id: format!("drive-{}", minutes_ago),
        drive_url: "https://drive.google.com/file/d/x/view".to_string(),
        thumbnail_url: None,
        file_size: 1234,
        mime_type: "image/jpeg".to_string(),
        upload_date: Utc::now() - Duration::minutes(minutes_ago),
        folder_path: "receipts/jane/2024-03-05".to_string(),
    }
}

#[tokio::test]
async fn test_user_upsert_keeps_identity() {
    require_emulator!();

    let db = test_db().await;
    let google_id = unique_google_id();

    let first = db
        .upsert_google_user(sign_in(&google_id, Some("refresh-1")))
        .await
        .unwrap();
    let second = db.upsert_google_user(sign_in(&google_id, None)).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.refresh_token.as_deref(), Some("refresh-1"));

    let found = db.get_user_by_google_id(&google_id).await.unwrap().unwrap();
    assert_eq!(found.id, first.id);
}

#[tokio::test]
async fn test_receipt_lifecycle() {
    require_emulator!();

    let db = test_db().await;
    let user = db
        .upsert_google_user(sign_in(&unique_google_id(), None))
        .await
        .unwrap();

    let older = db.insert_receipt(new_receipt(user.id, 10)).await.unwrap();
    let newer = db.insert_receipt(new_receipt(user.id, 1)).await.unwrap();
    assert!(newer.id > older.id);

    let listed = db.list_receipts_for_user(user.id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, newer.id);

    let denied = db.delete_receipt_for_user(older.id, user.id + 1_000_000).await;
    assert!(matches!(denied, Err(AppError::AccessDenied)));

    db.delete_receipt_for_user(older.id, user.id).await.unwrap();
    let missing = db.get_receipt_for_user(older.id, user.id).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}
