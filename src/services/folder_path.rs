// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Deterministic Drive locations for receipts.
//!
//! A receipt lives at `receipts/<email local part>/<YYYY-MM-DD>` and is named
//! after its upload instant. Both are pure functions of their inputs.

use crate::error::AppError;
use chrono::{DateTime, NaiveDate, Utc};

/// Top-level Drive folder holding every user's receipts.
pub const ROOT_FOLDER_NAME: &str = "receipts";

/// Extract the local part of an email address.
///
/// Requires exactly one `@` and a non-empty local part that can be used as a
/// single path segment.
pub fn email_local_part(email: &str) -> Result<&str, AppError> {
    let invalid = || {
        AppError::BadRequest(format!(
            "Account email {:?} has no usable local part",
            email
        ))
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || local.contains('/') {
        return Err(invalid());
    }
    Ok(local)
}

/// Folder path for receipts uploaded by `email` on `date`.
pub fn derive_folder_path(date: NaiveDate, email: &str) -> Result<String, AppError> {
    let local = email_local_part(email)?;
    Ok(format!(
        "{}/{}/{}",
        ROOT_FOLDER_NAME,
        local,
        date.format("%Y-%m-%d")
    ))
}

/// Folder path for an upload at `uploaded_at` (UTC calendar day).
pub fn folder_path_at(uploaded_at: DateTime<Utc>, email: &str) -> Result<String, AppError> {
    derive_folder_path(uploaded_at.date_naive(), email)
}

/// Drive file name for an upload at `uploaded_at`.
///
/// ISO-8601 with `:` and `.` replaced by `-`, e.g.
/// `receipt-2024-03-05T10-11-12-123Z.jpg`.
pub fn receipt_file_name(uploaded_at: DateTime<Utc>) -> String {
    format!("receipt-{}.jpg", uploaded_at.format("%Y-%m-%dT%H-%M-%S-%3fZ"))
}

/// Non-empty segments of a slash-separated folder path.
pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_derive_folder_path_example() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(
            derive_folder_path(date, "jane@x.com").unwrap(),
            "receipts/jane/2024-03-05"
        );
    }

    #[test]
    fn test_derive_folder_path_is_deterministic() {
        let morning = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 1).unwrap();
        let night = Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 59).unwrap();
        assert_eq!(
            folder_path_at(morning, "jane.doe@example.com").unwrap(),
            folder_path_at(night, "jane.doe@example.com").unwrap()
        );
    }

    #[test]
    fn test_next_day_gets_new_folder() {
        let before = Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 0).unwrap();
        assert_ne!(
            folder_path_at(before, "jane@x.com").unwrap(),
            folder_path_at(after, "jane@x.com").unwrap()
        );
    }

    #[test]
    fn test_email_precondition() {
        assert!(email_local_part("no-at-sign").is_err());
        assert!(email_local_part("@example.com").is_err());
        assert!(email_local_part("a@b@c").is_err());
        assert!(email_local_part("a/b@example.com").is_err());
        assert_eq!(email_local_part("jane+tax@x.com").unwrap(), "jane+tax");
    }

    #[test]
    fn test_receipt_file_name() {
        let at = Utc
            .with_ymd_and_hms(2024, 3, 5, 10, 11, 12)
            .unwrap()
            + chrono::Duration::milliseconds(123);
        assert_eq!(receipt_file_name(at), "receipt-2024-03-05T10-11-12-123Z.jpg");
    }

    #[test]
    fn test_path_segments_skip_empty() {
        let segments: Vec<&str> = path_segments("/receipts//jane/2024-03-05/").collect();
        assert_eq!(segments, vec!["receipts", "jane", "2024-03-05"]);
    }
}
