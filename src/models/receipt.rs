// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Receipt metadata model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Stored receipt record.
///
/// Created once at upload time and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Receipt {
    /// Locally assigned ID (also used as document ID)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    /// Owning user ID
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: u64,
    /// Generated file name in Drive (e.g. `receipt-2024-03-05T10-11-12-123Z.jpg`)
    pub file_name: String,
    /// File name as uploaded by the client
    pub original_name: String,
    /// Drive file ID
    pub google_drive_id: String,
    /// Drive web view link
    pub drive_url: String,
    /// Drive thumbnail link, if Drive generated one yet
    pub thumbnail_url: Option<String>,
    /// Size of the stored (transformed) image in bytes
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub file_size: u64,
    pub mime_type: String,
    pub upload_date: DateTime<Utc>,
    /// Drive folder path, e.g. `receipts/jane/2024-03-05`
    pub folder_path: String,
}

/// Receipt fields known before the store assigns an ID.
#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub user_id: u64,
    pub file_name: String,
    pub original_name: String,
    pub google_drive_id: String,
    pub drive_url: String,
    pub thumbnail_url: Option<String>,
    pub file_size: u64,
    pub mime_type: String,
    pub upload_date: DateTime<Utc>,
    pub folder_path: String,
}

impl NewReceipt {
    pub fn with_id(self, id: u64) -> Receipt {
        Receipt {
            id,
            user_id: self.user_id,
            file_name: self.file_name,
            original_name: self.original_name,
            google_drive_id: self.google_drive_id,
            drive_url: self.drive_url,
            thumbnail_url: self.thumbnail_url,
            file_size: self.file_size,
            mime_type: self.mime_type,
            upload_date: self.upload_date,
            folder_path: self.folder_path,
        }
    }
}

/// Sort receipts newest first, breaking timestamp ties by ID.
pub fn sort_newest_first(receipts: &mut [Receipt]) {
    receipts.sort_by(|a, b| {
        b.upload_date
            .cmp(&a.upload_date)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn receipt(id: u64, hour: u32) -> Receipt {
        NewReceipt {
            user_id: 1,
            file_name: format!("receipt-{id}.jpg"),
            original_name: "IMG_0001.HEIC".to_string(),
            google_drive_id: format!("drive-{id}"),
            drive_url: format!("https://drive.google.com/file/d/drive-{id}/view"),
            thumbnail_url: None,
            file_size: 1024,
            mime_type: "image/jpeg".to_string(),
            upload_date: Utc.with_ymd_and_hms(2024, 3, 5, hour, 0, 0).unwrap(),
            folder_path: "receipts/jane/2024-03-05".to_string(),
        }
        .with_id(id)
    }

    #[test]
    fn test_sort_newest_first() {
        let mut receipts = vec![receipt(1, 8), receipt(2, 12), receipt(3, 12), receipt(4, 9)];
        sort_newest_first(&mut receipts);

        let ids: Vec<u64> = receipts.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2, 4, 1]);
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(receipt(5, 10)).unwrap();

        assert_eq!(json["googleDriveId"], "drive-5");
        assert_eq!(json["folderPath"], "receipts/jane/2024-03-05");
        assert_eq!(json["userId"], 1);
        assert!(json["thumbnailUrl"].is_null());
    }
}
