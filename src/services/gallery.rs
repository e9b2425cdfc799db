// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Presentation helpers for receipt listings: search, date windows, sorting
//! and grouping by calendar day.

use crate::models::receipt::sort_newest_first;
use crate::models::Receipt;
use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Relative upload-date window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum DateWindow {
    #[serde(rename = "7days")]
    Last7Days,
    #[serde(rename = "30days")]
    Last30Days,
    #[serde(rename = "3months")]
    Last3Months,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl DateWindow {
    /// Earliest upload instant inside the window.
    pub fn start(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            DateWindow::Last7Days => Some(now - Duration::days(7)),
            DateWindow::Last30Days => Some(now - Duration::days(30)),
            DateWindow::Last3Months => now.checked_sub_months(Months::new(3)),
            DateWindow::All => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    /// By original file name, case-insensitive.
    Name,
}

/// Listing options.
#[derive(Debug, Clone, Default)]
pub struct GalleryFilter {
    pub search: Option<String>,
    pub window: DateWindow,
    pub sort: SortOrder,
}

/// Receipts uploaded on one calendar day.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ReceiptGroup {
    /// e.g. `Today, March 5`, `Yesterday, March 4` or `March 3, 2024`
    pub label: String,
    /// `YYYY-MM-DD`
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    pub receipts: Vec<Receipt>,
}

/// Case-insensitive match on the stored or original file name.
pub fn matches_search(receipt: &Receipt, term: &str) -> bool {
    let term = term.to_lowercase();
    receipt.original_name.to_lowercase().contains(&term)
        || receipt.file_name.to_lowercase().contains(&term)
}

/// Apply search, window and sort.
pub fn apply_filter(
    mut receipts: Vec<Receipt>,
    filter: &GalleryFilter,
    now: DateTime<Utc>,
) -> Vec<Receipt> {
    if let Some(term) = filter.search.as_deref().map(str::trim) {
        if !term.is_empty() {
            receipts.retain(|r| matches_search(r, term));
        }
    }

    if let Some(start) = filter.window.start(now) {
        receipts.retain(|r| r.upload_date >= start);
    }

    match filter.sort {
        SortOrder::Newest => sort_newest_first(&mut receipts),
        SortOrder::Oldest => {
            sort_newest_first(&mut receipts);
            receipts.reverse();
        }
        SortOrder::Name => receipts.sort_by(|a, b| {
            a.original_name
                .to_lowercase()
                .cmp(&b.original_name.to_lowercase())
                .then(b.id.cmp(&a.id))
        }),
    }

    receipts
}

/// Display label for a calendar day relative to `today`.
pub fn day_label(day: NaiveDate, today: NaiveDate) -> String {
    if day == today {
        format!("Today, {}", day.format("%B %-d"))
    } else if today.pred_opt() == Some(day) {
        format!("Yesterday, {}", day.format("%B %-d"))
    } else {
        day.format("%B %-d, %Y").to_string()
    }
}

/// Group receipts by UTC upload day, keeping the incoming order.
///
/// Groups appear in the order their first receipt appears.
pub fn group_by_day(receipts: Vec<Receipt>, now: DateTime<Utc>) -> Vec<ReceiptGroup> {
    let today = now.date_naive();
    let mut groups: Vec<ReceiptGroup> = Vec::new();

    for receipt in receipts {
        let day = receipt.upload_date.date_naive();
        match groups.iter_mut().find(|g| g.date == day) {
            Some(group) => group.receipts.push(receipt),
            None => groups.push(ReceiptGroup {
                label: day_label(day, today),
                date: day,
                receipts: vec![receipt],
            }),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn receipt(id: u64, name: &str, at: DateTime<Utc>) -> Receipt {
        Receipt {
            id,
            user_id: 1,
            file_name: format!("receipt-{}.jpg", id),
            original_name: name.to_string(),
            google_drive_id: format!("file-{}", id),
            drive_url: String::new(),
            thumbnail_url: None,
            file_size: 100,
            mime_type: "image/jpeg".to_string(),
            upload_date: at,
            folder_path: "receipts/jane/2024-03-05".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_day_labels() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(day_label(today, today), "Today, March 5");
        assert_eq!(
            day_label(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(), today),
            "Yesterday, March 4"
        );
        assert_eq!(
            day_label(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(), today),
            "March 3, 2024"
        );
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let receipts = vec![
            receipt(1, "Groceries.png", now()),
            receipt(2, "fuel.jpg", now()),
        ];
        let filter = GalleryFilter {
            search: Some("GROC".to_string()),
            ..Default::default()
        };
        let result = apply_filter(receipts, &filter, now());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, 1);
    }

    #[test]
    fn test_window_and_sort() {
        let receipts = vec![
            receipt(1, "b.png", now() - Duration::days(40)),
            receipt(2, "a.png", now() - Duration::days(3)),
            receipt(3, "c.png", now() - Duration::days(10)),
        ];

        let last_30 = GalleryFilter {
            window: DateWindow::Last30Days,
            sort: SortOrder::Oldest,
            ..Default::default()
        };
        let ids: Vec<u64> = apply_filter(receipts.clone(), &last_30, now())
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![3, 2]);

        let by_name = GalleryFilter {
            sort: SortOrder::Name,
            ..Default::default()
        };
        let ids: Vec<u64> = apply_filter(receipts, &by_name, now())
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_group_by_day() {
        let receipts = vec![
            receipt(3, "c.png", now()),
            receipt(2, "b.png", now() - Duration::hours(2)),
            receipt(1, "a.png", now() - Duration::days(1)),
        ];

        let groups = group_by_day(receipts, now());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "Today, March 5");
        assert_eq!(groups[0].receipts.len(), 2);
        assert_eq!(groups[1].label, "Yesterday, March 4");
        assert_eq!(groups[1].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    }

    #[test]
    fn test_window_parsing() {
        let window: DateWindow = serde_json::from_str("\"3months\"").unwrap();
        assert_eq!(window, DateWindow::Last3Months);
        assert_eq!(
            window.start(now()),
            Some(Utc.with_ymd_and_hms(2023, 12, 5, 12, 0, 0).unwrap())
        );
        assert!(serde_json::from_str::<DateWindow>("\"forever\"").is_err());
    }
}
