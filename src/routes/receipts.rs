// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Receipt routes (require authentication).

use crate::config::MAX_UPLOAD_BYTES;
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::Receipt;
use crate::routes::auth::MessageResponse;
use crate::services::gallery::{
    apply_filter, group_by_day, DateWindow, GalleryFilter, ReceiptGroup, SortOrder,
};
use crate::AppState;
use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        rejection::{PathRejection, QueryRejection},
        DefaultBodyLimit, Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Multipart field carrying the image.
pub const UPLOAD_FIELD: &str = "receipt";

/// Room for multipart framing on top of the image itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

const DEFAULT_RECENT_LIMIT: usize = 20;
const MAX_RECENT_LIMIT: usize = 500;

/// Receipt routes. The auth middleware is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/receipts", get(list_receipts))
        .route("/api/receipts/recent", get(recent_receipts))
        .route("/api/receipts/grouped", get(grouped_receipts))
        .route(
            "/api/receipts/upload",
            post(upload_receipt)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route(
            "/api/receipts/{id}",
            get(get_receipt).delete(delete_receipt),
        )
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    window: Option<DateWindow>,
    #[serde(default)]
    sort: Option<SortOrder>,
    /// First upload day to include (`YYYY-MM-DD`, UTC)
    #[serde(default)]
    from: Option<NaiveDate>,
    /// Last upload day to include (`YYYY-MM-DD`, UTC)
    #[serde(default)]
    to: Option<NaiveDate>,
}

impl ListQuery {
    fn filter(&self) -> GalleryFilter {
        GalleryFilter {
            search: self.search.clone(),
            window: self.window.unwrap_or_default(),
            sort: self.sort.unwrap_or_default(),
        }
    }
}

fn bad_query(rejection: QueryRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

/// Receipts for the user, narrowed by the optional day range, then filtered.
async fn filtered_receipts(
    state: &AppState,
    user_id: u64,
    query: &ListQuery,
) -> Result<Vec<Receipt>> {
    let receipts = match (query.from, query.to) {
        (None, None) => state.db.list_receipts_for_user(user_id).await?,
        (from, to) => {
            if let (Some(from), Some(to)) = (from, to) {
                if from > to {
                    return Err(AppError::BadRequest(
                        "`from` must not be after `to`".to_string(),
                    ));
                }
            }
            let start = from
                .map(|d| d.and_time(NaiveTime::MIN).and_utc())
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            let end = to
                .and_then(|d| d.succ_opt())
                .map(|d| {
                    d.and_time(NaiveTime::MIN).and_utc() - chrono::Duration::nanoseconds(1)
                })
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            state.db.receipts_in_range(user_id, start, end).await?
        }
    };

    Ok(apply_filter(receipts, &query.filter(), Utc::now()))
}

/// List receipts, newest first unless sorted otherwise.
async fn list_receipts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Receipt>>> {
    let Query(query) = query.map_err(bad_query)?;
    let receipts = filtered_receipts(&state, user.user_id, &query).await?;

    tracing::debug!(user_id = user.user_id, count = receipts.len(), "Listed receipts");
    Ok(Json(receipts))
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    #[serde(default)]
    limit: Option<String>,
}

impl RecentQuery {
    /// Requested count. Missing, unparsable or zero means the default.
    fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .min(MAX_RECENT_LIMIT)
    }
}

/// Most recent receipts.
async fn recent_receipts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    query: std::result::Result<Query<RecentQuery>, QueryRejection>,
) -> Result<Json<Vec<Receipt>>> {
    let Query(query) = query.map_err(bad_query)?;
    let limit = query.limit();
    let receipts = state
        .db
        .recent_receipts_for_user(user.user_id, limit)
        .await?;
    Ok(Json(receipts))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GroupedReceiptsResponse {
    pub groups: Vec<ReceiptGroup>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total: usize,
}

/// Receipts grouped by upload day.
async fn grouped_receipts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<GroupedReceiptsResponse>> {
    let Query(query) = query.map_err(bad_query)?;
    let receipts = filtered_receipts(&state, user.user_id, &query).await?;
    let total = receipts.len();

    Ok(Json(GroupedReceiptsResponse {
        groups: group_by_day(receipts, Utc::now()),
        total,
    }))
}

// ─── Upload ──────────────────────────────────────────────────

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(MAX_UPLOAD_BYTES)
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// Upload one receipt image (multipart field `receipt`).
async fn upload_receipt(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Receipt>> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_name = field
            .file_name()
            .filter(|n| !n.is_empty())
            .unwrap_or("receipt.jpg")
            .to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((original_name, bytes));
        break;
    }

    let (original_name, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::PayloadTooLarge(MAX_UPLOAD_BYTES));
    }

    tracing::info!(
        user_id = user.user_id,
        original_name = %original_name,
        size = bytes.len(),
        "Receipt upload received"
    );

    let receipt = state
        .receipts
        .upload(user.user_id, original_name, bytes.to_vec())
        .await?;

    Ok(Json(receipt))
}

// ─── Single receipt ──────────────────────────────────────────

fn receipt_id(path: std::result::Result<Path<u64>, PathRejection>) -> Result<u64> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::NotFound("Receipt not found".to_string()))
}

async fn get_receipt(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    path: std::result::Result<Path<u64>, PathRejection>,
) -> Result<Json<Receipt>> {
    let id = receipt_id(path)?;
    Ok(Json(state.receipts.get(user.user_id, id).await?))
}

async fn delete_receipt(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    path: std::result::Result<Path<u64>, PathRejection>,
) -> Result<Json<MessageResponse>> {
    let id = receipt_id(path)?;
    state.receipts.delete(user.user_id, id).await?;

    Ok(Json(MessageResponse {
        message: "Receipt deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recent(limit: Option<&str>) -> usize {
        RecentQuery {
            limit: limit.map(str::to_string),
        }
        .limit()
    }

    #[test]
    fn test_recent_limit_falls_back_to_default() {
        assert_eq!(recent(None), DEFAULT_RECENT_LIMIT);
        assert_eq!(recent(Some("")), DEFAULT_RECENT_LIMIT);
        assert_eq!(recent(Some("0")), DEFAULT_RECENT_LIMIT);
        assert_eq!(recent(Some("ten")), DEFAULT_RECENT_LIMIT);
        assert_eq!(recent(Some("-3")), DEFAULT_RECENT_LIMIT);
    }

    #[test]
    fn test_recent_limit_is_clamped() {
        assert_eq!(recent(Some("2")), 2);
        assert_eq!(recent(Some(" 7 ")), 7);
        assert_eq!(recent(Some("501")), MAX_RECENT_LIMIT);
        assert_eq!(recent(Some("99999999999999999999")), DEFAULT_RECENT_LIMIT);
    }
}
