//! HTTP handlers for the catalog listing views.

use crate::{errors::AppError, models::video::CatalogEntry, state::AppState};
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use uuid::Uuid;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedVault {
    pub vault_id: Uuid,
    pub vault_name: String,
    pub reason: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse<T> {
    pub videos: Vec<T>,
    /// Vaults present in the store but not recognized as videos. Listed so
    /// the skip rate is observable instead of silently hidden.
    pub skipped: Vec<SkippedVault>,
}

fn partition<T>(entries: Vec<CatalogEntry<T>>) -> ListingResponse<T> {
    let mut videos = Vec::new();
    let mut skipped = Vec::new();
    for entry in entries {
        match entry {
            CatalogEntry::Video(summary) => videos.push(summary),
            CatalogEntry::Skipped {
                vault_id,
                vault_name,
                reason,
            } => skipped.push(SkippedVault {
                vault_id,
                vault_name,
                reason,
            }),
        }
    }
    ListingResponse { videos, skipped }
}

/// `GET /api/videos` — segmented videos.
pub async fn list_videos(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let entries = state.catalog.list_segmented().await?;
    Ok(Json(partition(entries)))
}

/// `GET /api/single-file-videos` — single-file (per-quality) videos.
pub async fn list_single_file_videos(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let entries = state.catalog.list_single_file().await?;
    Ok(Json(partition(entries)))
}
