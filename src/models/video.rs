//! Per-video catalog summaries assembled from vault contents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Reference to one stored record, as exposed to catalog consumers.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordRef {
    pub file_id: Uuid,
    pub file_name: String,
    pub file_size: i64,
}

/// Summary of a segmented (playlist + chunks) video.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SegmentedVideoSummary {
    pub vault_id: Uuid,
    pub vault_name: String,
    pub playlist_file_id: Uuid,
    pub segment_file_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Summary of a single-file video with one record per quality level.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SingleFileVideoSummary {
    pub vault_id: Uuid,
    pub vault_name: String,
    /// Quality label (e.g. `720p`) to the record serving it.
    pub qualities: BTreeMap<String, RecordRef>,
    pub thumbnail: Option<RecordRef>,
    pub total_size: i64,
    pub quality_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Classification outcome for one vault.
///
/// Vaults whose children match no expected naming pattern are reported as
/// `Skipped` with a reason instead of disappearing silently, so listing
/// consumers and operators can observe the skip rate.
#[derive(Serialize, Clone, Debug)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CatalogEntry<T> {
    Video(T),
    Skipped {
        vault_id: Uuid,
        vault_name: String,
        reason: String,
    },
}

impl<T> CatalogEntry<T> {
    pub fn video(self) -> Option<T> {
        match self {
            CatalogEntry::Video(summary) => Some(summary),
            CatalogEntry::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, CatalogEntry::Skipped { .. })
    }
}
