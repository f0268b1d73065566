//! Catalog reader: discovers uploaded videos by listing vaults that follow
//! the naming convention and classifying their child records by filename
//! pattern.
//!
//! Classification never fails a listing. A vault whose children match no
//! expected pattern becomes a `Skipped` entry carrying the reason, so the
//! listing stays a listing while the skip rate remains observable.

use crate::{
    models::{
        record::StoredRecord,
        vault::{SEGMENTED_VAULT_PREFIX, SINGLE_FILE_VAULT_PREFIX, Vault},
        video::{CatalogEntry, RecordRef, SegmentedVideoSummary, SingleFileVideoSummary},
    },
    services::vault_store::{StoreResult, VaultStore},
};
use std::collections::BTreeMap;
use tracing::warn;

pub const PLAYLIST_FILENAME: &str = "playlist.m3u8";
pub const SEGMENT_FILENAME_PREFIX: &str = "segment_";
pub const THUMBNAIL_FILENAME: &str = "thumbnail.png";

/// Assembles per-video summaries from raw vault listings.
#[derive(Clone)]
pub struct CatalogReader {
    store: VaultStore,
}

impl CatalogReader {
    pub fn new(store: VaultStore) -> Self {
        Self { store }
    }

    /// List segmented videos: vaults named `WALTUBE_VIDEO_*` holding a
    /// playlist record and zero or more `segment_*` chunk records.
    pub async fn list_segmented(&self) -> StoreResult<Vec<CatalogEntry<SegmentedVideoSummary>>> {
        let mut entries = Vec::new();
        for vault in self.vaults_with_prefix(SEGMENTED_VAULT_PREFIX).await? {
            let entry = match self.store.list_records(vault.id).await {
                Ok(records) => classify_segmented(&vault, &records),
                Err(err) => skipped(&vault, format!("failed to list records: {err}")),
            };
            if let CatalogEntry::Skipped { reason, .. } = &entry {
                warn!(vault_id = %vault.id, reason = %reason, "skipping vault");
            }
            entries.push(entry);
        }
        Ok(entries)
    }

    /// List single-file videos: vaults named `WALTUBE_MP4_*` holding at least
    /// one quality-tagged `.mp4` record, plus an optional thumbnail.
    pub async fn list_single_file(
        &self,
    ) -> StoreResult<Vec<CatalogEntry<SingleFileVideoSummary>>> {
        let mut entries = Vec::new();
        for vault in self.vaults_with_prefix(SINGLE_FILE_VAULT_PREFIX).await? {
            let entry = match self.store.list_records(vault.id).await {
                Ok(records) => classify_single_file(&vault, &records),
                Err(err) => skipped(&vault, format!("failed to list records: {err}")),
            };
            if let CatalogEntry::Skipped { reason, .. } = &entry {
                warn!(vault_id = %vault.id, reason = %reason, "skipping vault");
            }
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn vaults_with_prefix(&self, prefix: &str) -> StoreResult<Vec<Vault>> {
        let vaults = self.store.list_vaults().await?;
        Ok(vaults
            .into_iter()
            .filter(|v| v.name.starts_with(prefix))
            .collect())
    }
}

fn skipped<T>(vault: &Vault, reason: String) -> CatalogEntry<T> {
    CatalogEntry::Skipped {
        vault_id: vault.id,
        vault_name: vault.name.clone(),
        reason,
    }
}

/// Classify a segmented-video vault's records.
pub fn classify_segmented(
    vault: &Vault,
    records: &[StoredRecord],
) -> CatalogEntry<SegmentedVideoSummary> {
    let Some(playlist) = records.iter().find(|r| r.name == PLAYLIST_FILENAME) else {
        return skipped(vault, format!("no `{PLAYLIST_FILENAME}` record"));
    };

    // `list_records` orders by name; zero-padded segment names keep that
    // order identical to playback order.
    let segment_file_ids = records
        .iter()
        .filter(|r| r.name.starts_with(SEGMENT_FILENAME_PREFIX))
        .map(|r| r.id)
        .collect();

    CatalogEntry::Video(SegmentedVideoSummary {
        vault_id: vault.id,
        vault_name: vault.title().to_string(),
        playlist_file_id: playlist.id,
        segment_file_ids,
        created_at: vault.created_at,
    })
}

/// Classify a single-file-video vault's records.
pub fn classify_single_file(
    vault: &Vault,
    records: &[StoredRecord],
) -> CatalogEntry<SingleFileVideoSummary> {
    let mut qualities = BTreeMap::new();
    let mut total_size = 0;
    for record in records {
        if let Some(quality) = quality_from_name(&record.name) {
            total_size += record.size_bytes;
            qualities.insert(quality, record_ref(record));
        }
    }

    if qualities.is_empty() {
        return skipped(vault, "no quality-tagged `.mp4` records".into());
    }

    let thumbnail = records
        .iter()
        .find(|r| r.name == THUMBNAIL_FILENAME)
        .map(record_ref);

    CatalogEntry::Video(SingleFileVideoSummary {
        vault_id: vault.id,
        vault_name: vault.title().to_string(),
        quality_count: qualities.len(),
        qualities,
        thumbnail,
        total_size,
        created_at: vault.created_at,
    })
}

fn record_ref(record: &StoredRecord) -> RecordRef {
    RecordRef {
        file_id: record.id,
        file_name: record.name.clone(),
        file_size: record.size_bytes,
    }
}

/// Extract the quality label from a `{name}_{quality}.mp4` filename, where
/// the quality is digits followed by `p` (e.g. `720p`).
pub fn quality_from_name(name: &str) -> Option<String> {
    let stem = name.strip_suffix(".mp4")?;
    let (_, quality) = stem.rsplit_once('_')?;
    let digits = quality.strip_suffix('p')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(quality.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn vault(name: &str) -> Vault {
        Vault {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }

    fn record(vault: &Vault, name: &str, size: i64) -> StoredRecord {
        StoredRecord {
            id: Uuid::new_v4(),
            vault_id: vault.id,
            name: name.to_string(),
            content_type: None,
            size_bytes: size,
            etag: None,
            folder: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn quality_suffix_parsing() {
        assert_eq!(quality_from_name("movie_720p.mp4"), Some("720p".into()));
        assert_eq!(quality_from_name("a_b_1080p.mp4"), Some("1080p".into()));
        assert_eq!(quality_from_name("movie.mp4"), None);
        assert_eq!(quality_from_name("movie_720p.webm"), None);
        assert_eq!(quality_from_name("movie_hd.mp4"), None);
        assert_eq!(quality_from_name("movie_p.mp4"), None);
    }

    #[test]
    fn segmented_vault_with_playlist_is_a_video() {
        let v = vault("WALTUBE_VIDEO_trip");
        let records = vec![
            record(&v, "playlist.m3u8", 120),
            record(&v, "segment_000.webm", 1000),
            record(&v, "segment_001.webm", 900),
            record(&v, "notes.txt", 5),
        ];
        let summary = classify_segmented(&v, &records).video().unwrap();
        assert_eq!(summary.vault_name, "trip");
        assert_eq!(summary.segment_file_ids.len(), 2);
    }

    #[test]
    fn vault_with_only_unrelated_records_is_skipped() {
        let v = vault("WALTUBE_VIDEO_junk");
        let records = vec![record(&v, "readme.txt", 5)];
        assert!(classify_segmented(&v, &records).is_skipped());

        let v = vault("WALTUBE_MP4_junk");
        let records = vec![record(&v, "cover.jpeg", 5)];
        assert!(classify_single_file(&v, &records).is_skipped());
    }

    #[test]
    fn single_file_vault_aggregates_qualities() {
        let v = vault("WALTUBE_MP4_trip");
        let records = vec![
            record(&v, "thumbnail.png", 40),
            record(&v, "trip_1080p.mp4", 5000),
            record(&v, "trip_720p.mp4", 3000),
            record(&v, "extras.zip", 99),
        ];
        let summary = classify_single_file(&v, &records).video().unwrap();
        assert_eq!(summary.quality_count, 2);
        assert_eq!(summary.total_size, 8000);
        assert_eq!(
            summary.thumbnail.as_ref().unwrap().file_name,
            "thumbnail.png"
        );
        assert!(summary.qualities.contains_key("720p"));
        assert!(summary.qualities.contains_key("1080p"));
    }
}
