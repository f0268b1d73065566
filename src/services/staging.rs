//! Local staging store: persists encoded chunks and their playlist between
//! sessions so an upload can pick them up without re-encoding.
//!
//! Storage is a pair of JSON documents under fixed keys in a staging
//! directory, chunks base64-encoded. No versioning and no size limits are
//! enforced here; callers must tolerate the backing storage's capacity.

use crate::models::{chunk::MediaChunk, playlist::Playlist};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::{io::ErrorKind, path::PathBuf};
use thiserror::Error;
use tokio::fs;

const SEGMENTS_KEY: &str = "waltube_segments";
const PLAYLIST_KEY: &str = "waltube_playlist";

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("staged data is corrupt: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One staged chunk: filename, base64 payload, original size.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StagedChunk {
    pub name: String,
    pub data: String,
    pub size: usize,
}

impl StagedChunk {
    pub fn from_chunk(chunk: &MediaChunk) -> Self {
        Self {
            name: MediaChunk::filename(chunk.index),
            data: general_purpose::STANDARD.encode(&chunk.payload),
            size: chunk.payload.len(),
        }
    }

    /// Decode the base64 payload back into bytes.
    pub fn payload(&self) -> Result<Bytes, StagingError> {
        general_purpose::STANDARD
            .decode(&self.data)
            .map(Bytes::from)
            .map_err(|err| StagingError::Corrupt(format!("chunk `{}`: {err}", self.name)))
    }
}

/// The staged playlist: rendered manifest text plus its filename.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StagedPlaylist {
    pub content: String,
    pub file_name: String,
}

impl StagedPlaylist {
    pub fn from_playlist(playlist: &Playlist) -> Self {
        Self {
            content: playlist.render(),
            file_name: "playlist.m3u8".into(),
        }
    }
}

/// File-backed staging store with `save` / `load` / `clear` semantics.
#[derive(Clone)]
pub struct StagingStore {
    dir: PathBuf,
}

impl StagingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Persist chunks and playlist under the fixed keys, replacing whatever
    /// was staged before.
    pub async fn save(
        &self,
        chunks: &[MediaChunk],
        playlist: &Playlist,
    ) -> Result<(), StagingError> {
        fs::create_dir_all(&self.dir).await?;

        let staged: Vec<StagedChunk> = chunks.iter().map(StagedChunk::from_chunk).collect();
        let segments_json = serde_json::to_vec(&staged)
            .map_err(|err| StagingError::Corrupt(err.to_string()))?;
        let playlist_json = serde_json::to_vec(&StagedPlaylist::from_playlist(playlist))
            .map_err(|err| StagingError::Corrupt(err.to_string()))?;

        fs::write(self.key_path(SEGMENTS_KEY), segments_json).await?;
        fs::write(self.key_path(PLAYLIST_KEY), playlist_json).await?;
        Ok(())
    }

    /// Return the last-saved pair, or `None` when either key is absent.
    pub async fn load(&self) -> Result<Option<(Vec<StagedChunk>, StagedPlaylist)>, StagingError> {
        let segments_raw = match fs::read(self.key_path(SEGMENTS_KEY)).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let playlist_raw = match fs::read(self.key_path(PLAYLIST_KEY)).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let chunks: Vec<StagedChunk> = serde_json::from_slice(&segments_raw)
            .map_err(|err| StagingError::Corrupt(format!("{SEGMENTS_KEY}: {err}")))?;
        let playlist: StagedPlaylist = serde_json::from_slice(&playlist_raw)
            .map_err(|err| StagingError::Corrupt(format!("{PLAYLIST_KEY}: {err}")))?;
        Ok(Some((chunks, playlist)))
    }

    /// Remove both keys. Missing keys are not an error.
    pub async fn clear(&self) -> Result<(), StagingError> {
        for key in [SEGMENTS_KEY, PLAYLIST_KEY] {
            match fs::remove_file(self.key_path(key)).await {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::playlist::Playlist;

    fn sample() -> (Vec<MediaChunk>, Playlist) {
        let chunks = vec![
            MediaChunk {
                index: 0,
                payload: Bytes::from_static(b"first clip"),
                duration: 10.0,
            },
            MediaChunk {
                index: 1,
                payload: Bytes::from_static(b"second"),
                duration: 4.0,
            },
        ];
        let playlist = Playlist::from_chunks(&chunks, 10);
        (chunks, playlist)
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StagingStore::new(dir.path());
        let (chunks, playlist) = sample();

        store.save(&chunks, &playlist).await.unwrap();
        let (staged, staged_playlist) = store.load().await.unwrap().unwrap();

        assert_eq!(staged.len(), 2);
        assert_eq!(staged[0].name, "segment_000.webm");
        assert_eq!(staged[0].payload().unwrap(), chunks[0].payload);
        assert_eq!(staged[1].size, 6);
        assert_eq!(staged_playlist.file_name, "playlist.m3u8");
        assert_eq!(
            Playlist::parse(&staged_playlist.content).unwrap().durations(),
            vec![10.0, 4.0]
        );
    }

    #[tokio::test]
    async fn load_reports_absent_when_never_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = StagingStore::new(dir.path());
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_removes_both_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = StagingStore::new(dir.path());
        let (chunks, playlist) = sample();

        store.save(&chunks, &playlist).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        // clearing twice is fine
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_payload_surfaces_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = StagingStore::new(dir.path());
        let (chunks, playlist) = sample();
        store.save(&chunks, &playlist).await.unwrap();

        let (mut staged, _) = store.load().await.unwrap().unwrap();
        staged[0].data = "!!not base64!!".into();
        assert!(matches!(
            staged[0].payload(),
            Err(StagingError::Corrupt(_))
        ));
    }
}
