//! The playlist (index) manifest: an HLS-like, line-oriented description of
//! the chunk sequence.
//!
//! The format is produced and consumed only by this system. Parsing accepts
//! exactly what `render` emits — header, target-duration declaration, one
//! `#EXTINF` + filename pair per chunk, end marker — and is not a general
//! HLS validator.

use crate::models::chunk::MediaChunk;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const HEADER: &str = "#EXTM3U";
const VERSION_TAG: &str = "#EXT-X-VERSION:";
const TARGET_DURATION_TAG: &str = "#EXT-X-TARGETDURATION:";
const MEDIA_SEQUENCE_TAG: &str = "#EXT-X-MEDIA-SEQUENCE:";
const EXTINF_TAG: &str = "#EXTINF:";
const END_TAG: &str = "#EXT-X-ENDLIST";

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("playlist missing `{HEADER}` header")]
    MissingHeader,
    #[error("playlist missing `{END_TAG}` end marker")]
    MissingEndMarker,
    #[error("invalid `{tag}` value `{value}`")]
    InvalidTag { tag: &'static str, value: String },
    #[error("`#EXTINF` entry at line {line} has no filename")]
    MissingFilename { line: usize },
    #[error("unexpected line {line}: `{content}`")]
    UnexpectedLine { line: usize, content: String },
}

/// One playlist entry: a chunk duration plus the chunk's filename.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlaylistEntry {
    pub duration: f64,
    pub filename: String,
}

/// Parsed or generated playlist manifest.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Playlist {
    pub version: u32,
    pub target_duration: u32,
    pub media_sequence: u32,
    pub entries: Vec<PlaylistEntry>,
}

impl Playlist {
    /// Derive a playlist from an ordered chunk sequence.
    ///
    /// `target_duration` is the fixed window length the encoder used; it is
    /// regenerated from scratch whenever the chunk sequence changes.
    pub fn from_chunks(chunks: &[MediaChunk], target_duration: u32) -> Self {
        let entries = chunks
            .iter()
            .map(|chunk| PlaylistEntry {
                duration: chunk.duration,
                filename: MediaChunk::filename(chunk.index),
            })
            .collect();
        Self {
            version: 3,
            target_duration,
            media_sequence: 0,
            entries,
        }
    }

    /// Serialize to the line-oriented manifest text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(HEADER);
        out.push('\n');
        out.push_str(&format!("{VERSION_TAG}{}\n", self.version));
        out.push_str(&format!("{TARGET_DURATION_TAG}{}\n", self.target_duration));
        out.push_str(&format!("{MEDIA_SEQUENCE_TAG}{}\n", self.media_sequence));
        for entry in &self.entries {
            out.push_str(&format!("{EXTINF_TAG}{:.6},\n", entry.duration));
            out.push_str(&entry.filename);
            out.push('\n');
        }
        out.push_str(END_TAG);
        out.push('\n');
        out
    }

    /// Parse manifest text back into a playlist.
    pub fn parse(text: &str) -> Result<Self, PlaylistError> {
        let mut lines = text.lines().enumerate();

        match lines.next() {
            Some((_, line)) if line.trim() == HEADER => {}
            _ => return Err(PlaylistError::MissingHeader),
        }

        let mut playlist = Playlist {
            version: 3,
            target_duration: 0,
            media_sequence: 0,
            entries: Vec::new(),
        };
        let mut terminated = false;

        while let Some((idx, raw)) = lines.next() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if line == END_TAG {
                terminated = true;
                break;
            }
            if let Some(value) = line.strip_prefix(VERSION_TAG) {
                playlist.version = parse_tag_value(VERSION_TAG, value)?;
            } else if let Some(value) = line.strip_prefix(TARGET_DURATION_TAG) {
                playlist.target_duration = parse_tag_value(TARGET_DURATION_TAG, value)?;
            } else if let Some(value) = line.strip_prefix(MEDIA_SEQUENCE_TAG) {
                playlist.media_sequence = parse_tag_value(MEDIA_SEQUENCE_TAG, value)?;
            } else if let Some(value) = line.strip_prefix(EXTINF_TAG) {
                let duration_text = value.trim_end_matches(',');
                let duration =
                    duration_text
                        .parse::<f64>()
                        .map_err(|_| PlaylistError::InvalidTag {
                            tag: EXTINF_TAG,
                            value: value.to_string(),
                        })?;
                let filename = lines
                    .next()
                    .map(|(_, l)| l.trim().to_string())
                    .filter(|l| !l.is_empty() && !l.starts_with('#'))
                    .ok_or(PlaylistError::MissingFilename { line: idx + 1 })?;
                playlist.entries.push(PlaylistEntry { duration, filename });
            } else {
                return Err(PlaylistError::UnexpectedLine {
                    line: idx + 1,
                    content: line.to_string(),
                });
            }
        }

        if !terminated {
            return Err(PlaylistError::MissingEndMarker);
        }
        Ok(playlist)
    }

    /// Ordered chunk durations, as declared by the manifest.
    pub fn durations(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.duration).collect()
    }
}

fn parse_tag_value(tag: &'static str, value: &str) -> Result<u32, PlaylistError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| PlaylistError::InvalidTag {
            tag,
            value: value.to_string(),
        })
}
