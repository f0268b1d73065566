//! Segment encoder: splits a source video's timeline into fixed-duration
//! windows and re-encodes each window into an independent clip.
//!
//! Encoding itself is a black box behind [`ClipSource`]; this module owns the
//! window planning, ordering, duration bookkeeping, cancellation, and the
//! all-or-nothing failure contract. Any clip failure aborts the whole run
//! with a single error and no partial results.

use crate::models::{chunk::MediaChunk, playlist::Playlist};
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Window length used by the upload flow, in seconds.
pub const DEFAULT_WINDOW_SECS: f64 = 10.0;

#[derive(Debug, Error)]
pub enum SegmenterError {
    #[error("source duration {0} is not positive")]
    EmptySource(f64),
    #[error("window length {0} is not positive")]
    InvalidWindow(f64),
    #[error("segmentation cancelled at window {0}")]
    Cancelled(usize),
    #[error("failed to encode window {index}: {message}")]
    Clip { index: usize, message: String },
}

/// Access to a decodable video source.
///
/// Implementations wrap whatever decoder/encoder pair is in use; the
/// segmenter only asks for the total duration and one encoded clip per
/// window. Implementations release per-clip resources when the returned
/// buffers are dropped.
#[async_trait]
pub trait ClipSource: Send + Sync {
    /// Total source duration in seconds.
    fn duration(&self) -> f64;

    /// Encode the window starting at `start` seconds lasting `duration`
    /// seconds into an independent clip.
    async fn extract_clip(&self, start: f64, duration: f64) -> Result<Bytes, String>;
}

/// Result of a completed segmentation run.
#[derive(Debug)]
pub struct SegmentRun {
    pub chunks: Vec<MediaChunk>,
    pub playlist: Playlist,
}

/// Compute per-window durations covering `duration` seconds.
///
/// Produces `ceil(duration / window)` entries; every entry equals `window`
/// except the last, which is truncated to the remainder. The entries sum to
/// `duration` within floating-point tolerance.
pub fn plan_windows(duration: f64, window: f64) -> Result<Vec<f64>, SegmenterError> {
    if !(duration > 0.0) {
        return Err(SegmenterError::EmptySource(duration));
    }
    if !(window > 0.0) {
        return Err(SegmenterError::InvalidWindow(window));
    }

    let count = (duration / window).ceil() as usize;
    let mut windows = Vec::with_capacity(count);
    for i in 0..count {
        let start = i as f64 * window;
        let end = (start + window).min(duration);
        windows.push(end - start);
    }
    Ok(windows)
}

/// Fixed-window segment encoder.
pub struct Segmenter {
    window_secs: f64,
}

impl Segmenter {
    pub fn new(window_secs: f64) -> Self {
        Self { window_secs }
    }

    /// Segment `source` into ordered chunks plus the derived playlist.
    ///
    /// The cancellation token is checked at every window boundary; long
    /// encodes can be aborted mid-flight by the caller.
    pub async fn segment<S: ClipSource>(
        &self,
        source: &S,
        cancel: &CancellationToken,
    ) -> Result<SegmentRun, SegmenterError> {
        let windows = plan_windows(source.duration(), self.window_secs)?;
        debug!(
            windows = windows.len(),
            window_secs = self.window_secs,
            "planned segmentation"
        );

        let mut chunks = Vec::with_capacity(windows.len());
        for (index, window_duration) in windows.iter().copied().enumerate() {
            if cancel.is_cancelled() {
                return Err(SegmenterError::Cancelled(index));
            }
            let start = index as f64 * self.window_secs;
            let payload = source
                .extract_clip(start, window_duration)
                .await
                .map_err(|message| SegmenterError::Clip { index, message })?;
            chunks.push(MediaChunk {
                index,
                payload,
                duration: window_duration,
            });
        }

        let playlist = Playlist::from_chunks(&chunks, self.window_secs.ceil() as u32);
        Ok(SegmentRun { chunks, playlist })
    }
}

/// `ClipSource` over an in-memory payload: each clip is the byte range
/// proportional to its time window. Useful for containerless fixtures and
/// for exercising the pipeline end to end without a real codec.
pub struct ByteRangeClipSource {
    payload: Bytes,
    duration: f64,
}

impl ByteRangeClipSource {
    pub fn new(payload: Bytes, duration: f64) -> Self {
        Self { payload, duration }
    }
}

#[async_trait]
impl ClipSource for ByteRangeClipSource {
    fn duration(&self) -> f64 {
        self.duration
    }

    async fn extract_clip(&self, start: f64, duration: f64) -> Result<Bytes, String> {
        let len = self.payload.len() as f64;
        let begin = ((start / self.duration) * len).floor() as usize;
        let end = (((start + duration) / self.duration) * len).ceil() as usize;
        let end = end.min(self.payload.len());
        if begin > end {
            return Err(format!("clip range {begin}..{end} out of bounds"));
        }
        Ok(self.payload.slice(begin..end))
    }
}
