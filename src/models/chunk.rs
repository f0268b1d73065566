//! A fixed-duration encoded clip produced by the segment encoder.

use bytes::Bytes;

/// One encoded clip of the source video.
///
/// Chunks are immutable once produced and referenced by index in the
/// playlist. Durations are seconds; every chunk except possibly the last
/// carries the full window length.
#[derive(Clone, Debug)]
pub struct MediaChunk {
    /// Zero-based position in the chunk sequence.
    pub index: usize,

    /// Encoded clip payload.
    pub payload: Bytes,

    /// Clip duration in seconds.
    pub duration: f64,
}

impl MediaChunk {
    /// Canonical filename for a chunk at `index`: `segment_000.webm`.
    pub fn filename(index: usize) -> String {
        format!("segment_{index:03}.webm")
    }
}
