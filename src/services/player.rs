//! Sliding-window segment player: a playback-position state machine that
//! keeps a window of upcoming chunks prefetched ahead of the current one.
//!
//! Per playback session the state is the current segment index, the set of
//! buffered indices, and a buffering flag. Concurrent requests for the same
//! index coalesce on a single fetch, so rapid repeated seeks never issue
//! duplicate downloads for an already-buffered or in-flight segment.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex},
};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::warn;

/// Number of segments kept prefetched ahead of the current position.
pub const DEFAULT_PREFETCH_WINDOW: usize = 3;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("segment index {index} out of range (segment count {count})")]
    OutOfRange { index: usize, count: usize },
    #[error("failed to fetch segment {index}: {message}")]
    Fetch { index: usize, message: String },
}

/// Fetches one stored segment's bytes by record identifier.
#[async_trait]
pub trait SegmentFetcher: Send + Sync {
    async fn fetch(&self, segment_id: &str) -> Result<Bytes, String>;
}

struct PlaybackState {
    current: usize,
    playing: bool,
    buffering: bool,
}

struct Inner {
    fetcher: Arc<dyn SegmentFetcher>,
    segment_ids: Vec<String>,
    window: usize,
    /// One cell per segment; a cell initializes exactly once, and concurrent
    /// initializers wait on the first instead of fetching again.
    slots: Vec<OnceCell<Bytes>>,
    state: Mutex<PlaybackState>,
}

/// Playback session over an ordered list of stored segments.
#[derive(Clone)]
pub struct SegmentPlayer {
    inner: Arc<Inner>,
}

impl SegmentPlayer {
    pub fn new(
        fetcher: Arc<dyn SegmentFetcher>,
        segment_ids: Vec<String>,
        window: usize,
    ) -> Self {
        let slots = segment_ids.iter().map(|_| OnceCell::new()).collect();
        Self {
            inner: Arc::new(Inner {
                fetcher,
                segment_ids,
                window: window.max(1),
                slots,
                state: Mutex::new(PlaybackState {
                    current: 0,
                    playing: false,
                    buffering: false,
                }),
            }),
        }
    }

    pub fn segment_count(&self) -> usize {
        self.inner.segment_ids.len()
    }

    pub fn current(&self) -> usize {
        self.inner.state.lock().unwrap().current
    }

    pub fn is_playing(&self) -> bool {
        self.inner.state.lock().unwrap().playing
    }

    pub fn set_playing(&self, playing: bool) {
        self.inner.state.lock().unwrap().playing = playing;
    }

    pub fn is_buffering(&self) -> bool {
        self.inner.state.lock().unwrap().buffering
    }

    /// Indices whose bytes are already fetched.
    pub fn buffered(&self) -> BTreeSet<usize> {
        self.inner
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.get().map(|_| i))
            .collect()
    }

    /// Fetch segment `index` unless already buffered or in flight.
    async fn ensure(&self, index: usize) -> Result<Bytes, PlayerError> {
        let count = self.segment_count();
        let slot = self
            .inner
            .slots
            .get(index)
            .ok_or(PlayerError::OutOfRange { index, count })?;
        slot.get_or_try_init(|| async {
            let id = &self.inner.segment_ids[index];
            self.inner
                .fetcher
                .fetch(id)
                .await
                .map_err(|message| PlayerError::Fetch { index, message })
        })
        .await
        .cloned()
    }

    /// Move playback to `to`.
    ///
    /// Returns the segment bytes: immediately when buffered, otherwise after
    /// a single fetch. The upcoming window `[to, to + window)` is then
    /// prefetched in the background without blocking the returned segment.
    pub async fn advance(&self, to: usize) -> Result<Bytes, PlayerError> {
        let bytes = self.ensure(to).await?;
        self.inner.state.lock().unwrap().current = to;

        let player = self.clone();
        tokio::spawn(async move {
            player.prefetch_window().await;
        });

        Ok(bytes)
    }

    /// Concurrently fetch every not-yet-buffered index in the window starting
    /// at the current position. Individual prefetch failures are logged and
    /// do not interrupt playback of the current segment.
    pub async fn prefetch_window(&self) {
        let (start, window) = {
            let state = self.inner.state.lock().unwrap();
            (state.current, self.inner.window)
        };
        let end = (start + window).min(self.segment_count());
        let missing: Vec<usize> = (start..end)
            .filter(|i| self.inner.slots[*i].get().is_none())
            .collect();
        if missing.is_empty() {
            return;
        }

        self.inner.state.lock().unwrap().buffering = true;
        let fetches = missing.iter().map(|i| self.ensure(*i));
        for result in join_all(fetches).await {
            if let Err(err) = result {
                warn!("prefetch failed: {err}");
            }
        }
        self.inner.state.lock().unwrap().buffering = false;
    }

    /// React to the media "ended" event: advance to the next segment, or
    /// stop at the last one.
    pub async fn on_ended(&self) -> Result<Option<Bytes>, PlayerError> {
        let next = self.current() + 1;
        if next >= self.segment_count() {
            self.set_playing(false);
            return Ok(None);
        }
        self.advance(next).await.map(Some)
    }
}
