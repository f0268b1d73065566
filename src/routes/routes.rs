//! Defines routes for the storage, catalog, streaming, and wallet surface.
//!
//! ## Structure
//! - **Storage gateway**
//!   - `POST /api/connect` — (re)connect check against the storage backend
//!   - `POST /api/upload` — upload a segmented video (multipart)
//!   - `POST /api/upload-single` — upload a single/multi-quality file (multipart)
//!
//! - **Catalog reader**
//!   - `GET /api/videos` — list segmented videos
//!   - `GET /api/single-file-videos` — list single-file videos
//!
//! - **Stream/download gateway**
//!   - `GET /api/download/{record_id}` — full bytes, attachment disposition
//!   - `GET /api/stream/{record_id}` — pass-through stream for inline playback
//!
//! - **Wallet**
//!   - `POST /api/wallet/public-key` — resolve a user's wallet public key

use crate::{
    handlers::{
        catalog_handlers::{list_single_file_videos, list_videos},
        health_handlers::{healthz, readyz},
        storage_handlers::{connect, download, stream, upload, upload_single_file},
        wallet_handlers::wallet_public_key,
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Upload requests carry whole encoded videos; the default 2 MB multipart
/// limit is far too small.
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Build and return the router for the whole HTTP surface.
///
/// The router carries shared state (`AppState`) to all handlers; every
/// handler talks to the one store/identity client constructed at startup.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // storage gateway
        .route("/api/connect", post(connect))
        .route("/api/upload", post(upload))
        .route("/api/upload-single", post(upload_single_file))
        // catalog reader
        .route("/api/videos", get(list_videos))
        .route("/api/single-file-videos", get(list_single_file_videos))
        // stream/download gateway
        .route("/api/download/{record_id}", get(download))
        .route("/api/stream/{record_id}", get(stream))
        // wallet
        .route("/api/wallet/public-key", post(wallet_public_key))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
