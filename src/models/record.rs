//! Represents a stored record (file) inside a vault.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single stored binary object within a vault.
///
/// The struct carries metadata only; payload bytes live on disk under the
/// store's payload root, addressed by vault and record id.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct StoredRecord {
    /// Store-assigned identifier, opaque to callers.
    pub id: Uuid,

    /// Foreign key linking to the parent vault.
    pub vault_id: Uuid,

    /// Record name, e.g. `playlist.m3u8` or `segment_002.webm`.
    pub name: String,

    /// Content type (MIME type).
    pub content_type: Option<String>,

    /// Size in bytes.
    pub size_bytes: i64,

    /// MD5 checksum for integrity verification.
    pub etag: Option<String>,

    /// Optional sub-grouping within the vault (e.g. `segments`).
    pub folder: Option<String>,

    /// Timestamp when the record was uploaded.
    pub created_at: DateTime<Utc>,
}
