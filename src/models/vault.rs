//! Represents a vault — a named logical grouping of stored records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Name prefix for vaults holding segmented (playlist + chunks) videos.
pub const SEGMENTED_VAULT_PREFIX: &str = "WALTUBE_VIDEO_";

/// Name prefix for vaults holding single-file (per-quality MP4) videos.
pub const SINGLE_FILE_VAULT_PREFIX: &str = "WALTUBE_MP4_";

/// A vault in the storage backend.
///
/// Vaults act as per-video namespaces for records. The naming convention
/// encodes the logical type (segmented vs. single-file) and the user-supplied
/// title; the identifier is assigned by the store and treated as opaque.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Vault {
    /// Unique identifier for this vault (UUID for internal DB use).
    pub id: Uuid,

    /// Vault name, e.g. `WALTUBE_VIDEO_holiday` or `WALTUBE_MP4_holiday`.
    pub name: String,

    /// When this vault was created.
    pub created_at: DateTime<Utc>,
}

impl Vault {
    /// The user-supplied title with the type prefix stripped.
    pub fn title(&self) -> &str {
        self.name
            .strip_prefix(SEGMENTED_VAULT_PREFIX)
            .or_else(|| self.name.strip_prefix(SINGLE_FILE_VAULT_PREFIX))
            .unwrap_or(&self.name)
    }
}
