//! VaultStore — the storage backend behind the upload, catalog, and stream
//! gateways. Durable metadata lives in SQLite; record payloads live on local
//! disk beneath `base_path/{vault_id}/{record_id}`.
//!
//! One store client is constructed at process start and shared through router
//! state. There is no lazily-initialized module global; reconnection is the
//! explicit `ping` check exposed by the connect route.

use crate::models::{record::StoredRecord, vault::Vault};
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut};
use md5::Context;
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::PathBuf,
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_NAME_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("vault `{0}` not found")]
    VaultNotFound(Uuid),
    #[error("record `{0}` not found")]
    RecordNotFound(Uuid),
    #[error("name `{name}` invalid: {reason}")]
    InvalidName { name: String, reason: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Apply the embedded, idempotent schema SQL statement-by-statement.
pub async fn apply_schema(db: &SqlitePool) -> StoreResult<()> {
    let sql = include_str!("../../migrations/0001_init.sql");
    for stmt in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(stmt).execute(db).await?;
    }
    Ok(())
}

/// Vault/record storage operations used by every server route:
/// - create a vault (one per uploaded video)
/// - upload a record into a vault (streamed to disk, metadata in SQLite)
/// - list vaults and the records of a vault
/// - open a record for buffered download or pass-through streaming
/// - ping the backend (connect route and readiness probe)
#[derive(Clone)]
pub struct VaultStore {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where record payloads are stored.
    pub base_path: PathBuf,
}

impl VaultStore {
    /// Create a store backed by the provided SQLite pool, keeping payloads
    /// under `base_path`.
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Validate a vault or record name.
    ///
    /// Names end up in catalog output and (for records) next to payload
    /// files, so reject empties, control characters, and path separators.
    fn ensure_name_safe(&self, name: &str) -> StoreResult<()> {
        if name.is_empty() {
            return Err(StoreError::InvalidName {
                name: name.to_string(),
                reason: "must not be empty".into(),
            });
        }
        if name.len() > MAX_NAME_LEN {
            return Err(StoreError::InvalidName {
                name: name.to_string(),
                reason: format!("must be at most {MAX_NAME_LEN} characters"),
            });
        }
        if name.trim() != name {
            return Err(StoreError::InvalidName {
                name: name.to_string(),
                reason: "cannot begin or end with whitespace".into(),
            });
        }
        if name
            .chars()
            .any(|c| c.is_control() || c == '/' || c == '\\')
        {
            return Err(StoreError::InvalidName {
                name: name.to_string(),
                reason: "control characters and path separators are not allowed".into(),
            });
        }
        Ok(())
    }

    /// Physical payload path for a record.
    fn record_path(&self, vault_id: Uuid, record_id: Uuid) -> PathBuf {
        let mut path = self.base_path.clone();
        path.push(vault_id.to_string());
        path.push(record_id.to_string());
        path
    }

    /// Fetch vault metadata, or `VaultNotFound`.
    async fn fetch_vault(&self, vault_id: Uuid) -> StoreResult<Vault> {
        sqlx::query_as::<_, Vault>("SELECT id, name, created_at FROM vaults WHERE id = ?")
            .bind(vault_id)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => StoreError::VaultNotFound(vault_id),
                other => StoreError::Sqlx(other),
            })
    }

    /// Fetch record metadata, or `RecordNotFound`.
    async fn fetch_record(&self, record_id: Uuid) -> StoreResult<StoredRecord> {
        sqlx::query_as::<_, StoredRecord>(
            "SELECT id, vault_id, name, content_type, size_bytes, etag, folder, created_at
             FROM records WHERE id = ?",
        )
        .bind(record_id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StoreError::RecordNotFound(record_id),
            other => StoreError::Sqlx(other),
        })
    }

    /// Create a vault and initialize its payload directory.
    ///
    /// Vault names are not unique; the store-assigned id is the key, so two
    /// uploads with the same title simply produce two vaults.
    pub async fn create_vault(&self, name: &str) -> StoreResult<Vault> {
        self.ensure_name_safe(name)?;

        let vault = Vault {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        fs::create_dir_all(self.base_path.join(vault.id.to_string())).await?;

        sqlx::query("INSERT INTO vaults (id, name, created_at) VALUES (?, ?, ?)")
            .bind(vault.id)
            .bind(&vault.name)
            .bind(vault.created_at)
            .execute(&*self.db)
            .await?;

        debug!(vault_id = %vault.id, name = %vault.name, "created vault");
        Ok(vault)
    }

    /// List all vaults, oldest first.
    pub async fn list_vaults(&self) -> StoreResult<Vec<Vault>> {
        let vaults = sqlx::query_as::<_, Vault>(
            "SELECT id, name, created_at FROM vaults ORDER BY created_at ASC, name ASC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(vaults)
    }

    /// List the records of a vault, ordered by name.
    pub async fn list_records(&self, vault_id: Uuid) -> StoreResult<Vec<StoredRecord>> {
        self.fetch_vault(vault_id).await?;
        let records = sqlx::query_as::<_, StoredRecord>(
            "SELECT id, vault_id, name, content_type, size_bytes, etag, folder, created_at
             FROM records WHERE vault_id = ? ORDER BY name ASC",
        )
        .bind(vault_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(records)
    }

    /// Stream-upload a record into a vault.
    ///
    /// Writes bytes incrementally to a temporary file, computing the MD5 etag
    /// and size along the way, fsyncs, renames into place, then inserts the
    /// metadata row. Temp files are removed on every error path.
    pub async fn upload_record<S>(
        &self,
        vault_id: Uuid,
        name: &str,
        content_type: Option<String>,
        folder: Option<String>,
        stream: S,
    ) -> StoreResult<StoredRecord>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        self.ensure_name_safe(name)?;
        let vault = self.fetch_vault(vault_id).await?;

        let record_id = Uuid::new_v4();
        let file_path = self.record_path(vault.id, record_id);
        let parent = file_path
            .parent()
            .map(PathBuf::from)
            .ok_or_else(|| StoreError::Io(io::Error::other("record path missing parent")))?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{record_id}"));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: i64 = 0;
        let mut digest = Context::new();
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(StoreError::Io(err));
                }
            };
            size_bytes += chunk.len() as i64;
            digest.consume(&chunk);
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }

        let record = StoredRecord {
            id: record_id,
            vault_id: vault.id,
            name: name.to_string(),
            content_type,
            size_bytes,
            etag: Some(format!("{:x}", digest.compute())),
            folder,
            created_at: Utc::now(),
        };

        let insert_result = sqlx::query(
            "INSERT INTO records (id, vault_id, name, content_type, size_bytes, etag, folder, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id)
        .bind(record.vault_id)
        .bind(&record.name)
        .bind(&record.content_type)
        .bind(record.size_bytes)
        .bind(&record.etag)
        .bind(&record.folder)
        .bind(record.created_at)
        .execute(&*self.db)
        .await;

        match insert_result {
            Ok(_) => {
                debug!(record_id = %record.id, vault_id = %vault.id, name = %record.name,
                       size = record.size_bytes, "uploaded record");
                Ok(record)
            }
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                Err(StoreError::Sqlx(err))
            }
        }
    }

    /// Upload a record whose payload is already fully in memory.
    pub async fn upload_record_bytes(
        &self,
        vault_id: Uuid,
        name: &str,
        content_type: Option<String>,
        folder: Option<String>,
        payload: Bytes,
    ) -> StoreResult<StoredRecord> {
        let stream = futures::stream::once(async move { Ok(payload) });
        self.upload_record(vault_id, name, content_type, folder, stream)
            .await
    }

    /// Open a record for reading.
    ///
    /// Returns metadata and a `File` handle ready for pass-through streaming.
    /// Metadata without a physical file maps to `RecordNotFound`.
    pub async fn record_reader(&self, record_id: Uuid) -> StoreResult<(StoredRecord, File)> {
        let record = self.fetch_record(record_id).await?;
        let file_path = self.record_path(record.vault_id, record.id);
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StoreError::RecordNotFound(record_id)
            } else {
                StoreError::Io(err)
            }
        })?;
        Ok((record, file))
    }

    /// Read a record's full payload into memory (download path).
    pub async fn record_bytes(&self, record_id: Uuid) -> StoreResult<(StoredRecord, Vec<u8>)> {
        let record = self.fetch_record(record_id).await?;
        let file_path = self.record_path(record.vault_id, record.id);
        let bytes = fs::read(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StoreError::RecordNotFound(record_id)
            } else {
                StoreError::Io(err)
            }
        })?;
        Ok((record, bytes))
    }

    /// Verify the backend is usable: a metadata query plus a payload-root
    /// write/read/delete round trip. Used by the connect route and the
    /// readiness probe.
    pub async fn ping(&self) -> StoreResult<()> {
        let value = sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        if value != 1 {
            return Err(StoreError::Unavailable(format!(
                "metadata check returned unexpected value {value}"
            )));
        }

        let probe = self.base_path.join(format!(".connect-{}", Uuid::new_v4()));
        fs::write(&probe, b"ping").await?;
        let read_back = fs::read(&probe).await?;
        let _ = fs::remove_file(&probe).await;
        if read_back != b"ping" {
            return Err(StoreError::Unavailable(
                "payload root read-back mismatch".into(),
            ));
        }
        Ok(())
    }
}
