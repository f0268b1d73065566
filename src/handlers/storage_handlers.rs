//! HTTP handlers for the connect, upload, and download/stream gateways.
//!
//! Upload requests are validated in full before the first store call, so a
//! rejected request never leaves a vault behind. A store failure mid-upload
//! aborts the request without cleanup; the catalog reader tolerates the
//! resulting partial vault by reporting it as skipped.

use crate::{
    errors::AppError,
    models::{
        playlist::Playlist,
        vault::{SEGMENTED_VAULT_PREFIX, SINGLE_FILE_VAULT_PREFIX},
        video::RecordRef,
    },
    services::{
        catalog::{PLAYLIST_FILENAME, THUMBNAIL_FILENAME},
        staging::{StagedChunk, StagedPlaylist},
        vault_store::VaultStore,
    },
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use tokio_util::io::ReaderStream;
use tracing::info;
use uuid::Uuid;

const PLAYLIST_MIME: &str = "application/vnd.apple.mpegurl";
const SEGMENT_MIME: &str = "video/webm";
const VIDEO_MIME: &str = "video/mp4";
const THUMBNAIL_MIME: &str = "image/png";
const SEGMENTS_FOLDER: &str = "segments";

/// `POST /api/connect` — explicit (re)connect check against the store.
pub async fn connect(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.store.ping().await?;
    Ok(Json(json!({
        "success": true,
        "message": "Connected to storage backend successfully",
        "apiKeyConfigured": !state.storage_api_key.is_empty(),
    })))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub vault_id: Uuid,
    pub playlist_file_id: Uuid,
    pub segment_file_ids: Vec<Uuid>,
}

/// `POST /api/upload` — store a segmented video.
///
/// Multipart fields: `videoName` (text), `playlist` (JSON, staged playlist),
/// `segments` (JSON, staged chunk list).
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut video_name: Option<String> = None;
    let mut playlist_field: Option<StagedPlaylist> = None;
    let mut segments_field: Option<Vec<StagedChunk>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("malformed multipart body: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let text = field
            .text()
            .await
            .map_err(|err| AppError::bad_request(format!("reading field `{name}`: {err}")))?;
        match name.as_str() {
            "videoName" => video_name = Some(text),
            "playlist" => {
                playlist_field = Some(serde_json::from_str(&text).map_err(|err| {
                    AppError::bad_request(format!("invalid `playlist` field: {err}"))
                })?)
            }
            "segments" => {
                segments_field = Some(serde_json::from_str(&text).map_err(|err| {
                    AppError::bad_request(format!("invalid `segments` field: {err}"))
                })?)
            }
            _ => {}
        }
    }

    // validate everything before touching the store
    let video_name = non_empty(video_name, "videoName")?;
    let playlist = playlist_field.ok_or_else(|| AppError::bad_request("`playlist` is required"))?;
    let staged = segments_field.ok_or_else(|| AppError::bad_request("`segments` is required"))?;
    if staged.is_empty() {
        return Err(AppError::bad_request("at least one segment is required"));
    }
    Playlist::parse(&playlist.content)?;
    let mut payloads: Vec<(String, Bytes)> = Vec::with_capacity(staged.len());
    for chunk in &staged {
        payloads.push((chunk.name.clone(), chunk.payload()?));
    }

    let vault = state
        .store
        .create_vault(&format!("{SEGMENTED_VAULT_PREFIX}{video_name}"))
        .await?;

    let playlist_record = state
        .store
        .upload_record_bytes(
            vault.id,
            PLAYLIST_FILENAME,
            Some(PLAYLIST_MIME.into()),
            None,
            Bytes::from(playlist.content.into_bytes()),
        )
        .await?;

    let mut segment_file_ids = Vec::with_capacity(payloads.len());
    for (name, payload) in payloads {
        let record = state
            .store
            .upload_record_bytes(
                vault.id,
                &name,
                Some(SEGMENT_MIME.into()),
                Some(SEGMENTS_FOLDER.into()),
                payload,
            )
            .await?;
        segment_file_ids.push(record.id);
    }

    info!(vault_id = %vault.id, segments = segment_file_ids.len(), name = %video_name,
          "stored segmented video");
    Ok(Json(UploadResponse {
        success: true,
        vault_id: vault.id,
        playlist_file_id: playlist_record.id,
        segment_file_ids,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedSingleFiles {
    pub qualities: HashMap<String, RecordRef>,
    pub thumbnail: Option<RecordRef>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSingleFileResponse {
    pub success: bool,
    pub vault_id: Uuid,
    pub vault_name: String,
    pub uploaded_files: UploadedSingleFiles,
    pub quality_count: usize,
}

/// `POST /api/upload-single` — store a single-file video with one record per
/// requested quality plus an optional thumbnail.
///
/// Multipart fields: `videoName` (text), `qualities` (JSON array of quality
/// labels), `thumbnail` (optional file), and one `video_{quality}` file per
/// requested quality. A declared quality without its file part is a 400
/// before any vault is created.
pub async fn upload_single_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut video_name: Option<String> = None;
    let mut qualities: Option<Vec<String>> = None;
    let mut thumbnail: Option<Bytes> = None;
    let mut files: HashMap<String, Bytes> = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("malformed multipart body: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "videoName" => {
                video_name = Some(field.text().await.map_err(|err| {
                    AppError::bad_request(format!("reading field `videoName`: {err}"))
                })?)
            }
            "qualities" => {
                let text = field.text().await.map_err(|err| {
                    AppError::bad_request(format!("reading field `qualities`: {err}"))
                })?;
                qualities = Some(serde_json::from_str(&text).map_err(|err| {
                    AppError::bad_request(format!("invalid `qualities` field: {err}"))
                })?);
            }
            "thumbnail" => {
                thumbnail = Some(field.bytes().await.map_err(|err| {
                    AppError::bad_request(format!("reading `thumbnail` file: {err}"))
                })?)
            }
            other => {
                if let Some(quality) = other.strip_prefix("video_") {
                    let quality = quality.to_string();
                    let bytes = field.bytes().await.map_err(|err| {
                        AppError::bad_request(format!("reading `video_{quality}` file: {err}"))
                    })?;
                    files.insert(quality, bytes);
                }
            }
        }
    }

    let video_name = non_empty(video_name, "videoName")?;
    let qualities = qualities.unwrap_or_default();
    if qualities.is_empty() {
        return Err(AppError::bad_request("at least one quality is required"));
    }
    for quality in &qualities {
        if !files.contains_key(quality) {
            return Err(AppError::bad_request(format!(
                "missing file field `video_{quality}` for requested quality"
            )));
        }
    }

    let vault = state
        .store
        .create_vault(&format!("{SINGLE_FILE_VAULT_PREFIX}{video_name}"))
        .await?;

    let thumbnail_ref = match thumbnail {
        Some(bytes) => Some(
            upload_ref(
                &state.store,
                vault.id,
                THUMBNAIL_FILENAME.to_string(),
                THUMBNAIL_MIME,
                bytes,
            )
            .await?,
        ),
        None => None,
    };

    let mut uploaded = HashMap::with_capacity(qualities.len());
    for quality in &qualities {
        let Some(bytes) = files.remove(quality) else {
            continue; // every requested quality was checked above
        };
        let record_ref = upload_ref(
            &state.store,
            vault.id,
            format!("{video_name}_{quality}.mp4"),
            VIDEO_MIME,
            bytes,
        )
        .await?;
        uploaded.insert(quality.clone(), record_ref);
    }

    info!(vault_id = %vault.id, qualities = qualities.len(), name = %video_name,
          "stored single-file video");
    Ok(Json(UploadSingleFileResponse {
        success: true,
        vault_id: vault.id,
        vault_name: video_name,
        quality_count: uploaded.len(),
        uploaded_files: UploadedSingleFiles {
            qualities: uploaded,
            thumbnail: thumbnail_ref,
        },
    }))
}

/// `GET /api/download/{record_id}` — full bytes with an attachment
/// disposition.
pub async fn download(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (record, bytes) = state.store.record_bytes(record_id).await?;

    let mut response = Response::new(Body::from(bytes));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type_value(&record.content_type));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment"),
    );
    Ok(response)
}

/// `GET /api/stream/{record_id}` — pass-through byte stream for inline
/// playback; no disposition header.
pub async fn stream(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (record, file) = state.store.record_reader(record_id).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type_value(&record.content_type));
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&record.size_bytes.max(0).to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    *response.status_mut() = StatusCode::OK;
    Ok(response)
}

async fn upload_ref(
    store: &VaultStore,
    vault_id: Uuid,
    name: String,
    mime: &str,
    bytes: Bytes,
) -> Result<RecordRef, AppError> {
    let record = store
        .upload_record_bytes(vault_id, &name, Some(mime.into()), None, bytes)
        .await?;
    Ok(RecordRef {
        file_id: record.id,
        file_name: record.name,
        file_size: record.size_bytes,
    })
}

fn content_type_value(content_type: &Option<String>) -> HeaderValue {
    content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"))
}

fn non_empty(value: Option<String>, field: &str) -> Result<String, AppError> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::bad_request(format!("`{field}` is required")))?;
    Ok(value)
}
