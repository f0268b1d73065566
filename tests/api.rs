//! End-to-end tests driving the router over in-memory requests, with a
//! file-backed SQLite database and payload directory in a temp dir.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use bytes::Bytes;
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use uuid::Uuid;

use waltube::{
    models::playlist::Playlist,
    routes::routes::routes,
    services::{
        identity::IdentityClient,
        segmenter::{ByteRangeClipSource, Segmenter},
        staging::StagingStore,
        vault_store::{VaultStore, apply_schema},
    },
    state::AppState,
};

const BOUNDARY: &str = "waltube-test-boundary";

async fn test_app() -> (Router, AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("meta.db");
    std::fs::File::create(&db_path).unwrap();
    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite://{}", db_path.display()))
            .await
            .unwrap(),
    );
    apply_schema(&db).await.unwrap();

    let records_dir = dir.path().join("records");
    std::fs::create_dir_all(&records_dir).unwrap();
    let store = VaultStore::new(db, records_dir);

    // never dialed by these tests; validation failures short-circuit first
    let identity = IdentityClient::new("http://127.0.0.1:9", "app-id", "app-secret");
    let state = AppState::new(store, identity, "test-api-key".to_string());
    let app = routes().with_state(state.clone());
    (app, state, dir)
}

fn text_part(buf: &mut Vec<u8>, name: &str, value: &str) {
    buf.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
        .as_bytes(),
    );
}

fn file_part(buf: &mut Vec<u8>, name: &str, filename: &str, bytes: &[u8]) {
    buf.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
             filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    buf.extend_from_slice(bytes);
    buf.extend_from_slice(b"\r\n");
}

fn finish(buf: &mut Vec<u8>) {
    buf.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
}

fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn segmented_pipeline_round_trips_through_the_store() {
    let (app, _state, dir) = test_app().await;

    // encode a 25 s source with a 10 s window, stage, then upload
    let payload = Bytes::from((0u32..2500).map(|i| (i % 251) as u8).collect::<Vec<u8>>());
    let source = ByteRangeClipSource::new(payload, 25.0);
    let run = Segmenter::new(10.0)
        .segment(&source, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(run.playlist.durations(), vec![10.0, 10.0, 5.0]);

    let staging = StagingStore::new(dir.path().join("staging"));
    staging.save(&run.chunks, &run.playlist).await.unwrap();
    let (staged_chunks, staged_playlist) = staging.load().await.unwrap().unwrap();

    let mut body = Vec::new();
    text_part(&mut body, "videoName", "road trip");
    text_part(
        &mut body,
        "playlist",
        &serde_json::to_string(&staged_playlist).unwrap(),
    );
    text_part(
        &mut body,
        "segments",
        &serde_json::to_string(&staged_chunks).unwrap(),
    );
    finish(&mut body);

    let response = app
        .clone()
        .oneshot(multipart_request("/api/upload", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let uploaded = json_body(response).await;
    assert_eq!(uploaded["success"], json!(true));
    assert_eq!(uploaded["segmentFileIds"].as_array().unwrap().len(), 3);

    // the catalog recognizes the vault and strips the prefix from the title
    let response = app.clone().oneshot(get("/api/videos")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listing = json_body(response).await;
    let videos = listing["videos"].as_array().unwrap();
    assert_eq!(videos.len(), 1);
    assert!(listing["skipped"].as_array().unwrap().is_empty());
    assert_eq!(videos[0]["vaultId"], uploaded["vaultId"]);
    assert_eq!(videos[0]["vaultName"], json!("road trip"));
    assert_eq!(videos[0]["playlistFileId"], uploaded["playlistFileId"]);
    assert_eq!(
        videos[0]["segmentFileIds"].as_array().unwrap().len(),
        3
    );

    // streaming the playlist reproduces the manifest byte for byte
    let playlist_id = uploaded["playlistFileId"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(get(&format!("/api/stream/{playlist_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.apple.mpegurl"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());
    let manifest = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let reparsed = Playlist::parse(std::str::from_utf8(&manifest).unwrap()).unwrap();
    assert_eq!(reparsed.durations(), vec![10.0, 10.0, 5.0]);

    // downloading each segment returns the exact encoded bytes
    for (i, id) in uploaded["segmentFileIds"]
        .as_array()
        .unwrap()
        .iter()
        .enumerate()
    {
        let id = id.as_str().unwrap();
        let response = app
            .clone()
            .oneshot(get(&format!("/api/download/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment"
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/webm");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes, run.chunks[i].payload);
    }
}

#[tokio::test]
async fn upload_rejects_unparseable_playlist_without_creating_a_vault() {
    let (app, _state, _dir) = test_app().await;

    let mut body = Vec::new();
    text_part(&mut body, "videoName", "broken");
    text_part(
        &mut body,
        "playlist",
        &serde_json::to_string(&json!({
            "content": "this is not a manifest",
            "fileName": "playlist.m3u8",
        }))
        .unwrap(),
    );
    text_part(
        &mut body,
        "segments",
        &serde_json::to_string(&json!([
            { "name": "segment_000.webm", "data": "Y2xpcA==", "size": 4 }
        ]))
        .unwrap(),
    );
    finish(&mut body);

    let response = app
        .clone()
        .oneshot(multipart_request("/api/upload", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err = json_body(response).await;
    assert_eq!(err["status"], json!(400));

    let listing = json_body(app.clone().oneshot(get("/api/videos")).await.unwrap()).await;
    assert!(listing["videos"].as_array().unwrap().is_empty());
    assert!(listing["skipped"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn upload_single_missing_quality_file_is_rejected_before_any_write() {
    let (app, _state, _dir) = test_app().await;

    let mut body = Vec::new();
    text_part(&mut body, "videoName", "talk");
    text_part(&mut body, "qualities", r#"["720p"]"#);
    // no video_720p part
    finish(&mut body);

    let response = app
        .clone()
        .oneshot(multipart_request("/api/upload-single", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // the rejected request must not leave a vault behind
    let listing = json_body(
        app.clone()
            .oneshot(get("/api/single-file-videos"))
            .await
            .unwrap(),
    )
    .await;
    assert!(listing["videos"].as_array().unwrap().is_empty());
    assert!(listing["skipped"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn upload_single_stores_one_record_per_quality() {
    let (app, _state, _dir) = test_app().await;

    let hd = vec![1u8; 900];
    let fhd = vec![2u8; 1600];
    let thumb = vec![3u8; 64];

    let mut body = Vec::new();
    text_part(&mut body, "videoName", "talk");
    text_part(&mut body, "qualities", r#"["720p", "1080p"]"#);
    file_part(&mut body, "thumbnail", "thumb.png", &thumb);
    file_part(&mut body, "video_720p", "talk_720p.mp4", &hd);
    file_part(&mut body, "video_1080p", "talk_1080p.mp4", &fhd);
    finish(&mut body);

    let response = app
        .clone()
        .oneshot(multipart_request("/api/upload-single", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let uploaded = json_body(response).await;
    assert_eq!(uploaded["qualityCount"], json!(2));
    assert_eq!(
        uploaded["uploadedFiles"]["thumbnail"]["fileName"],
        json!("thumbnail.png")
    );

    let listing = json_body(
        app.clone()
            .oneshot(get("/api/single-file-videos"))
            .await
            .unwrap(),
    )
    .await;
    let videos = listing["videos"].as_array().unwrap();
    assert_eq!(videos.len(), 1);
    let video = &videos[0];
    assert_eq!(video["qualityCount"], json!(2));
    assert_eq!(video["totalSize"], json!(900 + 1600));
    assert_eq!(
        video["qualities"]["1080p"]["fileName"],
        json!("talk_1080p.mp4")
    );
    assert!(video["thumbnail"].is_object());

    let hd_id = video["qualities"]["720p"]["fileId"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(get(&format!("/api/download/{hd_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.as_ref(), hd.as_slice());
}

#[tokio::test]
async fn vault_without_playlist_is_listed_as_skipped() {
    let (app, state, _dir) = test_app().await;

    let vault = state
        .store
        .create_vault("WALTUBE_VIDEO_orphan")
        .await
        .unwrap();
    state
        .store
        .upload_record_bytes(
            vault.id,
            "segment_000.webm",
            Some("video/webm".into()),
            Some("segments".into()),
            Bytes::from_static(b"clip"),
        )
        .await
        .unwrap();

    let listing = json_body(app.clone().oneshot(get("/api/videos")).await.unwrap()).await;
    assert!(listing["videos"].as_array().unwrap().is_empty());
    let skipped = listing["skipped"].as_array().unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0]["vaultName"], json!("WALTUBE_VIDEO_orphan"));
    assert!(
        skipped[0]["reason"]
            .as_str()
            .unwrap()
            .contains("playlist.m3u8")
    );
}

#[tokio::test]
async fn connect_reports_backend_reachable() {
    let (app, _state, _dir) = test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/connect")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["apiKeyConfigured"], json!(true));
}

#[tokio::test]
async fn download_of_unknown_record_is_not_found() {
    let (app, _state, _dir) = test_app().await;

    let response = app
        .clone()
        .oneshot(get(&format!("/api/download/{}", Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["status"], json!(404));
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn wallet_lookup_requires_a_user_did() {
    let (app, _state, _dir) = test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/wallet/public-key")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("userDid"));
}

#[tokio::test]
async fn readiness_probe_checks_database_and_disk() {
    let (app, _state, _dir) = test_app().await;

    let response = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["checks"]["sqlite"]["ok"], json!(true));
    assert_eq!(body["checks"]["disk"]["ok"], json!(true));
}
