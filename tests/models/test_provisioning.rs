// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Model provisioning tests against a local stand-in for the file host
//!
//! The fake host mimics the virus-scan interstitial: it can answer the first
//! GET with a `download_warning*` cookie plus an HTML page, and only serves
//! the file when the token comes back as `confirm`.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use nsfw_detector_node::models::{
    DownloadError, ModelArtifact, ModelProvisioner, ProvisionOutcome,
};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const FILE_ID: &str = "1DF9b21MrgbWV2Zg0sqQBw6vsAgmgugyq";
const TOKEN: &str = "tok42";

#[derive(Clone, Copy)]
enum HostMode {
    /// Serve the file straight away
    Direct,
    /// Require the cookie/confirm handshake
    Confirm,
    /// Hand out the cookie, then fail the confirmed request
    ConfirmThenFail,
    /// Every request fails
    Broken,
    /// Interstitial page with no cookie
    HtmlOnly,
}

#[derive(Clone)]
struct FakeHost {
    mode: HostMode,
    payload: Arc<Vec<u8>>,
    requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn serve_file(
    State(host): State<FakeHost>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    host.requests.lock().unwrap().push(params.clone());

    if params.get("id").map(String::as_str) != Some(FILE_ID) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let file = || {
        (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            host.payload.as_ref().clone(),
        )
            .into_response()
    };

    match host.mode {
        HostMode::Direct => file(),
        HostMode::Confirm | HostMode::ConfirmThenFail => match params.get("confirm") {
            None => warning_page(),
            Some(_) if matches!(host.mode, HostMode::ConfirmThenFail) => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Some(token) if token == TOKEN => file(),
            Some(_) => StatusCode::FORBIDDEN.into_response(),
        },
        HostMode::Broken => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        HostMode::HtmlOnly => (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            "<html>Quota exceeded</html>",
        )
            .into_response(),
    }
}

/// Virus-scan interstitial carrying the confirmation cookie
fn warning_page() -> Response {
    (
        [
            (
                header::SET_COOKIE,
                "download_warning_13058876669334088843_1DF9b=tok42; Path=/",
            ),
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
        ],
        "<html>Google Drive can't scan this file for viruses.</html>",
    )
        .into_response()
}

/// Start the fake host and return its download URL
async fn spawn_host(host: FakeHost) -> String {
    let app = Router::new().route("/uc", get(serve_file)).with_state(host);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/uc?export=download", addr)
}

fn fake_host(mode: HostMode, payload: Vec<u8>) -> FakeHost {
    FakeHost {
        mode,
        payload: Arc::new(payload),
        requests: Arc::new(Mutex::new(Vec::new())),
    }
}

fn model_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn artifact_in(dir: &tempfile::TempDir) -> ModelArtifact {
    ModelArtifact {
        path: dir.path().join("640m.onnx"),
        remote_file_id: FILE_ID.to_string(),
    }
}

#[tokio::test]
async fn test_direct_download() {
    let payload = model_bytes(100_000);
    let host = fake_host(HostMode::Direct, payload.clone());
    let url = spawn_host(host.clone()).await;

    let dir = tempfile::tempdir().unwrap();
    let artifact = artifact_in(&dir);
    let provisioner = ModelProvisioner::new(url).unwrap();

    let outcome = provisioner.ensure_model(&artifact).await.unwrap();
    assert_eq!(
        outcome,
        ProvisionOutcome::Downloaded {
            bytes: payload.len() as u64,
            sha256: sha256_hex(&payload),
        }
    );
    assert_eq!(std::fs::read(&artifact.path).unwrap(), payload);

    let requests = host.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].get("export").map(String::as_str), Some("download"));
    assert!(!requests[0].contains_key("confirm"));
}

#[tokio::test]
async fn test_confirm_handshake() {
    let payload = model_bytes(70_000);
    let host = fake_host(HostMode::Confirm, payload.clone());
    let url = spawn_host(host.clone()).await;

    let dir = tempfile::tempdir().unwrap();
    let artifact = artifact_in(&dir);
    let provisioner = ModelProvisioner::new(url).unwrap();

    let outcome = provisioner.ensure_model(&artifact).await.unwrap();
    assert!(matches!(outcome, ProvisionOutcome::Downloaded { bytes, .. } if bytes == 70_000));
    assert_eq!(std::fs::read(&artifact.path).unwrap(), payload);

    let requests = host.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].contains_key("confirm"));
    assert_eq!(requests[1].get("confirm").map(String::as_str), Some(TOKEN));
    assert_eq!(requests[1].get("id").map(String::as_str), Some(FILE_ID));
}

#[tokio::test]
async fn test_confirmed_request_fails() {
    let host = fake_host(HostMode::ConfirmThenFail, model_bytes(1_000));
    let url = spawn_host(host.clone()).await;

    let dir = tempfile::tempdir().unwrap();
    let artifact = artifact_in(&dir);
    let provisioner = ModelProvisioner::new(url).unwrap();

    let result = provisioner.ensure_model(&artifact).await;
    assert!(matches!(result, Err(DownloadError::HttpStatus { status: 500 })));
    assert!(!artifact.path.exists());

    let requests = host.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].get("confirm").map(String::as_str), Some(TOKEN));
}

#[tokio::test]
async fn test_second_run_skips_download() {
    let payload = model_bytes(1_000);
    let host = fake_host(HostMode::Direct, payload);
    let url = spawn_host(host.clone()).await;

    let dir = tempfile::tempdir().unwrap();
    let artifact = artifact_in(&dir);
    let provisioner = ModelProvisioner::new(url).unwrap();

    provisioner.ensure_model(&artifact).await.unwrap();
    let outcome = provisioner.ensure_model(&artifact).await.unwrap();
    assert_eq!(outcome, ProvisionOutcome::AlreadyPresent);
    assert_eq!(host.requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_host_error_leaves_no_file() {
    let host = fake_host(HostMode::Broken, Vec::new());
    let url = spawn_host(host).await;

    let dir = tempfile::tempdir().unwrap();
    let artifact = artifact_in(&dir);
    let provisioner = ModelProvisioner::new(url).unwrap();

    let result = provisioner.ensure_model(&artifact).await;
    assert!(matches!(result, Err(DownloadError::HttpStatus { status: 500 })));
    assert!(!artifact.path.exists());
}

#[tokio::test]
async fn test_html_page_rejected() {
    let host = fake_host(HostMode::HtmlOnly, Vec::new());
    let url = spawn_host(host).await;

    let dir = tempfile::tempdir().unwrap();
    let artifact = artifact_in(&dir);
    let provisioner = ModelProvisioner::new(url).unwrap();

    let result = provisioner.ensure_model(&artifact).await;
    assert!(matches!(result, Err(DownloadError::UnexpectedHtml)));
    assert!(!artifact.path.exists());
}

#[tokio::test]
async fn test_unknown_file_id() {
    let host = fake_host(HostMode::Direct, model_bytes(10));
    let url = spawn_host(host).await;

    let dir = tempfile::tempdir().unwrap();
    let artifact = ModelArtifact {
        path: dir.path().join("640m.onnx"),
        remote_file_id: "does-not-exist".to_string(),
    };
    let provisioner = ModelProvisioner::new(url).unwrap();

    let result = provisioner.ensure_model(&artifact).await;
    assert!(matches!(result, Err(DownloadError::HttpStatus { status: 404 })));
    assert!(!artifact.path.exists());
}

#[tokio::test]
async fn test_checksum_verified() {
    let payload = model_bytes(5_000);
    let host = fake_host(HostMode::Direct, payload.clone());
    let url = spawn_host(host).await;

    let dir = tempfile::tempdir().unwrap();
    let artifact = artifact_in(&dir);
    let provisioner = ModelProvisioner::new(url)
        .unwrap()
        .with_expected_sha256(Some(sha256_hex(&payload).to_uppercase()));

    let outcome = provisioner.ensure_model(&artifact).await.unwrap();
    assert!(matches!(outcome, ProvisionOutcome::Downloaded { .. }));
    assert!(artifact.path.exists());
}

#[tokio::test]
async fn test_checksum_mismatch_removes_file() {
    let host = fake_host(HostMode::Direct, model_bytes(5_000));
    let url = spawn_host(host).await;

    let dir = tempfile::tempdir().unwrap();
    let artifact = artifact_in(&dir);
    let provisioner = ModelProvisioner::new(url)
        .unwrap()
        .with_expected_sha256(Some("00".repeat(32)));

    let result = provisioner.ensure_model(&artifact).await;
    match result {
        Err(DownloadError::ChecksumMismatch { expected, actual }) => {
            assert_eq!(expected, "00".repeat(32));
            assert_eq!(actual.len(), 64);
        }
        other => panic!("expected checksum mismatch, got {:?}", other),
    }
    assert!(!artifact.path.exists());
}

#[tokio::test]
async fn test_download_overwrites_partial_file() {
    let payload = model_bytes(2_000);
    let host = fake_host(HostMode::Direct, payload.clone());
    let url = spawn_host(host).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("640m.onnx");
    std::fs::write(&path, vec![0xAAu8; 10_000]).unwrap();

    let provisioner = ModelProvisioner::new(url).unwrap();
    let (bytes, sha256) = provisioner.download(FILE_ID, &path).await.unwrap();

    assert_eq!(bytes, 2_000);
    assert_eq!(sha256, sha256_hex(&payload));
    assert_eq!(std::fs::read(&path).unwrap(), payload);
}

#[tokio::test]
async fn test_creates_parent_directories() {
    let payload = model_bytes(64);
    let host = fake_host(HostMode::Direct, payload.clone());
    let url = spawn_host(host).await;

    let dir = tempfile::tempdir().unwrap();
    let artifact = ModelArtifact {
        path: dir.path().join("models").join("nudenet").join("640m.onnx"),
        remote_file_id: FILE_ID.to_string(),
    };
    let provisioner = ModelProvisioner::new(url).unwrap();

    provisioner.ensure_model(&artifact).await.unwrap();
    assert_eq!(std::fs::read(&artifact.path).unwrap(), payload);
}
