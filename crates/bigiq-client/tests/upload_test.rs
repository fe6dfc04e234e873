//! Contract tests for the chunked upload protocol.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bigiq_client::upload::UploadProgress;
use tokio::io::{AsyncRead, ReadBuf};
use bigiq_client::{BigIqClient, BigIqConfig, BigIqError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UPLOAD_PATH: &str = "/mgmt/shared/file-transfer/uploads/bigip.lic";

fn test_client(mock_server: &MockServer) -> BigIqClient {
    BigIqClient::new(BigIqConfig::local_mock(&mock_server.uri()).unwrap()).unwrap()
}

fn progress(total: u64) -> serde_json::Value {
    serde_json::json!({
        "remainingByteCount": 0,
        "usedChunks": {"0": total},
        "totalByteCount": total,
        "localFilePath": "/var/config/rest/bulk/bigip.lic",
        "temporaryFilePath": "/var/config/rest/bulk/jetty-tmp/bigip.lic",
        "generation": 0,
        "lastUpdateMicros": 1_700_000_000_000_000u64
    })
}

/// Serves `data` once, then fails every later read with `kind`.
struct FailingSource {
    data: Option<Vec<u8>>,
    kind: io::ErrorKind,
}

impl AsyncRead for FailingSource {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match self.data.take() {
            Some(data) => {
                buf.put_slice(&data);
                Poll::Ready(Ok(()))
            }
            None => Poll::Ready(Err(io::Error::new(self.kind, "source went away"))),
        }
    }
}

fn content_ranges(requests: &[wiremock::Request]) -> Vec<String> {
    requests
        .iter()
        .map(|r| {
            r.headers
                .get("Content-Range")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

#[tokio::test]
async fn upload_splits_source_into_ranged_chunks() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .and(header("Content-Type", "application/octet-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_json(progress(10)))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let uploads = client.uploads().clone().with_chunk_size(4);
    let data = b"0123456789";
    let mut seen = 0;
    let last = uploads
        .upload_with_progress(&data[..], 10, "shared/file-transfer/uploads/bigip.lic", |_| {
            seen += 1
        })
        .await
        .unwrap();
    assert_eq!(seen, 3);
    assert_eq!(last.total_byte_count, 10);
    assert_eq!(last.local_file_path, "/var/config/rest/bulk/bigip.lic");

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(content_ranges(&requests), vec!["0-3/10", "4-7/10", "8-9/10"]);
    let sent: Vec<u8> = requests.iter().flat_map(|r| r.body.clone()).collect();
    assert_eq!(sent, data.to_vec());
}

#[tokio::test]
async fn upload_of_exact_multiple_ends_at_total_minus_one() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(progress(8)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    client
        .uploads()
        .clone()
        .with_chunk_size(4)
        .upload_bytes(b"abcdefgh", "bigip.lic")
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(content_ranges(&requests), vec!["0-3/8", "4-7/8"]);
    let total: usize = requests.iter().map(|r| r.body.len()).sum();
    assert_eq!(total, 8);
}

#[tokio::test]
async fn zero_byte_upload_sends_exactly_one_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(progress(0)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let result: UploadProgress = client.uploads().upload_bytes(b"", "bigip.lic").await.unwrap();
    assert_eq!(result.total_byte_count, 0);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].body.is_empty());
    assert_eq!(content_ranges(&requests), vec!["0--1/0"]);
}

#[tokio::test]
async fn reserved_extension_is_rejected_before_any_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(progress(3)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .uploads()
        .upload_bytes(b"abc", "BIGIP-17.1.0.0.0.6.ISO")
        .await
        .unwrap_err();
    assert!(matches!(err, BigIqError::Validation(_)));
}

#[tokio::test]
async fn short_source_is_a_validation_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(progress(10)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .uploads()
        .clone()
        .with_chunk_size(4)
        .upload(&b"abc"[..], 10, "shared/file-transfer/uploads/bigip.lic")
        .await
        .unwrap_err();
    assert!(matches!(err, BigIqError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn long_source_is_a_validation_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(progress(4)))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .uploads()
        .clone()
        .with_chunk_size(4)
        .upload(&b"abcdef"[..], 4, "shared/file-transfer/uploads/bigip.lic")
        .await
        .unwrap_err();
    assert!(matches!(err, BigIqError::Validation(_)), "got {err:?}");
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn error_response_aborts_the_upload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "code": 400,
            "message": "Content-Range header is malformed",
            "errorStack": []
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .uploads()
        .clone()
        .with_chunk_size(4)
        .upload_bytes(b"0123456789", "bigip.lic")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.server_message().as_deref(), Some("Content-Range header is malformed"));
}

#[tokio::test]
async fn upload_file_uses_the_file_name() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(progress(11)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("bigip.lic");
    std::fs::write(&file, b"license-key").unwrap();

    let client = test_client(&mock_server);
    client.uploads().upload_file(&file).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(content_ranges(&requests), vec!["0-10/11"]);
}

#[tokio::test]
async fn generic_upload_rejects_reserved_destination() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(progress(3)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .uploads()
        .upload(&b"abc"[..], 3, "shared/file-transfer/uploads/BIGIP-17.1.0.iso")
        .await
        .unwrap_err();
    assert!(matches!(err, BigIqError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn read_error_aborts_and_is_surfaced_unchanged() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(progress(10)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let source = FailingSource {
        data: Some(b"abcd".to_vec()),
        kind: io::ErrorKind::BrokenPipe,
    };
    let err = client
        .uploads()
        .clone()
        .with_chunk_size(4)
        .upload(source, 10, "shared/file-transfer/uploads/bigip.lic")
        .await
        .unwrap_err();
    match err {
        BigIqError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("expected Io, got {other:?}"),
    }
}
