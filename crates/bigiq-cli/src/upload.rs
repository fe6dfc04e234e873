//! # Upload Subcommand
//!
//! Sends a local file to the control plane's file-transfer resource in
//! chunks.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use bigiq_client::BigIqClient;

use crate::print_json;

/// Arguments for the `bigiq upload` subcommand.
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// File to upload. `.iso` images are not accepted.
    pub file: PathBuf,
    /// Chunk size in bytes.
    #[arg(long)]
    pub chunk_size: Option<usize>,
}

/// Execute the upload subcommand.
pub async fn run_upload(args: &UploadArgs, client: &BigIqClient) -> Result<u8> {
    let uploads = match args.chunk_size {
        Some(size) => client.uploads().clone().with_chunk_size(size),
        None => client.uploads().clone(),
    };
    let progress = uploads
        .upload_file(&args.file)
        .await
        .with_context(|| format!("failed to upload {}", args.file.display()))?;
    print_json(&progress)?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn uploads_in_requested_chunks() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mgmt/shared/file-transfer/uploads/bigip.lic"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "remainingByteCount": 0,
                "totalByteCount": 11
            })))
            .expect(3)
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bigip.lic");
        std::fs::write(&file, b"license-key").unwrap();

        let client = test_client(&mock_server);
        let args = UploadArgs {
            file,
            chunk_size: Some(4),
        };
        assert_eq!(run_upload(&args, &client).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn iso_images_are_refused() {
        let mock_server = MockServer::start().await;
        let client = test_client(&mock_server);
        let args = UploadArgs {
            file: PathBuf::from("/tmp/BIGIP-17.1.0.iso"),
            chunk_size: None,
        };
        assert!(run_upload(&args, &client).await.is_err());
    }
}
