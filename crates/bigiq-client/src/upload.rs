//! Chunked file upload to the control plane's file-transfer resource.
//!
//! A byte source is read once, sequentially, in fixed-size chunks. Each chunk
//! is POSTed as `application/octet-stream` with a
//! `Content-Range: start-(end-1)/total` header, and the control plane answers
//! with its upload progress. There is no resume: any failed chunk aborts the
//! whole upload.

use std::collections::BTreeMap;
use std::path::Path;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{decode, BigIqError};
use crate::path;
use crate::session::{Request, Session, MGMT_NAMESPACE, OCTET_STREAM};

/// Bytes per upload request.
pub const CHUNK_SIZE: usize = 512 * 1024;

/// File names with this extension are refused by the upload resource.
pub const RESERVED_EXTENSION: &str = ".iso";

/// Upload state reported by the control plane after each chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    #[serde(default)]
    pub remaining_byte_count: i64,
    #[serde(default)]
    pub used_chunks: BTreeMap<String, i64>,
    #[serde(default)]
    pub total_byte_count: i64,
    #[serde(default)]
    pub local_file_path: String,
    #[serde(default)]
    pub temporary_file_path: String,
    #[serde(default)]
    pub generation: i64,
    #[serde(default)]
    pub last_update_micros: i64,
}

/// Client for `mgmt/shared/file-transfer/uploads`.
#[derive(Debug, Clone)]
pub struct UploadClient {
    session: Session,
    chunk_size: usize,
}

impl UploadClient {
    pub(crate) fn new(session: Session) -> Self {
        Self {
            session,
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Override the chunk size (minimum one byte).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Upload a local file under its own name.
    pub async fn upload_file(&self, file: impl AsRef<Path>) -> Result<UploadProgress, BigIqError> {
        let file = file.as_ref();
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| BigIqError::Validation(format!("{} has no file name", file.display())))?;
        reject_reserved(&name)?;

        let total = tokio::fs::metadata(file).await?.len();
        let source = tokio::fs::File::open(file).await?;
        self.upload(source, total, &path::upload(&name)).await
    }

    /// Upload an in-memory buffer as `file_name`.
    pub async fn upload_bytes(&self, data: &[u8], file_name: &str) -> Result<UploadProgress, BigIqError> {
        self.upload(data, data.len() as u64, &path::upload(file_name))
            .await
    }

    /// Upload `total` bytes from `source` to `destination`.
    ///
    /// `destination` is resolved under the `mgmt` namespace unless it already
    /// starts with `mgmt/`. Returns the progress reported for the final chunk.
    pub async fn upload<R>(&self, source: R, total: u64, destination: &str) -> Result<UploadProgress, BigIqError>
    where
        R: AsyncRead + Unpin,
    {
        self.upload_with_progress(source, total, destination, |_| {})
            .await
    }

    /// Like [`UploadClient::upload`], calling `on_progress` after every chunk.
    pub async fn upload_with_progress<R, F>(
        &self,
        mut source: R,
        total: u64,
        destination: &str,
        mut on_progress: F,
    ) -> Result<UploadProgress, BigIqError>
    where
        R: AsyncRead + Unpin,
        F: FnMut(&UploadProgress),
    {
        reject_reserved(destination.rsplit('/').next().unwrap_or(destination))?;
        let mut buf = vec![0u8; self.chunk_size];
        let mut start: u64 = 0;

        loop {
            let filled = read_chunk(&mut source, &mut buf).await?;
            let end = start + filled as u64;

            if end > total {
                return Err(BigIqError::Validation(format!(
                    "source for {destination} is longer than the declared {total} bytes"
                )));
            }
            if filled < buf.len() && end < total {
                return Err(BigIqError::Validation(format!(
                    "source for {destination} ended after {end} of {total} bytes"
                )));
            }
            if end == total && filled == buf.len() && has_more(&mut source).await? {
                return Err(BigIqError::Validation(format!(
                    "source for {destination} is longer than the declared {total} bytes"
                )));
            }

            let range = content_range(start, end, total);
            let request = Request::new(Method::POST, destination)
                .in_namespace(MGMT_NAMESPACE)
                .with_body(buf[..filled].to_vec(), OCTET_STREAM)
                .with_header("Content-Range", range.clone());
            let bytes = self.session.call(&request).await?;
            let progress: UploadProgress = decode(&request.endpoint(), &bytes)?;

            tracing::debug!(
                destination,
                content_range = %range,
                remaining = progress.remaining_byte_count,
                "uploaded chunk"
            );
            on_progress(&progress);

            start = end;
            if start >= total {
                tracing::info!(destination, total, "upload complete");
                return Ok(progress);
            }
        }
    }
}

/// `start-(end-1)/total`. A zero-byte upload yields `0--1/0`.
pub fn content_range(start: u64, end: u64, total: u64) -> String {
    format!("{}-{}/{}", start, end as i128 - 1, total)
}

fn reject_reserved(file_name: &str) -> Result<(), BigIqError> {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(RESERVED_EXTENSION) {
        return Err(BigIqError::Validation(format!(
            "file must not have {RESERVED_EXTENSION} extension: {file_name}"
        )));
    }
    Ok(())
}

/// Fill `buf` from `source`; fewer bytes than `buf.len()` means end of source.
async fn read_chunk<R: AsyncRead + Unpin>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

async fn has_more<R: AsyncRead + Unpin>(source: &mut R) -> std::io::Result<bool> {
    let mut probe = [0u8; 1];
    Ok(source.read(&mut probe).await? > 0)
}
