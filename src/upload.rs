//! Document upload: local validation, then hand-off to the backend for analysis.

use crate::datasource::DealApi;
use crate::domain::Deal;
use crate::store::DealStore;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const PDF_MIME: &str = "application/pdf";
/// Default cap on an uploaded document. Deal memoranda with scanned exhibits
/// run to tens of megabytes.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
const PDF_SIGNATURE: &[u8] = b"%PDF-";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("Please select a valid PDF file.")]
    NotPdf,
    #[error("The selected file is empty.")]
    Empty,
    #[error("Could not read {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("{0}")]
    Remote(String),
}

/// A PDF that has passed local validation and is ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfDocument {
    file_name: String,
    bytes: Vec<u8>,
}

impl PdfDocument {
    /// Validate raw bytes as a PDF.
    ///
    /// Rejects empty input and anything not starting with the `%PDF-` signature.
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if !bytes.starts_with(PDF_SIGNATURE) {
            return Err(UploadError::NotPdf);
        }
        Ok(Self {
            file_name: file_name.into(),
            bytes,
        })
    }

    /// Like `from_bytes`, also rejecting a declared content type other than PDF.
    pub fn from_upload(
        file_name: impl Into<String>,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self, UploadError> {
        if let Some(content_type) = content_type {
            let essence = content_type.split(';').next().unwrap_or("").trim();
            if !essence.eq_ignore_ascii_case(PDF_MIME) {
                return Err(UploadError::NotPdf);
            }
        }
        Self::from_bytes(file_name, bytes)
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| UploadError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        Self::from_bytes(file_name, bytes)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Uploads documents and registers the resulting deals with the store.
#[derive(Debug, Clone)]
pub struct Uploader {
    api: Arc<dyn DealApi>,
    store: DealStore,
}

impl Uploader {
    pub fn new(api: Arc<dyn DealApi>, store: DealStore) -> Self {
        Self { api, store }
    }

    /// Upload a validated document; on success the new deal is prepended to the store.
    pub async fn upload(&self, document: &PdfDocument) -> Result<Deal, UploadError> {
        let raw = self.api.upload(document).await.map_err(|e| {
            warn!("Upload of {} failed: {}", document.file_name(), e);
            UploadError::Remote(e.user_message("Upload failed"))
        })?;

        info!("Uploaded {} as deal {}", document.file_name(), raw.id);
        Ok(self.store.add(raw))
    }
}
