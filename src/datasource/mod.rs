//! Remote deal API abstraction: listing deals, feedback mutations, uploads and
//! source document retrieval.

use crate::domain::{DealId, Feedback, FeedbackId, FeedbackSubmission, RawDeal};
use crate::upload::PdfDocument;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod auth;
pub mod http;
pub mod mock;

pub use auth::{StaticToken, TokenProvider};
pub use http::HttpDealApi;
pub use mock::MockDealApi;

/// Client side of the analysis backend's REST contract.
///
/// Every call is authenticated with the session's bearer token. Implementations
/// never panic on transport or decoding failures; they report a `DealApiError`.
#[async_trait]
pub trait DealApi: Send + Sync + fmt::Debug {
    /// `GET /api/deals`.
    ///
    /// Entries that fail to decode are skipped; the rest of the list is kept.
    async fn list_deals(&self) -> Result<Vec<RawDeal>, DealApiError>;

    /// `DELETE /api/deals/{id}`.
    async fn delete_deal(&self, id: DealId) -> Result<(), DealApiError>;

    /// `POST /api/deals/{id}/feedback`, returning the created record.
    async fn submit_feedback(
        &self,
        deal_id: DealId,
        submission: &FeedbackSubmission,
    ) -> Result<Feedback, DealApiError>;

    /// `DELETE /api/feedback/{id}`.
    async fn delete_feedback(&self, feedback_id: FeedbackId) -> Result<(), DealApiError>;

    /// `POST /analyze/` with the document as multipart field `file`.
    async fn upload(&self, document: &PdfDocument) -> Result<RawDeal, DealApiError>;

    /// `GET /api/deals/{id}/view-pdf`.
    async fn fetch_pdf(&self, id: DealId) -> Result<Vec<u8>, DealApiError>;
}

/// Error type for remote deal API calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DealApiError {
    /// Connection failure, DNS failure, reset.
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    /// Non-2xx response. `detail` is the human-readable message from the body, when present.
    #[error("http error {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Http { status: u16, detail: Option<String> },
    #[error("parse error: {0}")]
    Parse(String),
    /// No bearer token could be obtained for the request.
    #[error("authentication error: {0}")]
    Auth(String),
}

impl DealApiError {
    /// Message suitable for showing to a user, falling back to `generic` when
    /// the backend gave no detail.
    pub fn user_message(&self, generic: &str) -> String {
        match self {
            DealApiError::Http {
                detail: Some(detail),
                ..
            } => detail.clone(),
            DealApiError::Timeout => "The request timed out. Please try again.".to_string(),
            _ => generic.to_string(),
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            DealApiError::Network(_) | DealApiError::Timeout => true,
            DealApiError::Http { status, .. } => *status == 429 || *status >= 500,
            DealApiError::Parse(_) | DealApiError::Auth(_) => false,
        }
    }
}

/// Pull a human-readable message out of an error response body.
///
/// Understands `{"detail": "..."}`, FastAPI validation lists
/// (`{"detail": [{"msg": "..."}]}`), and `error` / `message` keys.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let field = ["detail", "error", "message"]
        .iter()
        .find_map(|key| value.get(*key))?;

    match field {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if msgs.is_empty() {
                None
            } else {
                Some(msgs.join("; "))
            }
        }
        _ => None,
    }
}
