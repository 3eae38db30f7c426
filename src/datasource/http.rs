//! HTTP client for the analysis backend.

use super::{extract_detail, DealApi, DealApiError, TokenProvider};
use crate::domain::{DealId, Feedback, FeedbackId, FeedbackSubmission, RawDeal};
use crate::upload::{PdfDocument, PDF_MIME};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::{Client, RequestBuilder, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Uploads wait for the backend to analyze the document, which takes far longer
/// than an ordinary request.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(180);

/// `DealApi` over reqwest, authenticated with a bearer token per request.
#[derive(Debug, Clone)]
pub struct HttpDealApi {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
    request_timeout: Duration,
    upload_timeout: Duration,
}

impl HttpDealApi {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self::with_timeouts(
            base_url,
            tokens,
            DEFAULT_REQUEST_TIMEOUT,
            DEFAULT_UPLOAD_TIMEOUT,
        )
    }

    pub fn with_timeouts(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
        request_timeout: Duration,
        upload_timeout: Duration,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            tokens,
            request_timeout,
            upload_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, DealApiError> {
        let token = self.tokens.bearer_token().await?;
        Ok(request.bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, DealApiError> {
        let request = self.authorized(request).await?;
        let response = request
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response, false).await
    }

    /// GET with retry on transient failures. All attempts together, including
    /// the waits between them, fit inside one request timeout.
    async fn get_with_retry(&self, url: &str) -> Result<Response, DealApiError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.request_timeout),
            ..Default::default()
        };

        let attempts = retry(backoff, || async {
            self.send(self.client.get(url)).await.map_err(|e| {
                if e.is_transient() {
                    debug!("Transient failure on GET {}: {}", url, e);
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        });

        tokio::time::timeout(self.request_timeout, attempts)
            .await
            .map_err(|_| {
                warn!("GET {} gave up after {:?}", url, self.request_timeout);
                DealApiError::Timeout
            })?
    }
}

#[async_trait]
impl DealApi for HttpDealApi {
    async fn list_deals(&self) -> Result<Vec<RawDeal>, DealApiError> {
        let url = self.url("/api/deals");
        debug!("Fetching deals from {}", url);

        let response = self.get_with_retry(&url).await?;
        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| DealApiError::Parse(e.to_string()))?;

        parse_deal_list(body)
    }

    async fn delete_deal(&self, id: DealId) -> Result<(), DealApiError> {
        let url = self.url(&format!("/api/deals/{}", id));
        debug!("Deleting deal {}", id);

        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn submit_feedback(
        &self,
        deal_id: DealId,
        submission: &FeedbackSubmission,
    ) -> Result<Feedback, DealApiError> {
        let url = self.url(&format!("/api/deals/{}/feedback", deal_id));
        debug!("Submitting feedback for deal {}", deal_id);

        let response = self.send(self.client.post(url).json(submission)).await?;
        response
            .json::<Feedback>()
            .await
            .map_err(|e| DealApiError::Parse(e.to_string()))
    }

    async fn delete_feedback(&self, feedback_id: FeedbackId) -> Result<(), DealApiError> {
        let url = self.url(&format!("/api/feedback/{}", feedback_id));
        debug!("Deleting feedback {}", feedback_id);

        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn upload(&self, document: &PdfDocument) -> Result<RawDeal, DealApiError> {
        let url = self.url("/analyze/");
        debug!(
            "Uploading {} ({} bytes) for analysis",
            document.file_name(),
            document.len()
        );

        let part = reqwest::multipart::Part::bytes(document.bytes().to_vec())
            .file_name(document.file_name().to_string())
            .mime_str(PDF_MIME)
            .map_err(|e| DealApiError::Parse(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let request = self.authorized(self.client.post(url).multipart(form)).await?;
        let response = request
            .timeout(self.upload_timeout)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, true).await?;

        response
            .json::<RawDeal>()
            .await
            .map_err(|e| DealApiError::Parse(e.to_string()))
    }

    async fn fetch_pdf(&self, id: DealId) -> Result<Vec<u8>, DealApiError> {
        let url = self.url(&format!("/api/deals/{}/view-pdf", id));
        debug!("Fetching source document for deal {}", id);

        let response = self.get_with_retry(&url).await?;
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(transport_error)
    }
}

fn transport_error(err: reqwest::Error) -> DealApiError {
    if err.is_timeout() {
        DealApiError::Timeout
    } else if err.is_decode() {
        DealApiError::Parse(err.to_string())
    } else {
        DealApiError::Network(err.to_string())
    }
}

/// Turn a non-2xx response into `DealApiError::Http`, reading the detail from the body.
///
/// With `plain_text_fallback`, a body that is not a JSON error object is used
/// verbatim as the detail.
async fn check_status(
    response: Response,
    plain_text_fallback: bool,
) -> Result<Response, DealApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = extract_detail(&body).or_else(|| {
        let text = body.trim();
        (plain_text_fallback && !text.is_empty()).then(|| text.to_string())
    });

    Err(DealApiError::Http {
        status: status.as_u16(),
        detail,
    })
}

fn parse_deal_list(body: serde_json::Value) -> Result<Vec<RawDeal>, DealApiError> {
    let items = match body {
        serde_json::Value::Array(items) => items,
        _ => {
            return Err(DealApiError::Parse(
                "Expected array response".to_string(),
            ))
        }
    };

    let mut deals = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<RawDeal>(item) {
            Ok(deal) => deals.push(deal),
            Err(e) => {
                warn!("Skipping malformed deal record: {}", e);
            }
        }
    }

    Ok(deals)
}
