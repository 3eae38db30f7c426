use crate::store::StoreError;
use crate::upload::UploadError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// The analysis backend failed or refused the request.
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidRating(_) => AppError::BadRequest(err.to_string()),
            StoreError::Remote(msg) => AppError::Upstream(msg),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Remote(msg) => AppError::Upstream(msg),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        let err: AppError = StoreError::InvalidRating("team").into();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err: AppError = StoreError::Remote("Deal not found".to_string()).into();
        assert!(matches!(err, AppError::Upstream(ref m) if m == "Deal not found"));
    }

    #[test]
    fn test_upload_error_mapping() {
        let err: AppError = UploadError::NotPdf.into();
        assert_eq!(
            err.to_string(),
            "Bad request: Please select a valid PDF file."
        );

        let response = AppError::Upstream("down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
