use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;

use super::deals::DealDto;
use super::AppState;
use crate::error::AppError;
use crate::upload::PdfDocument;

/// Header carrying the original file name of a raw-body upload.
pub const FILE_NAME_HEADER: &str = "x-file-name";

/// Accept a PDF as the raw request body and hand it to the backend for analysis.
pub async fn upload_deal(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<DealDto>), AppError> {
    let file_name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("document.pdf")
        .to_string();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let document = PdfDocument::from_upload(file_name, content_type, body.to_vec())?;
    let deal = state.uploader.upload(&document).await?;

    Ok((StatusCode::CREATED, Json(DealDto::from(&deal))))
}
