use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::AppState;
use crate::domain::{DealId, FeedbackId, FeedbackSubmission};
use crate::error::AppError;

pub async fn submit_feedback(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(submission): Json<FeedbackSubmission>,
) -> Result<StatusCode, AppError> {
    state.store.submit_feedback(DealId(id), submission).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_feedback(
    Path((deal_id, feedback_id)): Path<(i64, i64)>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .delete_feedback(DealId(deal_id), FeedbackId(feedback_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
