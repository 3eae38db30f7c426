use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::{
    Analysis, Deal, DealFilter, DealId, DealStatus, Feedback, FeedbackStage, StatusBadge,
};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct DealsQuery {
    pub search: Option<String>,
    /// A deal status, or `all`.
    pub status: Option<String>,
    pub industry: Option<String>,
}

impl DealsQuery {
    fn into_filter(self) -> Result<DealFilter, AppError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(s) => Some(s.parse::<DealStatus>().map_err(AppError::BadRequest)?),
        };
        Ok(DealFilter {
            search: self.search,
            status,
            industry: self.industry,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealsResponse {
    pub deals: Vec<DealDto>,
    pub is_loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealDto {
    pub id: DealId,
    pub title: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader_name: Option<String>,
    pub status: DealStatus,
    pub feedback_stage: FeedbackStage,
    pub badge: StatusBadge,
    pub tags: Vec<String>,
    pub current_user_has_submitted: bool,
    pub feedback: Vec<Feedback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
}

impl From<&Deal> for DealDto {
    fn from(deal: &Deal) -> Self {
        Self {
            id: deal.id,
            title: deal.title.clone(),
            file_name: deal.file_name.clone(),
            uploader_name: deal.uploader_name.clone(),
            status: deal.status,
            feedback_stage: deal.feedback_stage,
            badge: deal.badge(),
            tags: deal.tags.clone(),
            current_user_has_submitted: deal.current_user_has_submitted,
            feedback: deal.feedback.clone(),
            analysis: deal.analysis.clone(),
        }
    }
}

pub async fn list_deals(
    Query(params): Query<DealsQuery>,
    State(state): State<AppState>,
) -> Result<Json<DealsResponse>, AppError> {
    let filter = params.into_filter()?;
    let snapshot = state.store.snapshot();

    let deals = filter
        .apply(&snapshot.deals)
        .into_iter()
        .map(DealDto::from)
        .collect();

    Ok(Json(DealsResponse {
        deals,
        is_loading: snapshot.is_loading,
        last_error: snapshot.last_error.clone(),
        last_synced_at: snapshot.last_synced_at,
    }))
}

pub async fn get_deal(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<DealDto>, AppError> {
    let deal = state
        .store
        .get(DealId(id))
        .ok_or_else(|| AppError::NotFound(format!("deal {}", id)))?;
    Ok(Json(DealDto::from(&deal)))
}

pub async fn delete_deal(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.store.remove(DealId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn view_pdf(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = state.store.view_pdf(DealId(id)).await?;
    Ok(([(header::CONTENT_TYPE, crate::upload::PDF_MIME)], bytes))
}
