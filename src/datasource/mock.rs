//! In-memory deal API for tests and offline runs.
//!
//! Behaves like a tiny backend: it owns a deal list, assigns ids, and applies
//! mutations. Individual operations can be made to fail or to take time, and
//! every call is counted.

use super::{DealApi, DealApiError};
use crate::domain::{
    Analysis, DealId, DealStatus, Feedback, FeedbackId, FeedbackSubmission, RawDeal, UserId,
};
use crate::upload::PdfDocument;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Operations of the deal API, used to target failures, latency and call counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    ListDeals,
    DeleteDeal,
    SubmitFeedback,
    DeleteFeedback,
    Upload,
    FetchPdf,
}

#[derive(Debug)]
struct MockState {
    deals: Vec<RawDeal>,
    failures: HashMap<MockOperation, DealApiError>,
    latency: HashMap<MockOperation, Duration>,
    calls: HashMap<MockOperation, usize>,
    acting_user: UserId,
    acting_user_name: String,
    next_feedback_id: i64,
    pdf: Vec<u8>,
}

#[derive(Debug)]
pub struct MockDealApi {
    state: Mutex<MockState>,
}

impl MockDealApi {
    /// Create a mock backend with no deals, acting as user `u1`.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                deals: Vec::new(),
                failures: HashMap::new(),
                latency: HashMap::new(),
                calls: HashMap::new(),
                acting_user: UserId::new("u1"),
                acting_user_name: "Test User".to_string(),
                next_feedback_id: 1,
                pdf: b"%PDF-1.7\n%mock\n".to_vec(),
            }),
        }
    }

    /// Add a deal to the backend's list.
    pub fn with_deal(self, deal: RawDeal) -> Self {
        self.state().deals.push(deal);
        self
    }

    /// Add multiple deals, in order.
    pub fn with_deals(self, deals: Vec<RawDeal>) -> Self {
        self.state().deals.extend(deals);
        self
    }

    /// Set the user that feedback and uploads are attributed to.
    pub fn acting_as(self, user: UserId, name: impl Into<String>) -> Self {
        {
            let mut state = self.state();
            state.acting_user = user;
            state.acting_user_name = name.into();
        }
        self
    }

    /// Set the bytes returned by `fetch_pdf`.
    pub fn with_pdf(self, bytes: Vec<u8>) -> Self {
        self.state().pdf = bytes;
        self
    }

    /// Make every subsequent call to `op` fail with `error`.
    pub fn fail(&self, op: MockOperation, error: DealApiError) {
        self.state().failures.insert(op, error);
    }

    /// Stop failing calls to `op`.
    pub fn recover(&self, op: MockOperation) {
        self.state().failures.remove(&op);
    }

    /// Delay every subsequent call to `op` before it takes effect.
    pub fn set_latency(&self, op: MockOperation, latency: Duration) {
        self.state().latency.insert(op, latency);
    }

    /// Number of calls made to `op`, including failed ones.
    pub fn calls(&self, op: MockOperation) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    /// Replace the backend's deal list.
    pub fn set_deals(&self, deals: Vec<RawDeal>) {
        self.state().deals = deals;
    }

    pub fn set_status(&self, id: DealId, status: DealStatus) {
        if let Some(deal) = self.state().deals.iter_mut().find(|d| d.id == id) {
            deal.status = status;
        }
    }

    pub fn set_analysis(&self, id: DealId, analysis: Option<Analysis>) {
        if let Some(deal) = self.state().deals.iter_mut().find(|d| d.id == id) {
            deal.analysis_data = analysis;
        }
    }

    /// Current server-side deal list.
    pub fn deals(&self) -> Vec<RawDeal> {
        self.state().deals.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count the call, wait out any configured latency, then report an injected failure.
    async fn enter(&self, op: MockOperation) -> Result<(), DealApiError> {
        let latency = {
            let mut state = self.state();
            *state.calls.entry(op).or_insert(0) += 1;
            state.latency.get(&op).copied()
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        match self.state().failures.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl Default for MockDealApi {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(what: &str) -> DealApiError {
    DealApiError::Http {
        status: 404,
        detail: Some(format!("{} not found", what)),
    }
}

#[async_trait]
impl DealApi for MockDealApi {
    /// The list is captured when the call arrives, so a slow response carries
    /// the state of the backend at request time.
    async fn list_deals(&self) -> Result<Vec<RawDeal>, DealApiError> {
        let deals = self.state().deals.clone();
        self.enter(MockOperation::ListDeals).await?;
        Ok(deals)
    }

    async fn delete_deal(&self, id: DealId) -> Result<(), DealApiError> {
        self.enter(MockOperation::DeleteDeal).await?;
        let mut state = self.state();
        let before = state.deals.len();
        state.deals.retain(|d| d.id != id);
        if state.deals.len() == before {
            return Err(not_found("Deal"));
        }
        Ok(())
    }

    async fn submit_feedback(
        &self,
        deal_id: DealId,
        submission: &FeedbackSubmission,
    ) -> Result<Feedback, DealApiError> {
        self.enter(MockOperation::SubmitFeedback).await?;
        let mut state = self.state();
        let id = FeedbackId(state.next_feedback_id);
        let feedback = Feedback {
            id,
            author_id: state.acting_user.clone(),
            author_name: Some(state.acting_user_name.clone()),
            comment: submission.comment.clone(),
            ratings: submission.ratings,
        };

        let deal = state
            .deals
            .iter_mut()
            .find(|d| d.id == deal_id)
            .ok_or_else(|| not_found("Deal"))?;
        deal.feedbacks
            .get_or_insert_with(Vec::new)
            .push(feedback.clone());
        state.next_feedback_id += 1;

        Ok(feedback)
    }

    async fn delete_feedback(&self, feedback_id: FeedbackId) -> Result<(), DealApiError> {
        self.enter(MockOperation::DeleteFeedback).await?;
        let mut state = self.state();
        for deal in state.deals.iter_mut() {
            if let Some(feedbacks) = deal.feedbacks.as_mut() {
                if let Some(pos) = feedbacks.iter().position(|fb| fb.id == feedback_id) {
                    feedbacks.remove(pos);
                    return Ok(());
                }
            }
        }
        Err(not_found("Feedback"))
    }

    async fn upload(&self, document: &PdfDocument) -> Result<RawDeal, DealApiError> {
        self.enter(MockOperation::Upload).await?;
        let mut state = self.state();
        let next_id = state.deals.iter().map(|d| d.id.as_i64()).max().unwrap_or(0) + 1;
        let deal = RawDeal {
            id: DealId(next_id),
            file_name: document.file_name().to_string(),
            user_name: Some(state.acting_user_name.clone()),
            status: DealStatus::Analyzing,
            analysis_data: None,
            feedbacks: Some(Vec::new()),
        };
        state.deals.insert(0, deal.clone());
        Ok(deal)
    }

    async fn fetch_pdf(&self, id: DealId) -> Result<Vec<u8>, DealApiError> {
        self.enter(MockOperation::FetchPdf).await?;
        let state = self.state();
        if !state.deals.iter().any(|d| d.id == id) {
            return Err(not_found("Deal"));
        }
        Ok(state.pdf.clone())
    }
}
