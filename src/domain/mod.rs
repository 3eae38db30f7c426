//! Domain types for the deal review client.
//!
//! This module provides:
//! - Identifiers: DealId, FeedbackId, UserId
//! - The raw backend deal shape and the derived `Deal` view
//! - Feedback and rating types
//! - Feedback stage derivation and status badges
//! - Deal list filtering

pub mod deal;
pub mod feedback;
pub mod filter;
pub mod primitives;
pub mod stage;

pub use deal::{
    Analysis, Company, Deal, DealStatus, FinancialMetric, Financials, Growth, RawDeal,
    FALLBACK_TAG,
};
pub use feedback::{Feedback, FeedbackSubmission, Ratings, MAX_RATING};
pub use filter::DealFilter;
pub use primitives::{DealId, FeedbackId, UserId};
pub use stage::{
    derive_feedback_stage, BadgeTone, FeedbackStage, StatusBadge, DEFAULT_EXPECTED_REVIEWERS,
};
