//! Reviewer feedback attached to a deal.

use crate::domain::{FeedbackId, UserId};
use serde::{Deserialize, Serialize};

/// Highest value a single rating can take.
pub const MAX_RATING: u8 = 5;

/// Fixed rating triple. Each value is 1-5, or 0 when the reviewer left it unrated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratings {
    #[serde(default)]
    pub risk: u8,
    #[serde(default, rename = "return")]
    pub returns: u8,
    #[serde(default)]
    pub team: u8,
}

impl Ratings {
    pub fn new(risk: u8, returns: u8, team: u8) -> Self {
        Self {
            risk,
            returns,
            team,
        }
    }

    /// Name of the first rating outside `0..=MAX_RATING`, if any.
    pub fn out_of_range(&self) -> Option<&'static str> {
        [
            ("risk", self.risk),
            ("return", self.returns),
            ("team", self.team),
        ]
        .into_iter()
        .find(|(_, value)| *value > MAX_RATING)
        .map(|(name, _)| name)
    }
}

/// A single reviewer's feedback as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    #[serde(rename = "user_id", alias = "author_id")]
    pub author_id: UserId,
    #[serde(rename = "user_name", alias = "author_name", default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub ratings: Ratings,
}

/// Request body for `POST /api/deals/{id}/feedback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    pub comment: String,
    pub ratings: Ratings,
}

impl FeedbackSubmission {
    pub fn new(comment: impl Into<String>, ratings: Ratings) -> Self {
        Self {
            comment: comment.into(),
            ratings,
        }
    }
}
