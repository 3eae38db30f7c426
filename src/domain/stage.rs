//! Review lifecycle derivation.
//!
//! The feedback stage is a pure function of a deal's status and the number of
//! feedback entries it carries. It is recomputed whenever a deal is mapped and
//! is never stored on the backend.

use crate::domain::DealStatus;
use serde::{Deserialize, Serialize};

/// Number of reviewers expected to weigh in on a deal before review is complete.
pub const DEFAULT_EXPECTED_REVIEWERS: usize = 5;

/// User-facing review progress of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStage {
    FeedbackNeeded,
    InProgress,
    ReviewComplete,
    /// Analysis has not finished, so there is nothing to review yet.
    NotApplicable,
}

impl FeedbackStage {
    pub fn label(&self) -> &'static str {
        match self {
            FeedbackStage::FeedbackNeeded => "Feedback Needed",
            FeedbackStage::InProgress => "In Progress",
            FeedbackStage::ReviewComplete => "Review Complete",
            FeedbackStage::NotApplicable => "N/A",
        }
    }
}

impl std::fmt::Display for FeedbackStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a deal's status and feedback count to its review stage.
pub fn derive_feedback_stage(
    status: DealStatus,
    feedback_count: usize,
    expected_reviewers: usize,
) -> FeedbackStage {
    if status != DealStatus::Complete {
        return FeedbackStage::NotApplicable;
    }

    match feedback_count {
        0 => FeedbackStage::FeedbackNeeded,
        n if n < expected_reviewers => FeedbackStage::InProgress,
        _ => FeedbackStage::ReviewComplete,
    }
}

/// Colour family a badge is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeTone {
    Amber,
    Sky,
    Green,
    Red,
    Slate,
}

/// Short status label shown on a deal card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub text: &'static str,
    pub tone: BadgeTone,
}

impl StatusBadge {
    pub fn for_deal(status: DealStatus, stage: FeedbackStage) -> Self {
        let (text, tone) = match (status, stage) {
            (DealStatus::Complete, FeedbackStage::ReviewComplete) => {
                ("Review Complete", BadgeTone::Green)
            }
            (DealStatus::Complete, FeedbackStage::InProgress) => ("In Progress", BadgeTone::Sky),
            (DealStatus::Complete, _) => ("Feedback Needed", BadgeTone::Amber),
            (DealStatus::Analyzing, _) => ("Analyzing...", BadgeTone::Sky),
            (DealStatus::Failed, _) => ("Analysis Failed", BadgeTone::Red),
            (DealStatus::Pending, _) => ("Pending", BadgeTone::Slate),
        };
        Self { text, tone }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_stage_table() {
        let cases = [
            (0, FeedbackStage::FeedbackNeeded),
            (1, FeedbackStage::InProgress),
            (4, FeedbackStage::InProgress),
            (5, FeedbackStage::ReviewComplete),
            (6, FeedbackStage::ReviewComplete),
        ];
        for (count, expected) in cases {
            assert_eq!(
                derive_feedback_stage(DealStatus::Complete, count, DEFAULT_EXPECTED_REVIEWERS),
                expected,
                "feedback count {}",
                count
            );
        }
    }

    #[test]
    fn test_unfinished_statuses_are_not_applicable() {
        for status in [DealStatus::Pending, DealStatus::Analyzing, DealStatus::Failed] {
            for count in [0, 1, 4, 5, 6] {
                assert_eq!(
                    derive_feedback_stage(status, count, DEFAULT_EXPECTED_REVIEWERS),
                    FeedbackStage::NotApplicable
                );
            }
        }
    }

    #[test]
    fn test_expected_reviewers_is_respected() {
        assert_eq!(
            derive_feedback_stage(DealStatus::Complete, 2, 2),
            FeedbackStage::ReviewComplete
        );
        assert_eq!(
            derive_feedback_stage(DealStatus::Complete, 2, 3),
            FeedbackStage::InProgress
        );
    }

    #[test]
    fn test_badges() {
        let badge = StatusBadge::for_deal(DealStatus::Complete, FeedbackStage::FeedbackNeeded);
        assert_eq!(badge.text, "Feedback Needed");
        assert_eq!(badge.tone, BadgeTone::Amber);

        let badge = StatusBadge::for_deal(DealStatus::Analyzing, FeedbackStage::NotApplicable);
        assert_eq!(badge.text, "Analyzing...");

        let badge = StatusBadge::for_deal(DealStatus::Failed, FeedbackStage::NotApplicable);
        assert_eq!(badge.tone, BadgeTone::Red);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(FeedbackStage::NotApplicable.to_string(), "N/A");
        assert_eq!(FeedbackStage::ReviewComplete.to_string(), "Review Complete");
    }
}
