//! Deal records: the raw backend shape and the locally derived view.

use crate::domain::{
    derive_feedback_stage, DealId, Feedback, FeedbackStage, StatusBadge, UserId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Tag used when the analysis names no industry.
pub const FALLBACK_TAG: &str = "N/A";

/// Analysis lifecycle as reported by the backend. Read-only to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealStatus {
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "analyzing")]
    Analyzing,
    #[serde(alias = "complete")]
    Complete,
    #[serde(alias = "failed")]
    Failed,
}

impl std::fmt::Display for DealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DealStatus::Pending => "Pending",
            DealStatus::Analyzing => "Analyzing",
            DealStatus::Complete => "Complete",
            DealStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for DealStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(DealStatus::Pending),
            "analyzing" => Ok(DealStatus::Analyzing),
            "complete" => Ok(DealStatus::Complete),
            "failed" => Ok(DealStatus::Failed),
            other => Err(format!("unknown deal status: {}", other)),
        }
    }
}

/// Decode `T` when the value has the expected shape, and `None` otherwise.
///
/// Analysis payloads come from a model and drift in shape; a mismatch in one
/// field must not cost the whole deal.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
}

/// One column of the financial summary. Values are shown as the backend
/// produced them, usually display strings ("$12.4M", "18%") but sometimes
/// bare numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetric {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebitda: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_margin: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcf: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capex: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capex_pct_revenue: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Financials {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub actuals: Option<FinancialMetric>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub estimates: Option<FinancialMetric>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Growth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_revenue_cagr: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projected_revenue_cagr: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_fcf_cagr: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projected_fcf_cagr: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_commentary: Option<Value>,
}

/// Structured analysis produced by the backend once a deal is complete.
///
/// Every field is optional and the client does not validate the shape:
/// display fields keep whatever JSON arrived, and the few fields read for
/// titles and tags fall back to `None` when their shape is unexpected.
/// Fields this type does not name are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub company: Option<Company>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub financials: Option<Financials>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub growth: Option<Growth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thesis: Option<Value>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flagged_fields: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_confidence_flags: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_breakdown: Option<Value>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ibis_industries: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    /// Prose or a list of bullet points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub red_flags: Option<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Analysis {
    pub fn company_name(&self) -> Option<&str> {
        self.company
            .as_ref()
            .and_then(|c| c.name.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// Red flags as bullet points, whether they arrived as a list or as one string.
    pub fn red_flag_points(&self) -> Vec<String> {
        match &self.red_flags {
            Some(Value::String(text)) if !text.trim().is_empty() => vec![text.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Deal record exactly as the backend returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDeal {
    pub id: DealId,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub status: DealStatus,
    #[serde(default)]
    pub analysis_data: Option<Analysis>,
    #[serde(default)]
    pub feedbacks: Option<Vec<Feedback>>,
}

/// A deal as presented to consumers of the store: the backend fields plus the
/// client-only fields derived from them and the active user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deal {
    pub id: DealId,
    pub file_name: String,
    pub uploader_name: Option<String>,
    pub status: DealStatus,
    pub analysis: Option<Analysis>,
    pub feedback: Vec<Feedback>,
    pub tags: Vec<String>,
    pub title: String,
    pub current_user_has_submitted: bool,
    pub feedback_stage: FeedbackStage,
}

impl Deal {
    /// Map a raw record and compute every derived field.
    pub fn from_raw(raw: RawDeal, current_user: Option<&UserId>, expected_reviewers: usize) -> Self {
        let feedback = raw.feedbacks.unwrap_or_default();
        let title = raw
            .analysis_data
            .as_ref()
            .and_then(Analysis::company_name)
            .map(str::to_string)
            .unwrap_or_else(|| raw.file_name.clone());
        let tags = derive_tags(raw.analysis_data.as_ref());
        let current_user_has_submitted = current_user
            .map(|user| feedback.iter().any(|fb| &fb.author_id == user))
            .unwrap_or(false);
        let feedback_stage = derive_feedback_stage(raw.status, feedback.len(), expected_reviewers);

        Self {
            id: raw.id,
            file_name: raw.file_name,
            uploader_name: raw.user_name,
            status: raw.status,
            analysis: raw.analysis_data,
            feedback,
            tags,
            title,
            current_user_has_submitted,
            feedback_stage,
        }
    }

    pub fn is_analyzing(&self) -> bool {
        self.status == DealStatus::Analyzing
    }

    pub fn badge(&self) -> StatusBadge {
        StatusBadge::for_deal(self.status, self.feedback_stage)
    }

    /// The given user's own feedback on this deal, if they left any.
    pub fn feedback_by(&self, user: &UserId) -> Option<&Feedback> {
        self.feedback.iter().find(|fb| &fb.author_id == user)
    }

    /// Feedback from everyone other than `user`, in server order.
    pub fn team_feedback<'a>(&'a self, user: &'a UserId) -> impl Iterator<Item = &'a Feedback> {
        self.feedback.iter().filter(move |fb| &fb.author_id != user)
    }
}

fn derive_tags(analysis: Option<&Analysis>) -> Vec<String> {
    if let Some(industries) = analysis.and_then(|a| a.ibis_industries.as_ref()) {
        return industries.clone();
    }
    let industry = analysis
        .and_then(|a| a.industry.as_deref())
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_TAG);
    vec![industry.to_string()]
}
