//! Deal list filtering for dashboard views.

use crate::domain::{Deal, DealStatus};
use serde::Deserialize;

/// Criteria for narrowing a deal list. Absent or empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DealFilter {
    /// Case-insensitive substring of the deal title.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<DealStatus>,
    /// Case-insensitive industry tag.
    #[serde(default)]
    pub industry: Option<String>,
}

impl DealFilter {
    pub fn matches(&self, deal: &Deal) -> bool {
        let search_ok = match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => deal
                .title
                .to_lowercase()
                .contains(&term.to_lowercase()),
            _ => true,
        };

        let status_ok = self.status.map_or(true, |status| deal.status == status);

        let industry_ok = match self.industry.as_deref().map(str::trim) {
            Some(industry) if !industry.is_empty() => deal
                .tags
                .iter()
                .any(|tag| tag.eq_ignore_ascii_case(industry)),
            _ => true,
        };

        search_ok && status_ok && industry_ok
    }

    /// Matching deals, in their original order.
    pub fn apply<'a>(&self, deals: &'a [Deal]) -> Vec<&'a Deal> {
        deals.iter().filter(|deal| self.matches(deal)).collect()
    }
}
