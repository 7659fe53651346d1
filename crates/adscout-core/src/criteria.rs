//! Search criteria and the status/pricing vocabulary shared across crates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of a submitted search.
///
/// A search is created in `processing`, then makes exactly one terminal
/// transition to `completed` or `failed`. Terminal states are final; there
/// are no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SearchStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SearchStatus::Pending => "pending",
            SearchStatus::Processing => "processing",
            SearchStatus::Completed => "completed",
            SearchStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for SearchStatus {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SearchStatus::Pending),
            "processing" => Ok(SearchStatus::Processing),
            "completed" => Ok(SearchStatus::Completed),
            "failed" => Ok(SearchStatus::Failed),
            other => Err(CriteriaError::UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an opportunity is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    Cpm,
    Cpc,
    Cpa,
    FlatRate,
    Auction,
}

impl PricingModel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PricingModel::Cpm => "cpm",
            PricingModel::Cpc => "cpc",
            PricingModel::Cpa => "cpa",
            PricingModel::FlatRate => "flat_rate",
            PricingModel::Auction => "auction",
        }
    }
}

impl std::fmt::Display for PricingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a caller asked for. Immutable once the search row is created.
///
/// Empty sets mean "no constraint" for that dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub budget: f64,
    #[serde(default)]
    pub target_audience: Option<serde_json::Value>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub ad_types: Vec<String>,
    #[serde(default)]
    pub platform_slugs: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("budget must be a positive number")]
    NonPositiveBudget,
    #[error("{field} entries must be non-empty strings")]
    BlankEntry { field: &'static str },
    #[error("{field} accepts at most {max} entries")]
    TooManyEntries { field: &'static str, max: usize },
    #[error("unknown search status '{0}'")]
    UnknownStatus(String),
}

const MAX_SET_ENTRIES: usize = 25;

impl SearchCriteria {
    /// Validate the criteria before any row is written.
    ///
    /// # Errors
    ///
    /// Returns the first failing field as a [`CriteriaError`].
    pub fn validate(&self) -> Result<(), CriteriaError> {
        if !self.budget.is_finite() || self.budget <= 0.0 {
            return Err(CriteriaError::NonPositiveBudget);
        }
        for (field, values) in [
            ("industries", &self.industries),
            ("ad_types", &self.ad_types),
            ("platforms", &self.platform_slugs),
            ("goals", &self.goals),
        ] {
            if values.len() > MAX_SET_ENTRIES {
                return Err(CriteriaError::TooManyEntries {
                    field,
                    max: MAX_SET_ENTRIES,
                });
            }
            if values.iter().any(|v| v.trim().is_empty()) {
                return Err(CriteriaError::BlankEntry { field });
            }
        }
        Ok(())
    }
}
