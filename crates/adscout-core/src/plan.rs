//! Subscription plans and their monthly search quotas.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Starter,
    Growth,
    Scale,
    Enterprise,
}

impl Plan {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Starter => "starter",
            Plan::Growth => "growth",
            Plan::Scale => "scale",
            Plan::Enterprise => "enterprise",
        }
    }

    /// Monthly search allowance; `None` means unlimited.
    #[must_use]
    pub fn monthly_search_limit(self) -> Option<i32> {
        match self {
            Plan::Starter => Some(50),
            Plan::Growth => Some(200),
            Plan::Scale | Plan::Enterprise => None,
        }
    }

    /// Whether an account that has already used `searches_used` searches this
    /// month may submit another one.
    #[must_use]
    pub fn allows_search(self, searches_used: i32) -> bool {
        match self.monthly_search_limit() {
            Some(limit) => searches_used < limit,
            None => true,
        }
    }

    /// Parse the stored plan string, falling back to the most restrictive plan
    /// for unknown values.
    #[must_use]
    pub fn parse_or_starter(raw: &str) -> Self {
        match raw {
            "growth" => Plan::Growth,
            "scale" => Plan::Scale,
            "enterprise" => Plan::Enterprise,
            _ => Plan::Starter,
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_limit_is_fifty() {
        assert_eq!(Plan::Starter.monthly_search_limit(), Some(50));
        assert!(Plan::Starter.allows_search(49));
        assert!(!Plan::Starter.allows_search(50));
    }

    #[test]
    fn growth_limit_is_two_hundred() {
        assert!(Plan::Growth.allows_search(199));
        assert!(!Plan::Growth.allows_search(200));
    }

    #[test]
    fn scale_and_enterprise_are_unlimited() {
        assert!(Plan::Scale.allows_search(i32::MAX - 1));
        assert!(Plan::Enterprise.allows_search(1_000_000));
        assert_eq!(Plan::Scale.monthly_search_limit(), None);
    }

    #[test]
    fn unknown_plan_string_falls_back_to_starter() {
        assert_eq!(Plan::parse_or_starter("platinum"), Plan::Starter);
        assert_eq!(Plan::parse_or_starter("growth"), Plan::Growth);
    }
}
