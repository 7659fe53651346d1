//! Match scoring for one (criteria, opportunity) pair.
//!
//! The score is a sum of independently capped components; each component is
//! clamped before summing so that a runaway input cannot eat another
//! component's weight. The final sum is clamped to 100.

/// Numeric facts about one opportunity, as seen by the scorer.
///
/// Optional fields carry the "we never measured this" case; the scorer
/// substitutes fixed defaults rather than skipping the component.
#[derive(Debug, Clone, PartialEq)]
pub struct OpportunityFacts {
    pub ad_type: String,
    pub min_budget: Option<f64>,
    pub max_budget: Option<f64>,
    pub cpm_estimate: Option<f64>,
    pub avg_ctr: Option<f64>,
    pub avg_conversion: Option<f64>,
    pub quality_score: Option<i32>,
}

/// One scored candidate. Ephemeral: only persisted once a rank is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    /// Integer match score clamped to 0..=100.
    pub match_score: i32,
    pub recommended_budget: f64,
    pub expected_reach: i64,
    pub expected_ctr: f64,
    pub expected_roi: f64,
    pub reasoning: String,
}

const QUALITY_CAP: f64 = 40.0;
const DEFAULT_QUALITY: f64 = 50.0;
const CTR_CAP: f64 = 25.0;
const DEFAULT_CTR: f64 = 0.02;
const BUDGET_FIT_CAP: f64 = 20.0;
const REACH_CAP: f64 = 15.0;
const DEFAULT_CPM: f64 = 10.0;
const GOAL_BONUS: f64 = 5.0;
const MAX_SCORE: f64 = 100.0;
const MAX_REASONS: usize = 3;

// Reasoning thresholds. Contract values carried over from the production
// scoring rules; they have no deeper tuning rationale.
const STRONG_QUALITY_POINTS: f64 = 30.0;
const STRONG_CTR: f64 = 0.03;
const STRONG_REACH_EFFICIENCY: f64 = 0.7;
const CLICKS_CTR_THRESHOLD: f64 = 0.02;
const CONVERSION_THRESHOLD: f64 = 0.01;

/// Score one opportunity against a budget and goal set.
///
/// Pure and deterministic: identical inputs always produce an identical
/// [`ScoredCandidate`]. A zero (or negative) `cpm_estimate` is treated the
/// same as a missing one so the reach division is never by zero.
#[must_use]
pub fn score_opportunity(budget: f64, goals: &[String], facts: &OpportunityFacts) -> ScoredCandidate {
    let mut score = 0.0_f64;
    let mut reasons: Vec<&'static str> = Vec::new();

    // Quality (0-40 points).
    let quality = facts
        .quality_score
        .map_or(DEFAULT_QUALITY, f64::from);
    let quality_points = (quality / 100.0 * QUALITY_CAP).clamp(0.0, QUALITY_CAP);
    score += quality_points;
    if quality_points > STRONG_QUALITY_POINTS {
        reasons.push("High quality score");
    }

    // CTR performance (0-25 points).
    let avg_ctr = facts.avg_ctr.unwrap_or(DEFAULT_CTR);
    let ctr_points = (avg_ctr * 1000.0).clamp(0.0, CTR_CAP);
    score += ctr_points;
    if avg_ctr > STRONG_CTR {
        reasons.push("Strong click-through rate");
    }

    // Budget fit (10 or 20 points). A missing max budget is treated as twice
    // the caller's budget.
    let min_budget = facts.min_budget.unwrap_or(0.0);
    let max_budget = facts.max_budget.unwrap_or(budget * 2.0);
    let in_range = budget >= min_budget && budget <= max_budget;
    score += if in_range {
        reasons.push("Perfect budget fit");
        BUDGET_FIT_CAP
    } else {
        BUDGET_FIT_CAP / 2.0
    };

    // Reach efficiency (0-15 points).
    let cpm = effective_cpm(facts.cpm_estimate);
    let reach_efficiency = (20.0 / cpm).min(1.0);
    score += reach_efficiency * REACH_CAP;
    if reach_efficiency > STRONG_REACH_EFFICIENCY {
        reasons.push("Excellent cost per impression");
    }

    // Goal alignment: +5 per matched goal.
    if has_goal(goals, "awareness") && facts.ad_type.contains("display") {
        score += GOAL_BONUS;
        reasons.push("Good for brand awareness");
    }
    if has_goal(goals, "clicks") && avg_ctr > CLICKS_CTR_THRESHOLD {
        score += GOAL_BONUS;
        reasons.push("Optimized for click performance");
    }
    if has_goal(goals, "conversions") && facts.avg_conversion.unwrap_or(0.0) > CONVERSION_THRESHOLD {
        score += GOAL_BONUS;
        reasons.push("Strong conversion potential");
    }

    let recommended_budget = (budget * 0.2).max(min_budget).min(budget);
    #[allow(clippy::cast_possible_truncation)]
    let expected_reach = (recommended_budget / cpm * 1000.0).round() as i64;
    let expected_ctr = avg_ctr;
    let expected_roi = avg_ctr * 2.0;

    #[allow(clippy::cast_possible_truncation)]
    let match_score = score.clamp(0.0, MAX_SCORE).round() as i32;

    ScoredCandidate {
        match_score,
        recommended_budget,
        expected_reach,
        expected_ctr,
        expected_roi,
        reasoning: build_reasoning(&reasons),
    }
}

fn effective_cpm(cpm_estimate: Option<f64>) -> f64 {
    match cpm_estimate {
        Some(cpm) if cpm > 0.0 => cpm,
        _ => DEFAULT_CPM,
    }
}

fn has_goal(goals: &[String], goal: &str) -> bool {
    goals.iter().any(|g| g == goal)
}

fn build_reasoning(reasons: &[&'static str]) -> String {
    if reasons.is_empty() {
        return String::new();
    }
    let mut text = reasons[..reasons.len().min(MAX_REASONS)].join(". ");
    text.push('.');
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts() -> OpportunityFacts {
        OpportunityFacts {
            ad_type: "social_post".to_string(),
            min_budget: None,
            max_budget: None,
            cpm_estimate: None,
            avg_ctr: None,
            avg_conversion: None,
            quality_score: None,
        }
    }

    #[test]
    fn strong_candidate_with_clicks_goal_clamps_to_one_hundred() {
        // quality 90 -> 36, ctr 0.03 -> capped 25, budget in [100, 10000] -> 20,
        // 20/8.5 caps reach efficiency at 1.0 -> 15, clicks goal -> +5; 101 -> 100.
        let facts = OpportunityFacts {
            ad_type: "social_post".to_string(),
            min_budget: Some(100.0),
            max_budget: Some(10_000.0),
            cpm_estimate: Some(8.5),
            avg_ctr: Some(0.03),
            avg_conversion: None,
            quality_score: Some(90),
        };
        let scored = score_opportunity(5000.0, &["clicks".to_string()], &facts);
        assert_eq!(scored.match_score, 100);
    }

    #[test]
    fn all_defaults_score_is_deterministic() {
        // quality 50 -> 20, ctr 0.02 -> 20, budget fit (max = 2x budget) -> 20,
        // cpm 10 -> efficiency 1.0 -> 15; total 75.
        let scored = score_opportunity(1000.0, &[], &facts());
        assert_eq!(scored.match_score, 75);
    }

    #[test]
    fn scoring_is_idempotent() {
        let f = OpportunityFacts {
            ad_type: "display_banner".to_string(),
            min_budget: Some(50.0),
            max_budget: Some(2000.0),
            cpm_estimate: Some(12.0),
            avg_ctr: Some(0.025),
            avg_conversion: Some(0.02),
            quality_score: Some(81),
        };
        let goals = vec!["awareness".to_string(), "conversions".to_string()];
        assert_eq!(
            score_opportunity(800.0, &goals, &f),
            score_opportunity(800.0, &goals, &f)
        );
    }

    #[test]
    fn ctr_component_is_capped_before_summing() {
        let mut f = facts();
        f.avg_ctr = Some(0.5); // would be 500 points uncapped
        let scored = score_opportunity(1000.0, &[], &f);
        // quality 20 + ctr capped 25 + budget 20 + reach 15 = 80
        assert_eq!(scored.match_score, 80);
    }

    #[test]
    fn quality_component_is_capped_before_summing() {
        let mut f = facts();
        f.quality_score = Some(250); // out-of-range input must not leak past the cap
        let scored = score_opportunity(1000.0, &[], &f);
        assert_eq!(scored.match_score, 95); // 40 + 20 + 20 + 15
    }

    #[test]
    fn budget_outside_range_scores_half_fit() {
        let mut f = facts();
        f.min_budget = Some(5000.0);
        f.max_budget = Some(10_000.0);
        let scored = score_opportunity(1000.0, &[], &f);
        // quality 20 + ctr 20 + budget 10 + reach 15 = 65
        assert_eq!(scored.match_score, 65);
        assert!(!scored.reasoning.contains("Perfect budget fit"));
    }

    #[test]
    fn zero_cpm_is_treated_as_default() {
        let mut zero = facts();
        zero.cpm_estimate = Some(0.0);
        let with_zero = score_opportunity(1000.0, &[], &zero);
        let with_default = score_opportunity(1000.0, &[], &facts());
        assert_eq!(with_zero, with_default);
        assert!(with_zero.expected_reach > 0);
    }

    #[test]
    fn expensive_cpm_reduces_reach_points() {
        let mut f = facts();
        f.cpm_estimate = Some(40.0); // efficiency 0.5 -> 7.5 points
        let scored = score_opportunity(1000.0, &[], &f);
        assert_eq!(scored.match_score, 68); // 20 + 20 + 20 + 7.5 = 67.5 -> 68
    }

    #[test]
    fn awareness_goal_requires_display_ad_type() {
        let goals = vec!["awareness".to_string()];
        let mut display = facts();
        display.ad_type = "display_banner".to_string();
        let with_bonus = score_opportunity(1000.0, &goals, &display);
        let without_bonus = score_opportunity(1000.0, &goals, &facts());
        assert_eq!(with_bonus.match_score - without_bonus.match_score, 5);
        assert!(with_bonus.reasoning.contains("brand awareness"));
    }

    #[test]
    fn conversions_goal_needs_measured_conversion_rate() {
        let goals = vec!["conversions".to_string()];
        let none = score_opportunity(1000.0, &goals, &facts());
        let mut f = facts();
        f.avg_conversion = Some(0.005); // below threshold
        let below = score_opportunity(1000.0, &goals, &f);
        f.avg_conversion = Some(0.02);
        let above = score_opportunity(1000.0, &goals, &f);
        assert_eq!(none.match_score, below.match_score);
        assert_eq!(above.match_score - below.match_score, 5);
    }

    #[test]
    fn reasoning_keeps_at_most_three_labels() {
        let f = OpportunityFacts {
            ad_type: "display_banner".to_string(),
            min_budget: Some(10.0),
            max_budget: Some(100_000.0),
            cpm_estimate: Some(2.0),
            avg_ctr: Some(0.05),
            avg_conversion: Some(0.05),
            quality_score: Some(95),
        };
        let goals = vec![
            "awareness".to_string(),
            "clicks".to_string(),
            "conversions".to_string(),
        ];
        let scored = score_opportunity(5000.0, &goals, &f);
        assert_eq!(scored.reasoning.matches(". ").count(), 2);
        assert!(scored.reasoning.ends_with('.'));
    }

    #[test]
    fn reasoning_is_empty_when_nothing_stands_out() {
        let f = OpportunityFacts {
            ad_type: "social_post".to_string(),
            min_budget: Some(5000.0),
            max_budget: Some(9000.0), // budget below min -> no fit label
            cpm_estimate: Some(40.0),
            avg_ctr: Some(0.01),
            avg_conversion: None,
            quality_score: Some(40),
        };
        let scored = score_opportunity(1000.0, &[], &f);
        assert!(scored.reasoning.is_empty());
    }

    #[test]
    fn recommended_budget_clamps_between_min_and_budget() {
        let mut f = facts();
        f.min_budget = Some(500.0);
        let scored = score_opportunity(1000.0, &[], &f);
        // 20% of budget is 200, below min 500 -> raised to 500.
        assert!((scored.recommended_budget - 500.0).abs() < f64::EPSILON);

        f.min_budget = Some(5000.0);
        let scored = score_opportunity(1000.0, &[], &f);
        // min above budget -> capped at budget.
        assert!((scored.recommended_budget - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn expected_metrics_follow_cpm_and_ctr() {
        let mut f = facts();
        f.cpm_estimate = Some(8.0);
        f.avg_ctr = Some(0.03);
        let scored = score_opportunity(1000.0, &[], &f);
        // recommended 200, 200/8*1000 = 25_000 impressions.
        assert_eq!(scored.expected_reach, 25_000);
        assert!((scored.expected_ctr - 0.03).abs() < f64::EPSILON);
        assert!((scored.expected_roi - 0.06).abs() < f64::EPSILON);
    }

    #[test]
    fn score_never_leaves_bounds() {
        let extremes = [
            OpportunityFacts {
                ad_type: "display".to_string(),
                min_budget: Some(0.0),
                max_budget: Some(f64::MAX),
                cpm_estimate: Some(0.0001),
                avg_ctr: Some(10.0),
                avg_conversion: Some(1.0),
                quality_score: Some(100),
            },
            OpportunityFacts {
                ad_type: String::new(),
                min_budget: Some(f64::MAX),
                max_budget: Some(0.0),
                cpm_estimate: Some(f64::MAX),
                avg_ctr: Some(0.0),
                avg_conversion: Some(0.0),
                quality_score: Some(0),
            },
        ];
        let goals = vec![
            "awareness".to_string(),
            "clicks".to_string(),
            "conversions".to_string(),
        ];
        for f in &extremes {
            let scored = score_opportunity(123.0, &goals, f);
            assert!((0..=100).contains(&scored.match_score));
        }
    }
}
