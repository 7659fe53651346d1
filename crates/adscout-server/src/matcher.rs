//! The matching pipeline: candidate load, scoring, ranking, persistence.
//!
//! Runs as a detached task per search. Every failure path marks the search
//! `failed` so a submitted search always reaches a terminal status (the
//! scheduler's stale sweep covers the crash-mid-run case).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::task::JoinHandle;

use adscout_core::{score_opportunity, OpportunityFacts, ScoredCandidate};
use adscout_db::{CandidateFilter, DbError, NewSearchResult, OpportunityRow};

/// Maximum number of ranked results persisted per search.
const RESULT_CAP: usize = 20;

/// Spawns the matching pipeline for a search as a detached task.
///
/// The caller (the intake handler) drops the handle; tests await it to
/// observe completion deterministically.
pub fn spawn_process_search(pool: PgPool, search_id: i64) -> JoinHandle<()> {
    tokio::spawn(async move {
        process_search(&pool, search_id).await;
    })
}

/// Runs the pipeline for one search, marking it `failed` on any error.
pub async fn process_search(pool: &PgPool, search_id: i64) {
    match run_pipeline(pool, search_id).await {
        Ok(count) => {
            tracing::info!(search_id, result_count = count, "search completed");
        }
        Err(e) => {
            tracing::error!(search_id, error = %e, "search pipeline failed");
            if let Err(fail_err) = adscout_db::fail_search(pool, search_id).await {
                tracing::error!(
                    search_id,
                    error = %fail_err,
                    "could not mark search failed"
                );
            }
        }
    }
}

async fn run_pipeline(pool: &PgPool, search_id: i64) -> Result<usize, DbError> {
    let search = adscout_db::get_search_by_id(pool, search_id).await?;

    let filter = CandidateFilter {
        budget: search.budget,
        platform_slugs: search.platform_slugs.clone(),
        ad_types: search.ad_types.clone(),
    };
    let candidates = adscout_db::list_candidate_opportunities(pool, &filter).await?;
    tracing::debug!(search_id, candidates = candidates.len(), "candidates loaded");

    let budget = search.budget.to_f64().unwrap_or(0.0);
    let scored: Vec<(i64, ScoredCandidate)> = candidates
        .iter()
        .map(|row| {
            (
                row.id,
                score_opportunity(budget, &search.goals, &opportunity_facts(row)),
            )
        })
        .collect();

    let results = rank_candidates(scored);
    let count = results.len();
    adscout_db::complete_search_with_results(pool, search_id, &results).await?;
    Ok(count)
}

fn opportunity_facts(row: &OpportunityRow) -> OpportunityFacts {
    OpportunityFacts {
        ad_type: row.ad_type.clone(),
        min_budget: row.min_budget.and_then(|d| d.to_f64()),
        max_budget: row.max_budget.and_then(|d| d.to_f64()),
        cpm_estimate: row.cpm_estimate.and_then(|d| d.to_f64()),
        avg_ctr: row.avg_ctr.and_then(|d| d.to_f64()),
        avg_conversion: row.avg_conversion.and_then(|d| d.to_f64()),
        quality_score: Some(row.quality_score),
    }
}

/// Orders scored candidates best-first and assigns dense ranks from 1.
///
/// The sort is stable, so candidates with equal scores keep their candidate
/// order (quality descending), and at most [`RESULT_CAP`] survive.
fn rank_candidates(mut scored: Vec<(i64, ScoredCandidate)>) -> Vec<NewSearchResult> {
    scored.sort_by(|a, b| b.1.match_score.cmp(&a.1.match_score));
    scored.truncate(RESULT_CAP);

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (opportunity_id, candidate))| NewSearchResult {
            opportunity_id,
            match_score: candidate.match_score,
            recommended_budget: Decimal::from_f64_retain(candidate.recommended_budget)
                .unwrap_or_default()
                .round_dp(2),
            expected_reach: candidate.expected_reach,
            expected_ctr: Decimal::from_f64_retain(candidate.expected_ctr)
                .unwrap_or_default()
                .round_dp(4),
            expected_roi: Decimal::from_f64_retain(candidate.expected_roi)
                .unwrap_or_default()
                .round_dp(4),
            reasoning: candidate.reasoning,
            rank: i32::try_from(i).unwrap_or(i32::MAX - 1) + 1,
        })
        .collect()
}
