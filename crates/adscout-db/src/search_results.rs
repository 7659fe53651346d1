//! Database operations for the `search_results` table.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Insert parameters for one ranked result.
#[derive(Debug, Clone)]
pub struct NewSearchResult {
    pub opportunity_id: i64,
    pub match_score: i32,
    pub recommended_budget: Decimal,
    pub expected_reach: i64,
    pub expected_ctr: Decimal,
    pub expected_roi: Decimal,
    pub reasoning: String,
    pub rank: i32,
}

/// A result row joined with its opportunity and platform, for the results
/// endpoint (ordered by rank ascending).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchResultDetailRow {
    pub rank: i32,
    pub match_score: i32,
    pub recommended_budget: Option<Decimal>,
    pub expected_reach: Option<i64>,
    pub expected_ctr: Option<Decimal>,
    pub expected_roi: Option<Decimal>,
    pub reasoning: Option<String>,
    pub opportunity_public_id: Uuid,
    pub opportunity_title: String,
    pub ad_type: String,
    pub pricing_model: String,
    pub platform_name: String,
    pub platform_slug: String,
}

/// Persists the ranked results and marks the search completed, atomically.
///
/// Result inserts and the terminal status update share one transaction, so a
/// failure at any point leaves zero result rows and the search still in
/// `processing` (the caller then marks it failed). The completion update is
/// guarded on `status = 'processing'`; if the search was concurrently failed
/// (e.g. by the stale sweep) the whole batch rolls back.
///
/// # Errors
///
/// Returns [`DbError::InvalidSearchTransition`] if the search is no longer in
/// `processing`, or [`DbError::Sqlx`] if any statement fails.
pub async fn complete_search_with_results(
    pool: &PgPool,
    search_id: i64,
    results: &[NewSearchResult],
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    for result in results {
        sqlx::query(
            "INSERT INTO search_results \
                 (search_id, opportunity_id, match_score, recommended_budget, expected_reach, \
                  expected_ctr, expected_roi, reasoning, rank) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(search_id)
        .bind(result.opportunity_id)
        .bind(result.match_score)
        .bind(result.recommended_budget)
        .bind(result.expected_reach)
        .bind(result.expected_ctr)
        .bind(result.expected_roi)
        .bind(&result.reasoning)
        .bind(result.rank)
        .execute(&mut *tx)
        .await?;
    }

    let updated = sqlx::query(
        "UPDATE searches \
         SET status = 'completed', result_count = $1, completed_at = NOW() \
         WHERE id = $2 AND status = 'processing'",
    )
    .bind(i32::try_from(results.len()).unwrap_or(i32::MAX))
    .bind(search_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(DbError::InvalidSearchTransition {
            id: search_id,
            expected_status: "processing",
        });
    }

    tx.commit().await?;
    Ok(())
}

/// Returns all results for a search, ordered by rank ascending.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_results_for_search(
    pool: &PgPool,
    search_id: i64,
) -> Result<Vec<SearchResultDetailRow>, DbError> {
    let rows = sqlx::query_as::<_, SearchResultDetailRow>(
        "SELECT sr.rank, sr.match_score, sr.recommended_budget, sr.expected_reach, \
                sr.expected_ctr, sr.expected_roi, sr.reasoning, \
                o.public_id AS opportunity_public_id, o.title AS opportunity_title, \
                o.ad_type, o.pricing_model, p.name AS platform_name, p.slug AS platform_slug \
         FROM search_results sr \
         JOIN ad_opportunities o ON o.id = sr.opportunity_id \
         JOIN ad_platforms p ON p.id = o.platform_id \
         WHERE sr.search_id = $1 \
         ORDER BY sr.rank ASC",
    )
    .bind(search_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
