//! Database operations for the `ad_opportunities` table, including the
//! candidate query that feeds the matching pipeline.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `ad_opportunities` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OpportunityRow {
    pub id: i64,
    pub public_id: Uuid,
    pub platform_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub ad_type: String,
    pub placement: Option<String>,
    pub pricing_model: String,
    pub min_budget: Option<Decimal>,
    pub max_budget: Option<Decimal>,
    pub cpm_estimate: Option<Decimal>,
    pub avg_ctr: Option<Decimal>,
    pub avg_conversion: Option<Decimal>,
    pub quality_score: i32,
    pub is_active: bool,
    pub last_verified: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An opportunity joined with its platform, for listing endpoints.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OpportunityListItem {
    pub public_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub ad_type: String,
    pub placement: Option<String>,
    pub pricing_model: String,
    pub min_budget: Option<Decimal>,
    pub max_budget: Option<Decimal>,
    pub cpm_estimate: Option<Decimal>,
    pub avg_ctr: Option<Decimal>,
    pub avg_conversion: Option<Decimal>,
    pub quality_score: i32,
    pub platform_name: String,
    pub platform_slug: String,
    pub platform_type: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Candidate filter
// ---------------------------------------------------------------------------

/// What narrows the opportunity set before scoring.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    pub budget: Decimal,
    pub platform_slugs: Vec<String>,
    pub ad_types: Vec<String>,
}

/// Hard ceiling on the candidate set, to bound scoring cost. Matching sets
/// larger than this silently lose their lowest-quality candidates.
pub const CANDIDATE_CAP: i64 = 100;

/// Returns the opportunities a search could plausibly use.
///
/// Eligibility: active rows whose `min_budget` (absent = 0) does not exceed
/// the search budget, and whose `max_budget` (if any) covers at least 10% of
/// it. Non-empty platform-slug / ad-type sets restrict further; empty sets do
/// not. Ordered by `quality_score` descending (id breaks ties so the order is
/// a total one), capped at [`CANDIDATE_CAP`]. Pure read.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_candidate_opportunities(
    pool: &PgPool,
    filter: &CandidateFilter,
) -> Result<Vec<OpportunityRow>, DbError> {
    let rows = sqlx::query_as::<_, OpportunityRow>(
        "SELECT id, public_id, platform_id, title, description, ad_type, placement, \
                pricing_model, min_budget, max_budget, cpm_estimate, avg_ctr, avg_conversion, \
                quality_score, is_active, last_verified, created_at, updated_at \
         FROM ad_opportunities o \
         WHERE o.is_active = true \
           AND COALESCE(o.min_budget, 0) <= $1 \
           AND (o.max_budget IS NULL OR o.max_budget >= $1 * 0.1) \
           AND (cardinality($2::text[]) = 0 OR EXISTS ( \
                 SELECT 1 FROM ad_platforms p \
                 WHERE p.id = o.platform_id AND p.slug = ANY($2))) \
           AND (cardinality($3::text[]) = 0 OR o.ad_type = ANY($3)) \
         ORDER BY o.quality_score DESC, o.id \
         LIMIT $4",
    )
    .bind(filter.budget)
    .bind(&filter.platform_slugs)
    .bind(&filter.ad_types)
    .bind(CANDIDATE_CAP)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Listing / detail
// ---------------------------------------------------------------------------

/// Optional filters for the opportunity listing endpoint.
#[derive(Debug, Clone, Default)]
pub struct OpportunityListFilters<'a> {
    pub platform_slug: Option<&'a str>,
    pub platform_type: Option<&'a str>,
    pub ad_type: Option<&'a str>,
    pub pricing_model: Option<&'a str>,
    pub min_budget: Option<Decimal>,
    pub max_budget: Option<Decimal>,
    pub min_ctr: Option<Decimal>,
    pub search: Option<&'a str>,
    pub sort_by: Option<&'a str>,
    pub sort_descending: bool,
    pub limit: i64,
    pub offset: i64,
}

fn order_clause(sort_by: Option<&str>, descending: bool) -> String {
    // Whitelisted columns only; anything else falls back to quality_score.
    let column = match sort_by {
        Some("cpm_estimate") => "o.cpm_estimate",
        Some("avg_ctr") => "o.avg_ctr",
        Some("created_at") => "o.created_at",
        _ => "o.quality_score",
    };
    let direction = if descending { "DESC" } else { "ASC" };
    format!("ORDER BY {column} {direction} NULLS LAST, o.id")
}

/// Lists active opportunities with their platform, applying the given filters.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_opportunities(
    pool: &PgPool,
    filters: &OpportunityListFilters<'_>,
) -> Result<Vec<OpportunityListItem>, DbError> {
    let query = format!(
        "SELECT o.public_id, o.title, o.description, o.ad_type, o.placement, o.pricing_model, \
                o.min_budget, o.max_budget, o.cpm_estimate, o.avg_ctr, o.avg_conversion, \
                o.quality_score, p.name AS platform_name, p.slug AS platform_slug, \
                p.platform_type, o.created_at \
         FROM ad_opportunities o \
         JOIN ad_platforms p ON p.id = o.platform_id \
         WHERE o.is_active = true \
           AND ($1::text IS NULL OR p.slug = $1) \
           AND ($2::text IS NULL OR p.platform_type = $2) \
           AND ($3::text IS NULL OR o.ad_type = $3) \
           AND ($4::text IS NULL OR o.pricing_model = $4) \
           AND ($5::numeric IS NULL OR COALESCE(o.min_budget, 0) >= $5) \
           AND ($6::numeric IS NULL OR o.max_budget IS NULL OR o.max_budget <= $6) \
           AND ($7::numeric IS NULL OR o.avg_ctr >= $7) \
           AND ($8::text IS NULL OR o.title ILIKE '%' || $8 || '%' \
                OR o.description ILIKE '%' || $8 || '%') \
         {} \
         LIMIT $9 OFFSET $10",
        order_clause(filters.sort_by, filters.sort_descending)
    );

    let rows = sqlx::query_as::<_, OpportunityListItem>(&query)
        .bind(filters.platform_slug)
        .bind(filters.platform_type)
        .bind(filters.ad_type)
        .bind(filters.pricing_model)
        .bind(filters.min_budget)
        .bind(filters.max_budget)
        .bind(filters.min_ctr)
        .bind(filters.search)
        .bind(filters.limit)
        .bind(filters.offset)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Counts active opportunities matching the given filters (sort and paging
/// fields are ignored).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_opportunities(
    pool: &PgPool,
    filters: &OpportunityListFilters<'_>,
) -> Result<i64, DbError> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) \
         FROM ad_opportunities o \
         JOIN ad_platforms p ON p.id = o.platform_id \
         WHERE o.is_active = true \
           AND ($1::text IS NULL OR p.slug = $1) \
           AND ($2::text IS NULL OR p.platform_type = $2) \
           AND ($3::text IS NULL OR o.ad_type = $3) \
           AND ($4::text IS NULL OR o.pricing_model = $4) \
           AND ($5::numeric IS NULL OR COALESCE(o.min_budget, 0) >= $5) \
           AND ($6::numeric IS NULL OR o.max_budget IS NULL OR o.max_budget <= $6) \
           AND ($7::numeric IS NULL OR o.avg_ctr >= $7) \
           AND ($8::text IS NULL OR o.title ILIKE '%' || $8 || '%' \
                OR o.description ILIKE '%' || $8 || '%')",
    )
    .bind(filters.platform_slug)
    .bind(filters.platform_type)
    .bind(filters.ad_type)
    .bind(filters.pricing_model)
    .bind(filters.min_budget)
    .bind(filters.max_budget)
    .bind(filters.min_ctr)
    .bind(filters.search)
    .fetch_one(pool)
    .await?;
    Ok(total)
}

/// Fetches one opportunity (with platform) by its public UUID.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such opportunity exists, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_opportunity_by_public_id(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<OpportunityListItem, DbError> {
    let row = sqlx::query_as::<_, OpportunityListItem>(
        "SELECT o.public_id, o.title, o.description, o.ad_type, o.placement, o.pricing_model, \
                o.min_budget, o.max_budget, o.cpm_estimate, o.avg_ctr, o.avg_conversion, \
                o.quality_score, p.name AS platform_name, p.slug AS platform_slug, \
                p.platform_type, o.created_at \
         FROM ad_opportunities o \
         JOIN ad_platforms p ON p.id = o.platform_id \
         WHERE o.public_id = $1",
    )
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;
    Ok(row)
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

/// Returns the platforms most frequent among the account's recent completed
/// searches (top 3 ranked results of the last 5 searches).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn top_platform_ids_for_account(
    pool: &PgPool,
    account_id: i64,
) -> Result<Vec<i64>, DbError> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT o.platform_id \
         FROM search_results sr \
         JOIN ad_opportunities o ON o.id = sr.opportunity_id \
         WHERE sr.rank <= 3 \
           AND sr.search_id IN ( \
               SELECT id FROM searches \
               WHERE account_id = $1 AND status = 'completed' \
               ORDER BY created_at DESC \
               LIMIT 5) \
         GROUP BY o.platform_id \
         ORDER BY COUNT(*) DESC \
         LIMIT 3",
    )
    .bind(account_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// High-quality active opportunities on the given platforms, for the
/// recommendations endpoint.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recommended_opportunities(
    pool: &PgPool,
    platform_ids: &[i64],
) -> Result<Vec<OpportunityListItem>, DbError> {
    let rows = sqlx::query_as::<_, OpportunityListItem>(
        "SELECT o.public_id, o.title, o.description, o.ad_type, o.placement, o.pricing_model, \
                o.min_budget, o.max_budget, o.cpm_estimate, o.avg_ctr, o.avg_conversion, \
                o.quality_score, p.name AS platform_name, p.slug AS platform_slug, \
                p.platform_type, o.created_at \
         FROM ad_opportunities o \
         JOIN ad_platforms p ON p.id = o.platform_id \
         WHERE o.is_active = true \
           AND o.quality_score >= 75 \
           AND o.platform_id = ANY($1) \
         ORDER BY o.quality_score DESC, o.id \
         LIMIT 5",
    )
    .bind(platform_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Maintenance / seed
// ---------------------------------------------------------------------------

/// Deactivates opportunities whose `last_verified` is older than `days` days.
///
/// Rows that were never verified are left alone. Returns the number of rows
/// deactivated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn deactivate_stale_opportunities(pool: &PgPool, days: i32) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE ad_opportunities \
         SET is_active = false, updated_at = NOW() \
         WHERE is_active = true \
           AND last_verified IS NOT NULL \
           AND last_verified < NOW() - make_interval(days => $1)",
    )
    .bind(days)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Insert parameters for a new or refreshed opportunity.
#[derive(Debug, Clone)]
pub struct NewOpportunity<'a> {
    pub platform_id: i64,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub ad_type: &'a str,
    pub placement: Option<&'a str>,
    pub pricing_model: &'a str,
    pub min_budget: Option<Decimal>,
    pub max_budget: Option<Decimal>,
    pub cpm_estimate: Option<Decimal>,
    pub avg_ctr: Option<Decimal>,
    pub avg_conversion: Option<Decimal>,
    pub quality_score: i32,
}

/// Inserts or refreshes an opportunity keyed by `(platform_id, title)`,
/// stamping `last_verified = NOW()`. Returns the row id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_opportunity(
    pool: &PgPool,
    opportunity: &NewOpportunity<'_>,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO ad_opportunities \
             (platform_id, title, description, ad_type, placement, pricing_model, \
              min_budget, max_budget, cpm_estimate, avg_ctr, avg_conversion, \
              quality_score, is_active, last_verified) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, true, NOW()) \
         ON CONFLICT (platform_id, title) DO UPDATE SET \
             description = EXCLUDED.description, \
             ad_type = EXCLUDED.ad_type, \
             placement = EXCLUDED.placement, \
             pricing_model = EXCLUDED.pricing_model, \
             min_budget = EXCLUDED.min_budget, \
             max_budget = EXCLUDED.max_budget, \
             cpm_estimate = EXCLUDED.cpm_estimate, \
             avg_ctr = EXCLUDED.avg_ctr, \
             avg_conversion = EXCLUDED.avg_conversion, \
             quality_score = EXCLUDED.quality_score, \
             is_active = true, \
             last_verified = NOW(), \
             updated_at = NOW() \
         RETURNING id",
    )
    .bind(opportunity.platform_id)
    .bind(opportunity.title)
    .bind(opportunity.description)
    .bind(opportunity.ad_type)
    .bind(opportunity.placement)
    .bind(opportunity.pricing_model)
    .bind(opportunity.min_budget)
    .bind(opportunity.max_budget)
    .bind(opportunity.cpm_estimate)
    .bind(opportunity.avg_ctr)
    .bind(opportunity.avg_conversion)
    .bind(opportunity.quality_score)
    .fetch_one(pool)
    .await?;
    Ok(id)
}
