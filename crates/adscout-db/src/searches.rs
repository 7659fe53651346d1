//! Database operations for the `searches` table.
//!
//! A search row is written exactly twice: created in `processing` at
//! submission, then moved once to a terminal `completed` or `failed` status.
//! Terminal transitions carry a `WHERE status = ...` guard so a second writer
//! cannot overwrite a terminal state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `searches` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchRow {
    pub id: i64,
    pub public_id: Uuid,
    pub account_id: i64,
    pub budget: Decimal,
    pub target_audience: Option<serde_json::Value>,
    pub industries: Vec<String>,
    pub ad_types: Vec<String>,
    pub platform_slugs: Vec<String>,
    pub goals: Vec<String>,
    pub status: String,
    pub result_count: i32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Insert parameters for a new search.
#[derive(Debug, Clone)]
pub struct NewSearch {
    pub account_id: i64,
    pub budget: Decimal,
    pub target_audience: Option<serde_json::Value>,
    pub industries: Vec<String>,
    pub ad_types: Vec<String>,
    pub platform_slugs: Vec<String>,
    pub goals: Vec<String>,
}

/// Creates a search in `processing` status and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_search(pool: &PgPool, new: &NewSearch) -> Result<SearchRow, DbError> {
    let row = sqlx::query_as::<_, SearchRow>(
        "INSERT INTO searches \
             (account_id, budget, target_audience, industries, ad_types, platform_slugs, goals, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, 'processing') \
         RETURNING id, public_id, account_id, budget, target_audience, industries, ad_types, \
                   platform_slugs, goals, status, result_count, created_at, completed_at",
    )
    .bind(new.account_id)
    .bind(new.budget)
    .bind(&new.target_audience)
    .bind(&new.industries)
    .bind(&new.ad_types)
    .bind(&new.platform_slugs)
    .bind(&new.goals)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Fetches a search by its internal id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_search_by_id(pool: &PgPool, id: i64) -> Result<SearchRow, DbError> {
    let row = sqlx::query_as::<_, SearchRow>(
        "SELECT id, public_id, account_id, budget, target_audience, industries, ad_types, \
                platform_slugs, goals, status, result_count, created_at, completed_at \
         FROM searches \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;
    Ok(row)
}

/// Fetches a search by public UUID, scoped to the owning account.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the search does not exist or belongs to a
/// different account, or [`DbError::Sqlx`] if the query fails.
pub async fn get_search_for_account(
    pool: &PgPool,
    public_id: Uuid,
    account_id: i64,
) -> Result<SearchRow, DbError> {
    let row = sqlx::query_as::<_, SearchRow>(
        "SELECT id, public_id, account_id, budget, target_audience, industries, ad_types, \
                platform_slugs, goals, status, result_count, created_at, completed_at \
         FROM searches \
         WHERE public_id = $1 AND account_id = $2",
    )
    .bind(public_id)
    .bind(account_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;
    Ok(row)
}

/// Returns a page of the account's searches, newest first, plus the total count.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn list_searches_for_account(
    pool: &PgPool,
    account_id: i64,
    limit: i64,
    offset: i64,
) -> Result<(Vec<SearchRow>, i64), DbError> {
    let rows = sqlx::query_as::<_, SearchRow>(
        "SELECT id, public_id, account_id, budget, target_audience, industries, ad_types, \
                platform_slugs, goals, status, result_count, created_at, completed_at \
         FROM searches \
         WHERE account_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2 OFFSET $3",
    )
    .bind(account_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM searches WHERE account_id = $1")
        .bind(account_id)
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

/// Marks a search as `failed`. No result rows are retained for failed searches.
///
/// # Errors
///
/// Returns [`DbError::InvalidSearchTransition`] if the search is already in a
/// terminal status, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_search(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE searches \
         SET status = 'failed', completed_at = NOW() \
         WHERE id = $1 AND status IN ('pending', 'processing')",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSearchTransition {
            id,
            expected_status: "processing",
        });
    }
    Ok(())
}

/// Fails searches stuck in `processing` for longer than `max_age_secs`.
///
/// A crash mid-run would otherwise leave the search in `processing` forever;
/// the scheduler sweeps these hourly. Returns the number of searches failed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn fail_stale_searches(pool: &PgPool, max_age_secs: i64) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE searches \
         SET status = 'failed', completed_at = NOW() \
         WHERE status = 'processing' \
           AND created_at < NOW() - make_interval(secs => $1::double precision)",
    )
    .bind(max_age_secs)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
