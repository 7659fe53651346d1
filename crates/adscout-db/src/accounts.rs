//! Database operations for the `accounts` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `accounts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub api_key_hash: String,
    pub plan: String,
    pub searches_used: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creates an account and returns the full inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a duplicate key hash).
pub async fn create_account(
    pool: &PgPool,
    name: &str,
    api_key_hash: &str,
    plan: &str,
) -> Result<AccountRow, DbError> {
    let row = sqlx::query_as::<_, AccountRow>(
        "INSERT INTO accounts (name, api_key_hash, plan) \
         VALUES ($1, $2, $3) \
         RETURNING id, public_id, name, api_key_hash, plan, searches_used, \
                   is_active, created_at, updated_at",
    )
    .bind(name)
    .bind(api_key_hash)
    .bind(plan)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Looks up an active account by its hashed API key.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_account_by_key_hash(
    pool: &PgPool,
    api_key_hash: &str,
) -> Result<Option<AccountRow>, DbError> {
    let row = sqlx::query_as::<_, AccountRow>(
        "SELECT id, public_id, name, api_key_hash, plan, searches_used, \
                is_active, created_at, updated_at \
         FROM accounts \
         WHERE api_key_hash = $1 AND is_active = true",
    )
    .bind(api_key_hash)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Charges one search against the account's monthly allowance.
///
/// The increment happens on submission, regardless of how the search ends.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the account does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn increment_searches_used(pool: &PgPool, account_id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE accounts \
         SET searches_used = searches_used + 1, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(account_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Zeroes `searches_used` on every account. Run on the first of the month.
///
/// Returns the number of accounts touched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn reset_all_search_usage(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE accounts \
         SET searches_used = 0, updated_at = NOW() \
         WHERE searches_used > 0",
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
