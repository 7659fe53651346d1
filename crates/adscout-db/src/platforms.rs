//! Database operations for the `ad_platforms` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `ad_platforms` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlatformRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub slug: String,
    pub platform_type: String,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Returns all active platforms, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_platforms(pool: &PgPool) -> Result<Vec<PlatformRow>, DbError> {
    let rows = sqlx::query_as::<_, PlatformRow>(
        "SELECT id, public_id, name, slug, platform_type, website, logo_url, \
                is_active, created_at, updated_at \
         FROM ad_platforms \
         WHERE is_active = true \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Inserts or updates a platform keyed by slug and returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_platform(
    pool: &PgPool,
    name: &str,
    slug: &str,
    platform_type: &str,
    website: Option<&str>,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO ad_platforms (name, slug, platform_type, website, is_active) \
         VALUES ($1, $2, $3, $4, true) \
         ON CONFLICT (slug) DO UPDATE SET \
             name = EXCLUDED.name, \
             platform_type = EXCLUDED.platform_type, \
             website = EXCLUDED.website, \
             updated_at = NOW() \
         RETURNING id",
    )
    .bind(name)
    .bind(slug)
    .bind(platform_type)
    .bind(website)
    .fetch_one(pool)
    .await?;
    Ok(id)
}
