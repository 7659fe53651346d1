//! Platform directory endpoint.

use axum::{extract::State, Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use adscout_db::PlatformRow;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Serialize)]
pub(super) struct PlatformItem {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub platform_type: String,
    pub website: Option<String>,
    pub logo_url: Option<String>,
}

impl From<PlatformRow> for PlatformItem {
    fn from(row: PlatformRow) -> Self {
        Self {
            id: row.public_id,
            name: row.name,
            slug: row.slug,
            platform_type: row.platform_type,
            website: row.website,
            logo_url: row.logo_url,
        }
    }
}

pub(super) async fn list_platforms(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<PlatformItem>>>, ApiError> {
    let rows = adscout_db::list_active_platforms(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(PlatformItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
