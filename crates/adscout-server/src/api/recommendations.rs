//! Personalised opportunity recommendations.
//!
//! Based on the platforms that dominated the account's recent completed
//! searches: the top 3 platforms across the top-ranked results of the last 5
//! searches, then up to 5 high-quality active opportunities on them. New
//! accounts with no completed searches get an empty list, not an error.

use axum::{extract::State, Extension, Json};

use super::opportunities::OpportunityItem;
use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::{CurrentAccount, RequestId};

pub(super) async fn list_recommendations(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(account): Extension<CurrentAccount>,
) -> Result<Json<ApiResponse<Vec<OpportunityItem>>>, ApiError> {
    let platform_ids = adscout_db::top_platform_ids_for_account(&state.pool, account.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if platform_ids.is_empty() {
        return Ok(Json(ApiResponse {
            data: Vec::new(),
            meta: ResponseMeta::new(req_id.0),
        }));
    }

    let rows = adscout_db::list_recommended_opportunities(&state.pool, &platform_ids)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(OpportunityItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
