//! Media search, details, popular listing and search history.

use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::api::response::{ApiError, ApiResponse};
use crate::auth::{AuthUser, MaybeAuthUser};
use crate::search::{DEFAULT_POPULAR_LIMIT, SearchRequest};
use crate::services::SearchHistoryEntry;
use crate::state::AppState;
use crate::types::HistoryId;

/// Proxy a search to the media API. Searches by signed-in users are added
/// to their history.
pub async fn search_media(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    query: Result<Query<SearchRequest>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(request) = query?;

    let mut results = state.search().search_media(&request).await?;

    if let Some(user) = &user
        && let Err(e) = state
            .users()
            .save_search_history(
                &user.user_id,
                &request.query,
                Some(request.search_params()),
                None,
            )
            .await
    {
        warn!("Failed to save search history for {}: {}", user.user_id, e);
    }

    if let Some(body) = results.as_object_mut() {
        let auth_status = if user.is_some() {
            "authenticated"
        } else {
            "unauthenticated"
        };
        body.insert("auth_status".to_string(), Value::from(auth_status));
    }

    Ok(Json(results))
}

pub async fn get_media_details(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path((media_type, media_id)) = path?;
    let details = state
        .search()
        .get_media_details(&media_type, &media_id)
        .await?;
    Ok(Json(details))
}

#[derive(Debug, Deserialize)]
pub struct PopularParams {
    pub limit: Option<u32>,
}

pub async fn get_popular_media(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    params: Result<Query<PopularParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(media_type) = path?;
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(DEFAULT_POPULAR_LIMIT);

    let items = state
        .search()
        .get_popular_media(&media_type, limit)
        .await?;
    Ok(Json(json!({ "results": items })))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<u32>,
}

pub async fn get_search_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<SearchHistoryEntry>>>, ApiError> {
    let Query(params) = params?;

    let history = state
        .users()
        .get_search_history(&user.user_id, params.limit)
        .await?;
    Ok(ApiResponse::ok("Search history retrieved successfully", history))
}

pub async fn delete_search_history_entry(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let Path(history_id) = path?;
    state
        .users()
        .delete_search_history(&user.user_id, &HistoryId::new(history_id))
        .await?;
    Ok(ApiResponse::message("Search history entry deleted successfully"))
}

pub async fn clear_search_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let removed = state.users().clear_search_history(&user.user_id).await?;
    Ok(ApiResponse::ok(
        "Search history cleared successfully",
        json!({ "entries_deleted": removed }),
    ))
}
