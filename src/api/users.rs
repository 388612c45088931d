//! Profile and bookmark routes for the signed-in user.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::api::response::{ApiError, ApiResponse};
use crate::auth::AuthUser;
use crate::services::{Bookmark, NewBookmark, UserProfile};
use crate::state::AppState;
use crate::types::MediaId;

pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let profile = state.users().get_user_profile(&user.user_id).await?;
    Ok(ApiResponse::ok("User profile retrieved successfully", profile))
}

pub async fn create_bookmark(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Result<Json<NewBookmark>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Bookmark>>), ApiError> {
    let Json(bookmark) = body?;

    let created = state
        .users()
        .create_bookmark(&user.user_id, bookmark)
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Bookmark created successfully", created),
    ))
}

pub async fn get_bookmarks(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<Vec<Bookmark>>>, ApiError> {
    let bookmarks = state.users().get_bookmarks(&user.user_id).await?;
    Ok(ApiResponse::ok("Bookmarks retrieved successfully", bookmarks))
}

pub async fn delete_bookmark(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let Path(media_id) = path?;
    state
        .users()
        .delete_bookmark(&user.user_id, &MediaId::new(media_id))
        .await?;
    Ok(ApiResponse::message("Bookmark deleted successfully"))
}
