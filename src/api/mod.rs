// REST API for media search, bookmarks and search history

mod response;
mod search;
mod users;

use axum::{
    Router,
    response::Json,
    routing::{delete, get},
};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub use response::{ApiError, ApiResponse};

pub const SERVICE_NAME: &str = "Open License Media Search API";
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn create_router(state: AppState) -> Router {
    let users = Router::new()
        .route("/profile", get(users::get_profile))
        .route(
            "/bookmarks",
            get(users::get_bookmarks).post(users::create_bookmark),
        )
        .route("/bookmarks/{media_id}", delete(users::delete_bookmark));

    let api = Router::new()
        .route("/health", get(health_check))
        .route("/search", get(search::search_media))
        .route(
            "/media/{media_type}/{media_id}",
            get(search::get_media_details),
        )
        .route("/popular/{media_type}", get(search::get_popular_media))
        .route(
            "/history",
            get(search::get_search_history).delete(search::clear_search_history),
        )
        .route(
            "/history/{history_id}",
            delete(search::delete_search_history_entry),
        )
        .nest("/users", users);

    Router::new()
        .route("/", get(root))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(serde_json::json!({
        "name": SERVICE_NAME,
        "version": API_VERSION,
        "status": "online"
    }))
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "api_version": API_VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
