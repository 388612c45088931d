// Core modules
pub mod api;
pub mod auth;
mod config;
pub mod db;
pub mod search;
pub mod services;
mod state;
pub mod types;

// Re-export key types and functions
pub use api::create_router;
pub use auth::AuthConfig;
pub use config::{AppConfig, DEFAULT_BIND};
pub use db::{DatabaseConfig, create_connection, ensure_schema};
pub use search::SearchConfig;
pub use state::{AppContext, AppState};

use std::sync::Arc;

use anyhow::Result;
use axum::Router;

/// Convenience function to build the fully wired HTTP application.
///
/// Connects to the configured database, prepares the schema and returns the
/// router together with the shared context it serves.
pub async fn create_app(config: AppConfig) -> Result<(Router, AppState)> {
    let context = Arc::new(AppContext::new(config).await?);
    Ok((create_router(Arc::clone(&context)), context))
}
