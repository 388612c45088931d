//! Service layer: business rules on top of the repository.

pub mod models;
mod user_service;

use thiserror::Error;

use crate::db::RepositoryError;

pub use models::{Bookmark, NewBookmark, SearchHistoryEntry, UserProfile};
pub use user_service::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT, ServiceResult, UserService};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("Media item {0} is already bookmarked")]
    DuplicateBookmark(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}
