//! Storage interface for users, bookmarks and search history.
//!
//! Repositories are pure data access. Absence is reported as `None`, `false`
//! or a zero count, never as an error; deciding whether absence matters is
//! the service layer's job.

use std::future::Future;

use thiserror::Error;

use crate::db::schema::{
    BookmarkCreate, BookmarkRecord, SearchHistoryCreate, SearchHistoryRecord, UserCreate,
    UserRecord,
};
use crate::types::{HistoryId, MediaId, UserId};

/// Errors surfaced by a storage adapter.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// An insert collided with a unique index or an existing record id.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other storage failure.
    #[error("storage error: {0}")]
    Backend(String),
}

impl RepositoryError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Data access for every entity the service owns.
pub trait Repository: Send + Sync + 'static {
    // Users

    fn get_user(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = RepositoryResult<Option<UserRecord>>> + Send;

    fn get_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = RepositoryResult<Option<UserRecord>>> + Send;

    fn create_user(
        &self,
        create: &UserCreate,
    ) -> impl Future<Output = RepositoryResult<UserRecord>> + Send;

    /// Remove a user; bookmarks and history go with it.
    fn delete_user(&self, user_id: &UserId)
    -> impl Future<Output = RepositoryResult<bool>> + Send;

    // Bookmarks

    fn get_bookmark_by_user_and_media(
        &self,
        user_id: &UserId,
        media_id: &MediaId,
    ) -> impl Future<Output = RepositoryResult<Option<BookmarkRecord>>> + Send;

    /// All bookmarks owned by a user, newest first.
    fn list_bookmarks(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = RepositoryResult<Vec<BookmarkRecord>>> + Send;

    fn create_bookmark(
        &self,
        create: &BookmarkCreate,
    ) -> impl Future<Output = RepositoryResult<BookmarkRecord>> + Send;

    fn delete_bookmark_by_user_and_media(
        &self,
        user_id: &UserId,
        media_id: &MediaId,
    ) -> impl Future<Output = RepositoryResult<bool>> + Send;

    // Search history

    fn get_search_history(
        &self,
        history_id: &HistoryId,
    ) -> impl Future<Output = RepositoryResult<Option<SearchHistoryRecord>>> + Send;

    /// At most `limit` entries owned by a user, newest first.
    fn list_search_history(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> impl Future<Output = RepositoryResult<Vec<SearchHistoryRecord>>> + Send;

    fn create_search_history(
        &self,
        create: &SearchHistoryCreate,
    ) -> impl Future<Output = RepositoryResult<SearchHistoryRecord>> + Send;

    fn delete_search_history(
        &self,
        history_id: &HistoryId,
    ) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Delete every entry owned by a user and return how many were removed.
    fn clear_search_history(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;
}
