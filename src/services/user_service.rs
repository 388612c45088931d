//! Business rules for profiles, bookmarks and search history.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::db::{BookmarkCreate, Repository, SearchHistoryCreate};
use crate::services::ServiceError;
use crate::services::models::{Bookmark, NewBookmark, SearchHistoryEntry, UserProfile};
use crate::types::{HistoryId, MediaId, UserId};

/// History entries returned when the caller does not ask for a limit.
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

/// Upper bound on history entries returned by one call.
pub const MAX_HISTORY_LIMIT: u32 = 100;

pub type ServiceResult<T> = Result<T, ServiceError>;

pub struct UserService<R> {
    repo: Arc<R>,
}

impl<R: Repository> UserService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn get_user_profile(&self, user_id: &UserId) -> ServiceResult<UserProfile> {
        self.repo
            .get_user(user_id)
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("User with ID {} not found", user_id))
            })
    }

    /// Bookmark a media item. Each user can bookmark a given item once.
    pub async fn create_bookmark(
        &self,
        user_id: &UserId,
        bookmark: NewBookmark,
    ) -> ServiceResult<Bookmark> {
        bookmark.validate()?;

        let media_id = MediaId::new(bookmark.media_id.trim());
        if self
            .repo
            .get_bookmark_by_user_and_media(user_id, &media_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::DuplicateBookmark(media_id.into_inner()));
        }

        let create = BookmarkCreate {
            user_id: user_id.to_string(),
            media_id: media_id.to_string(),
            media_url: bookmark.media_url,
            media_type: bookmark.media_type,
            media_title: bookmark.media_title,
            media_creator: bookmark.media_creator,
            media_license: bookmark.media_license,
        };

        // The unique index catches a concurrent insert that passed the check above
        match self.repo.create_bookmark(&create).await {
            Ok(record) => {
                debug!("User {} bookmarked {}", user_id, media_id);
                Ok(Bookmark::from(record))
            }
            Err(e) if e.is_conflict() => Err(ServiceError::DuplicateBookmark(media_id.into_inner())),
            Err(e) => Err(e.into()),
        }
    }

    /// All of a user's bookmarks, newest first.
    pub async fn get_bookmarks(&self, user_id: &UserId) -> ServiceResult<Vec<Bookmark>> {
        let records = self.repo.list_bookmarks(user_id).await?;
        Ok(records.into_iter().map(Bookmark::from).collect())
    }

    /// Remove a bookmark. The media id is trimmed the same way as on creation.
    pub async fn delete_bookmark(&self, user_id: &UserId, media_id: &MediaId) -> ServiceResult<()> {
        let media_id = MediaId::new(media_id.as_str().trim());
        if self
            .repo
            .delete_bookmark_by_user_and_media(user_id, &media_id)
            .await?
        {
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!(
                "Bookmark for media item {} not found",
                media_id
            )))
        }
    }

    /// Record a search. `result_count` is taken from the `results` array of
    /// the cached payload when one is given.
    pub async fn save_search_history(
        &self,
        user_id: &UserId,
        query: &str,
        search_params: Option<Value>,
        search_results: Option<Value>,
    ) -> ServiceResult<SearchHistoryEntry> {
        let result_count = search_results
            .as_ref()
            .and_then(|results| results.get("results"))
            .and_then(Value::as_array)
            .map(|results| results.len() as u32);

        let create = SearchHistoryCreate {
            user_id: user_id.to_string(),
            search_query: query.to_string(),
            search_params,
            search_results,
            result_count,
        };

        let record = self.repo.create_search_history(&create).await?;
        Ok(SearchHistoryEntry::from(record))
    }

    /// Newest-first history, bounded to `1..=MAX_HISTORY_LIMIT` entries.
    pub async fn get_search_history(
        &self,
        user_id: &UserId,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<SearchHistoryEntry>> {
        let limit = clamp_history_limit(limit);
        let records = self.repo.list_search_history(user_id, limit).await?;
        Ok(records.into_iter().map(SearchHistoryEntry::from).collect())
    }

    /// Delete one history entry. Entries owned by someone else are reported
    /// as missing.
    pub async fn delete_search_history(
        &self,
        user_id: &UserId,
        history_id: &HistoryId,
    ) -> ServiceResult<()> {
        let not_found =
            || ServiceError::NotFound(format!("Search history entry {} not found", history_id));

        let entry = self
            .repo
            .get_search_history(history_id)
            .await?
            .ok_or_else(not_found)?;

        if entry.user_id != user_id.as_str() {
            debug!(
                "User {} tried to delete history {} owned by someone else",
                user_id, history_id
            );
            return Err(not_found());
        }

        if self.repo.delete_search_history(history_id).await? {
            Ok(())
        } else {
            Err(not_found())
        }
    }

    /// Remove all of a user's history and return how many entries went.
    pub async fn clear_search_history(&self, user_id: &UserId) -> ServiceResult<u64> {
        let removed = self.repo.clear_search_history(user_id).await?;
        info!("Cleared {} history entries for {}", removed, user_id);
        Ok(removed)
    }
}

fn clamp_history_limit(limit: Option<u32>) -> u32 {
    limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}
