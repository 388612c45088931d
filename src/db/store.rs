//! SurrealDB implementation of [`Repository`].

use surrealdb::RecordId;

use crate::db::Db;
use crate::db::repository::{Repository, RepositoryError, RepositoryResult};
use crate::db::schema::{
    BOOKMARK_TABLE, BookmarkCreate, BookmarkRecord, SEARCH_HISTORY_TABLE, SearchHistoryCreate,
    SearchHistoryRecord, USER_TABLE, UserCreate, UserRecord,
};
use crate::types::{HistoryId, MediaId, UserId};

impl From<surrealdb::Error> for RepositoryError {
    fn from(err: surrealdb::Error) -> Self {
        let message = err.to_string();
        // Unique index violations read "...already contains...", duplicate
        // record ids read "...already exists". Two racing inserts on the same
        // index key can also lose at commit time with a write conflict.
        if message.contains("already contains")
            || message.contains("already exists")
            || message.contains("read or write conflict")
        {
            Self::Conflict(message)
        } else {
            Self::Backend(message)
        }
    }
}

/// Repository backed by a shared SurrealDB handle.
#[derive(Clone)]
pub struct SurrealRepository {
    db: Db,
}

impl SurrealRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

fn user_record_id(user_id: &UserId) -> RecordId {
    RecordId::from_table_key(USER_TABLE, user_id.as_str())
}

fn history_record_id(history_id: &HistoryId) -> RecordId {
    RecordId::from_table_key(SEARCH_HISTORY_TABLE, history_id.as_str())
}

impl Repository for SurrealRepository {
    async fn get_user(&self, user_id: &UserId) -> RepositoryResult<Option<UserRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM user WHERE id = $id LIMIT 1")
            .bind(("id", user_record_id(user_id)))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    async fn get_user_by_email(&self, email: &str) -> RepositoryResult<Option<UserRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM user WHERE email = $email LIMIT 1")
            .bind(("email", email.to_string()))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    async fn create_user(&self, create: &UserCreate) -> RepositoryResult<UserRecord> {
        let query = r#"
            CREATE $id CONTENT {
                username: $username,
                email: $email,
                is_admin: $is_admin
            }
        "#;

        let mut res = self
            .db
            .query(query)
            .bind(("id", user_record_id(&create.id)))
            .bind(("username", create.username.clone()))
            .bind(("email", create.email.clone()))
            .bind(("is_admin", create.is_admin))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        users
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::Backend("user insert returned no record".to_string()))
    }

    async fn delete_user(&self, user_id: &UserId) -> RepositoryResult<bool> {
        let mut res = self
            .db
            .query("DELETE user WHERE id = $id RETURN BEFORE")
            .bind(("id", user_record_id(user_id)))
            .await?;

        let deleted: Vec<UserRecord> = res.take(0)?;
        Ok(!deleted.is_empty())
    }

    async fn get_bookmark_by_user_and_media(
        &self,
        user_id: &UserId,
        media_id: &MediaId,
    ) -> RepositoryResult<Option<BookmarkRecord>> {
        let query = r#"
            SELECT * FROM bookmark
            WHERE user_id = $user_id
              AND media_id = $media_id
            LIMIT 1
        "#;

        let mut res = self
            .db
            .query(query)
            .bind(("user_id", user_id.to_string()))
            .bind(("media_id", media_id.to_string()))
            .await?;

        let bookmarks: Vec<BookmarkRecord> = res.take(0)?;
        Ok(bookmarks.into_iter().next())
    }

    async fn list_bookmarks(&self, user_id: &UserId) -> RepositoryResult<Vec<BookmarkRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM bookmark WHERE user_id = $user_id ORDER BY created_at DESC")
            .bind(("user_id", user_id.to_string()))
            .await?;

        Ok(res.take(0)?)
    }

    async fn create_bookmark(&self, create: &BookmarkCreate) -> RepositoryResult<BookmarkRecord> {
        let query = r#"
            CREATE type::table($table) CONTENT {
                user_id: $user_id,
                media_id: $media_id,
                media_url: $media_url,
                media_type: $media_type,
                media_title: $media_title,
                media_creator: $media_creator,
                media_license: $media_license
            }
        "#;

        let mut res = self
            .db
            .query(query)
            .bind(("table", BOOKMARK_TABLE))
            .bind(("user_id", create.user_id.clone()))
            .bind(("media_id", create.media_id.clone()))
            .bind(("media_url", create.media_url.clone()))
            .bind(("media_type", create.media_type.clone()))
            .bind(("media_title", create.media_title.clone()))
            .bind(("media_creator", create.media_creator.clone()))
            .bind(("media_license", create.media_license.clone()))
            .await?;

        let bookmarks: Vec<BookmarkRecord> = res.take(0)?;
        bookmarks.into_iter().next().ok_or_else(|| {
            RepositoryError::Backend("bookmark insert returned no record".to_string())
        })
    }

    async fn delete_bookmark_by_user_and_media(
        &self,
        user_id: &UserId,
        media_id: &MediaId,
    ) -> RepositoryResult<bool> {
        let query = r#"
            DELETE bookmark
            WHERE user_id = $user_id
              AND media_id = $media_id
            RETURN BEFORE
        "#;

        let mut res = self
            .db
            .query(query)
            .bind(("user_id", user_id.to_string()))
            .bind(("media_id", media_id.to_string()))
            .await?;

        let deleted: Vec<BookmarkRecord> = res.take(0)?;
        Ok(!deleted.is_empty())
    }

    async fn get_search_history(
        &self,
        history_id: &HistoryId,
    ) -> RepositoryResult<Option<SearchHistoryRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM search_history WHERE id = $id LIMIT 1")
            .bind(("id", history_record_id(history_id)))
            .await?;

        let entries: Vec<SearchHistoryRecord> = res.take(0)?;
        Ok(entries.into_iter().next())
    }

    async fn list_search_history(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> RepositoryResult<Vec<SearchHistoryRecord>> {
        let query = r#"
            SELECT * FROM search_history
            WHERE user_id = $user_id
            ORDER BY created_at DESC
            LIMIT $limit
        "#;

        let mut res = self
            .db
            .query(query)
            .bind(("user_id", user_id.to_string()))
            .bind(("limit", limit))
            .await?;

        Ok(res.take(0)?)
    }

    async fn create_search_history(
        &self,
        create: &SearchHistoryCreate,
    ) -> RepositoryResult<SearchHistoryRecord> {
        let query = r#"
            CREATE type::table($table) CONTENT {
                user_id: $user_id,
                search_query: $search_query,
                search_params: $search_params,
                search_results: $search_results,
                result_count: $result_count
            }
        "#;

        let mut res = self
            .db
            .query(query)
            .bind(("table", SEARCH_HISTORY_TABLE))
            .bind(("user_id", create.user_id.clone()))
            .bind(("search_query", create.search_query.clone()))
            .bind(("search_params", create.search_params.clone()))
            .bind(("search_results", create.search_results.clone()))
            .bind(("result_count", create.result_count))
            .await?;

        let entries: Vec<SearchHistoryRecord> = res.take(0)?;
        entries.into_iter().next().ok_or_else(|| {
            RepositoryError::Backend("search history insert returned no record".to_string())
        })
    }

    async fn delete_search_history(&self, history_id: &HistoryId) -> RepositoryResult<bool> {
        let mut res = self
            .db
            .query("DELETE search_history WHERE id = $id RETURN BEFORE")
            .bind(("id", history_record_id(history_id)))
            .await?;

        let deleted: Vec<SearchHistoryRecord> = res.take(0)?;
        Ok(!deleted.is_empty())
    }

    async fn clear_search_history(&self, user_id: &UserId) -> RepositoryResult<u64> {
        let mut res = self
            .db
            .query("DELETE search_history WHERE user_id = $user_id RETURN BEFORE")
            .bind(("user_id", user_id.to_string()))
            .await?;

        let deleted: Vec<SearchHistoryRecord> = res.take(0)?;
        Ok(deleted.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseConfig, create_connection, ensure_schema};
    use serde_json::json;

    async fn setup_test_repo() -> SurrealRepository {
        let db = create_connection(DatabaseConfig::memory()).await.unwrap();
        ensure_schema(&db).await.unwrap();
        SurrealRepository::new(db)
    }

    fn user_create(id: &str, email: &str) -> UserCreate {
        UserCreate {
            id: UserId::new(id),
            username: format!("name_{id}"),
            email: email.to_string(),
            is_admin: false,
        }
    }

    fn bookmark_create(user_id: &str, media_id: &str) -> BookmarkCreate {
        BookmarkCreate {
            user_id: user_id.to_string(),
            media_id: media_id.to_string(),
            media_url: format!("https://example.com/{media_id}.jpg"),
            media_type: "images".to_string(),
            media_title: Some("Sunset".to_string()),
            media_creator: None,
            media_license: Some("by".to_string()),
        }
    }

    fn history_create(user_id: &str, query: &str) -> SearchHistoryCreate {
        SearchHistoryCreate {
            user_id: user_id.to_string(),
            search_query: query.to_string(),
            search_params: Some(json!({"media_type": "images", "page": 1})),
            search_results: None,
            result_count: None,
        }
    }

    #[tokio::test]
    async fn test_missing_user_is_none() {
        let repo = setup_test_repo().await;
        let user = repo.get_user(&UserId::new("nobody")).await.unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = setup_test_repo().await;
        let created = repo.create_user(&user_create("u1", "u1@x.com")).await.unwrap();
        assert_eq!(created.user_id(), UserId::new("u1"));
        assert!(!created.is_admin);

        let fetched = repo.get_user(&UserId::new("u1")).await.unwrap().unwrap();
        assert_eq!(fetched.email, "u1@x.com");

        let by_email = repo.get_user_by_email("u1@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_user_id_is_conflict() {
        let repo = setup_test_repo().await;
        repo.create_user(&user_create("u1", "u1@x.com")).await.unwrap();

        let err = repo
            .create_user(&user_create("u1", "other@x.com"))
            .await
            .unwrap_err();
        assert!(err.is_conflict(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let repo = setup_test_repo().await;
        repo.create_user(&user_create("u1", "same@x.com")).await.unwrap();

        let err = repo
            .create_user(&user_create("u2", "same@x.com"))
            .await
            .unwrap_err();
        assert!(err.is_conflict(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_unique_index_rejects_second_bookmark() {
        let repo = setup_test_repo().await;
        repo.create_bookmark(&bookmark_create("u1", "m1")).await.unwrap();

        let err = repo
            .create_bookmark(&bookmark_create("u1", "m1"))
            .await
            .unwrap_err();
        assert!(err.is_conflict(), "unexpected error: {err}");

        let stored = repo.list_bookmarks(&UserId::new("u1")).await.unwrap();
        assert_eq!(stored.len(), 1);

        // Another user may bookmark the same media
        repo.create_bookmark(&bookmark_create("u2", "m1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_bookmark_by_user_and_media() {
        let repo = setup_test_repo().await;
        repo.create_bookmark(&bookmark_create("u1", "m1")).await.unwrap();

        let user = UserId::new("u1");
        let media = MediaId::new("m1");
        assert!(repo.delete_bookmark_by_user_and_media(&user, &media).await.unwrap());
        assert!(!repo.delete_bookmark_by_user_and_media(&user, &media).await.unwrap());
        assert!(
            repo.get_bookmark_by_user_and_media(&user, &media)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_history_round_trip_by_id() {
        let repo = setup_test_repo().await;
        let created = repo
            .create_search_history(&history_create("u1", "cats"))
            .await
            .unwrap();

        let id = created.history_id();
        let fetched = repo.get_search_history(&id).await.unwrap().unwrap();
        assert_eq!(fetched.search_query, "cats");
        assert_eq!(fetched.search_params.unwrap()["media_type"], "images");

        assert!(repo.delete_search_history(&id).await.unwrap());
        assert!(repo.get_search_history(&id).await.unwrap().is_none());
        assert!(!repo.delete_search_history(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_history_only_touches_owner() {
        let repo = setup_test_repo().await;
        for query in ["a", "b", "c"] {
            repo.create_search_history(&history_create("u1", query))
                .await
                .unwrap();
        }
        repo.create_search_history(&history_create("u2", "d"))
            .await
            .unwrap();

        let removed = repo.clear_search_history(&UserId::new("u1")).await.unwrap();
        assert_eq!(removed, 3);

        let left = repo
            .list_search_history(&UserId::new("u2"), 10)
            .await
            .unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(
            repo.clear_search_history(&UserId::new("u1")).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let repo = setup_test_repo().await;
        repo.create_user(&user_create("u1", "u1@x.com")).await.unwrap();
        repo.create_bookmark(&bookmark_create("u1", "m1")).await.unwrap();
        repo.create_search_history(&history_create("u1", "cats"))
            .await
            .unwrap();
        repo.create_bookmark(&bookmark_create("u2", "m1")).await.unwrap();

        assert!(repo.delete_user(&UserId::new("u1")).await.unwrap());

        let u1 = UserId::new("u1");
        assert!(repo.list_bookmarks(&u1).await.unwrap().is_empty());
        assert!(repo.list_search_history(&u1, 10).await.unwrap().is_empty());
        assert_eq!(repo.list_bookmarks(&UserId::new("u2")).await.unwrap().len(), 1);
    }
}
