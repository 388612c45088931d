//! Shapes returned to API callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{BookmarkRecord, SearchHistoryRecord, UserRecord, record_key};
use crate::services::ServiceError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub is_admin: bool,
}

impl From<UserRecord> for UserProfile {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.user_id().into_inner(),
            username: record.username,
            email: record.email,
            created_at: DateTime::<Utc>::from(record.created_at),
            is_admin: record.is_admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub media_id: String,
    pub media_url: String,
    pub media_type: String,
    pub media_title: Option<String>,
    pub media_creator: Option<String>,
    pub media_license: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<BookmarkRecord> for Bookmark {
    fn from(record: BookmarkRecord) -> Self {
        Self {
            id: record_key(&record.id),
            user_id: record.user_id,
            media_id: record.media_id,
            media_url: record.media_url,
            media_type: record.media_type,
            media_title: record.media_title,
            media_creator: record.media_creator,
            media_license: record.media_license,
            created_at: DateTime::<Utc>::from(record.created_at),
        }
    }
}

/// Request body for creating a bookmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBookmark {
    pub media_id: String,
    pub media_url: String,
    pub media_type: String,
    #[serde(default)]
    pub media_title: Option<String>,
    #[serde(default)]
    pub media_creator: Option<String>,
    #[serde(default)]
    pub media_license: Option<String>,
}

impl NewBookmark {
    pub fn validate(&self) -> Result<(), ServiceError> {
        for (field, value) in [
            ("media_id", &self.media_id),
            ("media_url", &self.media_url),
            ("media_type", &self.media_type),
        ] {
            if value.trim().is_empty() {
                return Err(ServiceError::Validation(format!("{} is required", field)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    pub id: String,
    pub user_id: String,
    pub search_query: String,
    pub search_params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_results: Option<Value>,
    pub result_count: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl From<SearchHistoryRecord> for SearchHistoryEntry {
    fn from(record: SearchHistoryRecord) -> Self {
        Self {
            id: record.history_id().into_inner(),
            user_id: record.user_id,
            search_query: record.search_query,
            search_params: record.search_params,
            search_results: record.search_results,
            result_count: record.result_count,
            created_at: DateTime::<Utc>::from(record.created_at),
        }
    }
}
