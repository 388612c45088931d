use serde::{Deserialize, Serialize};
use serde_json::Value;
use surrealdb::{RecordId, sql::Datetime};

use crate::types::{HistoryId, UserId};

pub const USER_TABLE: &str = "user";
pub const BOOKMARK_TABLE: &str = "bookmark";
pub const SEARCH_HISTORY_TABLE: &str = "search_history";

/// Persisted user record. The record key is the identity provider's subject id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Database identifier (table: `user`, key: subject id)
    pub id: RecordId,
    pub username: String,
    /// Unique across users
    pub email: String,
    pub is_admin: bool,
    pub created_at: Datetime,
}

impl UserRecord {
    /// The subject id this record was created for.
    pub fn user_id(&self) -> UserId {
        UserId::new(record_key(&self.id))
    }
}

/// Payload for creating a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

/// Persisted bookmark. At most one exists per `(user_id, media_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkRecord {
    pub id: RecordId,
    /// Owning user's subject id
    pub user_id: String,
    pub media_id: String,
    pub media_url: String,
    pub media_type: String,
    pub media_title: Option<String>,
    pub media_creator: Option<String>,
    pub media_license: Option<String>,
    pub created_at: Datetime,
}

/// Payload for inserting a bookmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkCreate {
    pub user_id: String,
    pub media_id: String,
    pub media_url: String,
    pub media_type: String,
    pub media_title: Option<String>,
    pub media_creator: Option<String>,
    pub media_license: Option<String>,
}

/// Persisted search history entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHistoryRecord {
    pub id: RecordId,
    /// Owning user's subject id
    pub user_id: String,
    pub search_query: String,
    /// Parameters the search ran with (media type, page, filters)
    pub search_params: Option<Value>,
    /// Optional cached copy of the upstream response
    pub search_results: Option<Value>,
    pub result_count: Option<u32>,
    pub created_at: Datetime,
}

impl SearchHistoryRecord {
    pub fn history_id(&self) -> HistoryId {
        HistoryId::new(record_key(&self.id))
    }
}

/// Payload for inserting a search history entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHistoryCreate {
    pub user_id: String,
    pub search_query: String,
    pub search_params: Option<Value>,
    pub search_results: Option<Value>,
    pub result_count: Option<u32>,
}

/// Key part of a record id, without the table prefix or identifier escaping.
///
/// `bookmark:abc` gives `abc`; `user:⟨user-2a⟩` gives `user-2a`.
pub fn record_key(id: &RecordId) -> String {
    let rendered = id.to_string();
    let key = rendered
        .split_once(':')
        .map(|(_, key)| key)
        .unwrap_or(rendered.as_str());

    key.trim_start_matches(['⟨', '`'])
        .trim_end_matches(['⟩', '`'])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_key_plain() {
        let id = RecordId::from_table_key("bookmark", "abc123");
        assert_eq!(record_key(&id), "abc123");
    }

    #[test]
    fn test_record_key_escaped() {
        let id = RecordId::from_table_key("user", "user-2a:b");
        assert_eq!(record_key(&id), "user-2a:b");
    }

    #[test]
    fn test_user_record_user_id() {
        let record = UserRecord {
            id: RecordId::from_table_key(USER_TABLE, "u1"),
            username: "user_u1".to_string(),
            email: "u1@x.com".to_string(),
            is_admin: false,
            created_at: Datetime::from(chrono::Utc::now()),
        };
        assert_eq!(record.user_id(), UserId::new("u1"));
    }
}
