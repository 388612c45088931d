use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use tracing::debug;

pub type Db = Surreal<Any>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("SURREALDB_URL").unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("SURREALDB_NAMESPACE").unwrap_or_else(|_| "openmedia".to_string()),
            database: env::var("SURREALDB_DATABASE")
                .unwrap_or_else(|_| "openlicensemediadb".to_string()),
            username: env::var("SURREALDB_USERNAME").ok(),
            password: env::var("SURREALDB_PASSWORD").ok(),
        }
    }
}

impl DatabaseConfig {
    /// In-memory database, used by tests and local runs.
    pub fn memory() -> Self {
        Self {
            url: "memory".to_string(),
            ..Default::default()
        }
    }
}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db> {
    let db = surrealdb::engine::any::connect(config.url).await?;

    // Sign in if credentials are provided
    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await?;
    }

    db.use_ns(config.namespace).use_db(config.database).await?;

    Ok(db)
}

/// Define tables, indexes and the user cascade event.
///
/// Every statement uses `IF NOT EXISTS`, so this is safe to run on each start.
pub async fn ensure_schema(db: &Db) -> Result<()> {
    let schema_queries = [
        // Users are keyed by the identity provider's subject id
        "DEFINE TABLE IF NOT EXISTS user SCHEMAFULL;
         DEFINE FIELD IF NOT EXISTS username ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS email ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS is_admin ON TABLE user TYPE bool DEFAULT false;
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE user TYPE datetime DEFAULT time::now();",

        "DEFINE TABLE IF NOT EXISTS bookmark SCHEMAFULL;
         DEFINE FIELD IF NOT EXISTS user_id ON TABLE bookmark TYPE string;
         DEFINE FIELD IF NOT EXISTS media_id ON TABLE bookmark TYPE string;
         DEFINE FIELD IF NOT EXISTS media_url ON TABLE bookmark TYPE string;
         DEFINE FIELD IF NOT EXISTS media_type ON TABLE bookmark TYPE string;
         DEFINE FIELD IF NOT EXISTS media_title ON TABLE bookmark TYPE option<string>;
         DEFINE FIELD IF NOT EXISTS media_creator ON TABLE bookmark TYPE option<string>;
         DEFINE FIELD IF NOT EXISTS media_license ON TABLE bookmark TYPE option<string>;
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE bookmark TYPE datetime DEFAULT time::now();",

        // Parameter sets and cached results are free-form objects
        "DEFINE TABLE IF NOT EXISTS search_history SCHEMALESS;
         DEFINE FIELD IF NOT EXISTS user_id ON TABLE search_history TYPE string;
         DEFINE FIELD IF NOT EXISTS search_query ON TABLE search_history TYPE string;
         DEFINE FIELD IF NOT EXISTS result_count ON TABLE search_history TYPE option<int>;
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE search_history TYPE datetime DEFAULT time::now();",

        "DEFINE INDEX IF NOT EXISTS user_email ON TABLE user COLUMNS email UNIQUE;
         DEFINE INDEX IF NOT EXISTS bookmark_user_media ON TABLE bookmark COLUMNS user_id, media_id UNIQUE;
         DEFINE INDEX IF NOT EXISTS search_history_user ON TABLE search_history COLUMNS user_id, created_at;",

        "DEFINE EVENT IF NOT EXISTS user_cascade ON TABLE user WHEN $event = \"DELETE\" THEN {
             DELETE bookmark WHERE user_id = record::id($before.id);
             DELETE search_history WHERE user_id = record::id($before.id);
         };",
    ];

    for query in schema_queries {
        db.query(query).await?.check()?;
    }

    debug!("Database schema ensured");
    Ok(())
}
