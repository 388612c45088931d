//! Process-wide application context shared by every handler.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::auth::{AuthConfig, TokenVerifier};
use crate::config::AppConfig;
use crate::db::{Db, SurrealRepository, create_connection, ensure_schema};
use crate::search::{SearchClient, SearchConfig};
use crate::services::UserService;

/// Owns the repository (and through it the database handle), the
/// signing-key cache inside the verifier, the services and the outbound
/// search client.
pub struct AppContext {
    repo: Arc<SurrealRepository>,
    verifier: TokenVerifier<SurrealRepository>,
    users: UserService<SurrealRepository>,
    search: SearchClient,
}

pub type AppState = Arc<AppContext>;

impl AppContext {
    /// Connect to the database, make sure the schema exists and build
    /// every component.
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("Connecting to database at {}", config.database.url);
        let db = create_connection(config.database).await?;
        ensure_schema(&db).await?;

        Self::from_db(db, config.auth, config.search)
    }

    /// Build the context around an already prepared database.
    pub fn from_db(db: Db, auth: AuthConfig, search: SearchConfig) -> Result<Self> {
        let repo = Arc::new(SurrealRepository::new(db));
        let verifier = TokenVerifier::new(auth, Arc::clone(&repo))
            .context("Failed to initialise token verifier")?;
        let users = UserService::new(Arc::clone(&repo));
        let search = SearchClient::new(search)?;

        Ok(Self {
            repo,
            verifier,
            users,
            search,
        })
    }

    pub fn repository(&self) -> &Arc<SurrealRepository> {
        &self.repo
    }

    pub fn verifier(&self) -> &TokenVerifier<SurrealRepository> {
        &self.verifier
    }

    pub fn users(&self) -> &UserService<SurrealRepository> {
        &self.users
    }

    pub fn search(&self) -> &SearchClient {
        &self.search
    }
}
