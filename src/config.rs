use serde::{Deserialize, Serialize};

use crate::auth::AuthConfig;
use crate::db::DatabaseConfig;
use crate::search::SearchConfig;

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";

/// Everything needed to start the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub bind: String,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub search: SearchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            search: SearchConfig::default(),
        }
    }
}
