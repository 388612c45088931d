//! Session token verification.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::jwks::{DEFAULT_CACHE_TTL_SECONDS, JwksCache, JwksCacheError};
use crate::auth::provisioner::UserProvisioner;
use crate::auth::token::{Claims, extract_token};
use crate::db::Repository;
use crate::types::UserId;

/// Header carrying the identity provider's session token.
pub const DEFAULT_SESSION_HEADER: &str = "X-Session-Token";

/// Cookie the identity provider's frontend SDK stores the session token in.
pub const DEFAULT_SESSION_COOKIE: &str = "__session";

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Expected `iss` claim; unchecked when unset
    pub jwt_issuer: Option<String>,
    /// JWKS endpoint URL for key fetching
    pub jwks_url: Option<String>,
    /// JWKS cache TTL in seconds (default: 3600)
    #[serde(default = "default_jwks_cache_seconds")]
    pub jwks_cache_seconds: u64,
    /// Whether to serve expired keys when a refresh fails
    #[serde(default)]
    pub allow_stale_jwks: bool,
    pub session_header: String,
    pub session_cookie: String,
}

fn default_jwks_cache_seconds() -> u64 {
    DEFAULT_CACHE_TTL_SECONDS
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_issuer: None,
            jwks_url: None,
            jwks_cache_seconds: DEFAULT_CACHE_TTL_SECONDS,
            allow_stale_jwks: false,
            session_header: DEFAULT_SESSION_HEADER.to_string(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
        }
    }
}

impl AuthConfig {
    /// Create a config for RS256 verification against a JWKS endpoint.
    pub fn with_jwks(jwks_url: String, issuer: Option<String>) -> Self {
        Self {
            jwt_issuer: issuer,
            jwks_url: Some(jwks_url),
            ..Default::default()
        }
    }
}

/// Authentication errors.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// Missing, malformed, expired or otherwise unacceptable credentials
    Unauthenticated(&'static str),
    /// The key set has no key for the token's `kid`
    KeyLookup(String),
    /// The key set could not be obtained
    KeyServiceUnavailable(String),
    /// The token was valid but the local user could not be created
    Provisioning(String),
}

impl AuthError {
    /// True for failures caused by the caller's credentials.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Unauthenticated(_) | Self::KeyLookup(_))
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated(reason) => write!(f, "Authentication failed: {}", reason),
            Self::KeyLookup(kid) => write!(f, "Unknown signing key: {}", kid),
            Self::KeyServiceUnavailable(msg) => write!(f, "Key service unavailable: {}", msg),
            Self::Provisioning(msg) => write!(f, "User provisioning failed: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<JwksCacheError> for AuthError {
    fn from(err: JwksCacheError) -> Self {
        match err {
            JwksCacheError::KeyNotFound(kid) => Self::KeyLookup(kid),
            other => Self::KeyServiceUnavailable(other.to_string()),
        }
    }
}

/// A caller whose token verified successfully.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub claims: Claims,
}

/// Verifies session tokens and provisions first-time users.
pub struct TokenVerifier<R> {
    config: AuthConfig,
    jwks_cache: Option<Arc<JwksCache>>,
    provisioner: UserProvisioner<R>,
}

impl<R: Repository> TokenVerifier<R> {
    /// Create a verifier. Without a JWKS URL every presented token is
    /// rejected as a key service failure.
    pub fn new(config: AuthConfig, repo: Arc<R>) -> Result<Self, JwksCacheError> {
        let jwks_cache = match &config.jwks_url {
            Some(url) => Some(Arc::new(JwksCache::new(
                url.clone(),
                Duration::from_secs(config.jwks_cache_seconds),
                config.allow_stale_jwks,
            )?)),
            None => None,
        };

        Ok(Self {
            config,
            jwks_cache,
            provisioner: UserProvisioner::new(repo),
        })
    }

    /// Authenticate a request from its headers.
    pub async fn verify(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
        let token = extract_token(headers, &self.config)
            .ok_or(AuthError::Unauthenticated("no credentials"))?;

        self.verify_token(&token).await
    }

    /// Like [`verify`](Self::verify), but any failure yields `None`.
    pub async fn verify_optional(&self, headers: &HeaderMap) -> Option<AuthenticatedUser> {
        match self.verify(headers).await {
            Ok(user) => Some(user),
            Err(AuthError::Unauthenticated("no credentials")) => None,
            Err(e) => {
                debug!("Optional authentication failed: {}", e);
                None
            }
        }
    }

    /// Verify a raw token with RS256 signature checking.
    pub async fn verify_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let header = decode_header(token).map_err(|e| {
            debug!("Invalid JWT header: {}", e);
            AuthError::Unauthenticated("invalid token")
        })?;

        let kid = header
            .kid
            .filter(|kid| !kid.is_empty())
            .ok_or(AuthError::Unauthenticated("no key id"))?;

        let jwks_cache = self.jwks_cache.as_ref().ok_or_else(|| {
            AuthError::KeyServiceUnavailable("JWKS URL not configured".to_string())
        })?;

        let decoding_key = jwks_cache.get_signing_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        if let Some(issuer) = &self.config.jwt_issuer {
            validation.set_issuer(&[issuer]);
        }

        let claims = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| {
                debug!("JWT verification failed: {}", e);
                AuthError::Unauthenticated("invalid token")
            })?
            .claims;

        let user_id = claims
            .subject()
            .map(UserId::new)
            .ok_or(AuthError::Unauthenticated("invalid subject"))?;

        debug!("JWT verified successfully for subject: {}", user_id);

        self.provisioner
            .ensure_user(&user_id, claims.email.as_deref(), claims.username.as_deref())
            .await
            .map_err(|e| {
                warn!("Could not provision user {}: {}", user_id, e);
                AuthError::Provisioning(e.to_string())
            })?;

        Ok(AuthenticatedUser { user_id, claims })
    }
}
