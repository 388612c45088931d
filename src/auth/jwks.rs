//! Identity provider signing-key cache.
//!
//! Holds one key set fetched from the provider's JWKS endpoint together
//! with the time it was fetched. Expired sets are refreshed lazily on the
//! next lookup, and concurrent refreshes collapse into a single request.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Default cache TTL in seconds (1 hour).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

/// Maximum stale cache age in seconds (24 hours).
pub const MAX_STALE_CACHE_SECONDS: u64 = 86400;

/// Minimum age of a fresh key set before an unknown `kid` may trigger an
/// early refetch.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Timeout for the key-set request.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A single JSON Web Key from a JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type (e.g., "RSA")
    pub kty: String,
    /// Key ID, matched against the JWT header `kid`
    pub kid: Option<String>,
    /// Algorithm (e.g., "RS256")
    pub alg: Option<String>,
    /// Key use (e.g., "sig" for signature)
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    /// RSA modulus (base64url encoded)
    pub n: Option<String>,
    /// RSA exponent (base64url encoded)
    pub e: Option<String>,
}

/// A JWKS document containing multiple keys.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<Jwk>,
}

/// The currently cached key set.
struct CachedKeySet {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

/// Process-wide signing-key cache with single-flight refresh.
pub struct JwksCache {
    /// The JWKS endpoint URL.
    jwks_url: String,
    /// How long a fetched key set stays fresh.
    cache_ttl: Duration,
    /// Whether to serve an expired key set when a refresh fails.
    allow_stale: bool,
    key_set: RwLock<Option<CachedKeySet>>,
    /// Held for the duration of a refresh.
    refresh_lock: Mutex<()>,
    client: reqwest::Client,
}

impl JwksCache {
    /// Create a new, empty cache.
    pub fn new(
        jwks_url: impl Into<String>,
        cache_ttl: Duration,
        allow_stale: bool,
    ) -> Result<Self, JwksCacheError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| JwksCacheError::FetchError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            cache_ttl,
            allow_stale,
            key_set: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            client,
        })
    }

    /// Resolve the verification key for `kid`.
    ///
    /// A fresh cache is answered without I/O. An unknown `kid` refetches the
    /// set once it is at least a minute old, so rotated keys are picked up
    /// before the TTL runs out. A failed refetch leaves the cache untouched.
    pub async fn get_signing_key(&self, kid: &str) -> Result<DecodingKey, JwksCacheError> {
        if let Some(lookup) = self.cached_key(kid).await {
            return lookup;
        }

        let _refresh = self.refresh_lock.lock().await;

        // Someone else may have refreshed while we waited for the lock
        if let Some(lookup) = self.cached_key(kid).await {
            return lookup;
        }

        match self.fetch_keys().await {
            Ok(()) => self
                .lookup(kid, Duration::from_secs(MAX_STALE_CACHE_SECONDS))
                .await
                .unwrap_or_else(|| Err(JwksCacheError::KeyNotFound(kid.to_string()))),
            Err(e) => {
                if let Some(Err(missing)) = self.lookup(kid, self.cache_ttl).await {
                    warn!("JWKS refetch for unknown kid failed: {}", e);
                    return Err(missing);
                }

                if self.allow_stale
                    && let Some(Ok(key)) = self
                        .lookup(kid, Duration::from_secs(MAX_STALE_CACHE_SECONDS))
                        .await
                {
                    warn!("JWKS fetch failed, using stale cache: {}", e);
                    return Ok(key);
                }

                Err(e)
            }
        }
    }

    /// Answer from the fresh cache, or `None` when a refetch is due.
    async fn cached_key(&self, kid: &str) -> Option<Result<DecodingKey, JwksCacheError>> {
        match self.lookup(kid, self.cache_ttl).await? {
            Err(_) if self.refetch_allowed().await => {
                debug!("Key {} not in cached set, refetching", kid);
                None
            }
            lookup => Some(lookup),
        }
    }

    async fn refetch_allowed(&self) -> bool {
        self.key_set
            .read()
            .await
            .as_ref()
            .is_some_and(|cached| cached.fetched_at.elapsed() >= MIN_REFRESH_INTERVAL)
    }

    /// Look up `kid` in the cached set if it is younger than `max_age`.
    ///
    /// `None` means there is no usable set; `Some(Err(_))` means the set is
    /// usable but has no such key.
    async fn lookup(
        &self,
        kid: &str,
        max_age: Duration,
    ) -> Option<Result<DecodingKey, JwksCacheError>> {
        let key_set = self.key_set.read().await;
        let cached = key_set.as_ref()?;

        if cached.fetched_at.elapsed() >= max_age {
            return None;
        }

        Some(
            cached
                .keys
                .get(kid)
                .cloned()
                .ok_or_else(|| JwksCacheError::KeyNotFound(kid.to_string())),
        )
    }

    /// Fetch keys from the JWKS endpoint and replace the cached set.
    async fn fetch_keys(&self) -> Result<(), JwksCacheError> {
        debug!("Fetching JWKS from {}", self.jwks_url);

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| JwksCacheError::FetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksCacheError::FetchError(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let jwks: JwksDocument = response
            .json()
            .await
            .map_err(|e| JwksCacheError::ParseError(e.to_string()))?;

        let mut keys = HashMap::new();

        for jwk in jwks.keys {
            if jwk.kty != "RSA" {
                debug!("Skipping non-RSA key: {:?}", jwk.kty);
                continue;
            }

            if jwk.key_use.as_deref() == Some("enc") {
                debug!("Skipping encryption key");
                continue;
            }

            let Some(kid) = jwk.kid.clone() else {
                debug!("Skipping key without kid");
                continue;
            };

            match Self::jwk_to_decoding_key(&jwk) {
                Ok(decoding_key) => {
                    keys.insert(kid, decoding_key);
                }
                Err(e) => {
                    warn!("Failed to parse JWK {}: {}", kid, e);
                }
            }
        }

        if keys.is_empty() {
            return Err(JwksCacheError::NoValidKeys);
        }

        debug!("Caching {} signing keys", keys.len());
        *self.key_set.write().await = Some(CachedKeySet {
            keys,
            fetched_at: Instant::now(),
        });

        Ok(())
    }

    /// Convert an RSA JWK to a jsonwebtoken DecodingKey.
    fn jwk_to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, JwksCacheError> {
        let n = jwk
            .n
            .as_ref()
            .ok_or_else(|| JwksCacheError::ParseError("Missing 'n' in RSA key".to_string()))?;
        let e = jwk
            .e
            .as_ref()
            .ok_or_else(|| JwksCacheError::ParseError("Missing 'e' in RSA key".to_string()))?;

        DecodingKey::from_rsa_components(n, e)
            .map_err(|e| JwksCacheError::ParseError(format!("Invalid RSA components: {}", e)))
    }

    /// Number of keys currently cached, fresh or not.
    pub async fn key_count(&self) -> usize {
        self.key_set
            .read()
            .await
            .as_ref()
            .map_or(0, |cached| cached.keys.len())
    }
}

/// Errors that can occur when working with the JWKS cache.
#[derive(Debug, Clone)]
pub enum JwksCacheError {
    /// Failed to fetch JWKS from endpoint.
    FetchError(String),
    /// Failed to parse JWKS response.
    ParseError(String),
    /// No valid keys found in JWKS.
    NoValidKeys,
    /// The key set has no key with this kid.
    KeyNotFound(String),
}

impl JwksCacheError {
    /// True when the key set was available but had no matching key, as
    /// opposed to the key service itself being unreachable or broken.
    pub fn is_key_lookup(&self) -> bool {
        matches!(self, Self::KeyNotFound(_))
    }
}

impl std::fmt::Display for JwksCacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FetchError(msg) => write!(f, "Failed to fetch JWKS: {}", msg),
            Self::ParseError(msg) => write!(f, "Failed to parse JWKS: {}", msg),
            Self::NoValidKeys => write!(f, "No valid keys found in JWKS"),
            Self::KeyNotFound(kid) => write!(f, "Key not found: {}", kid),
        }
    }
}

impl std::error::Error for JwksCacheError {}
