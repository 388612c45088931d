//! Authentication against the identity provider.
//!
//! Requests carry a session token issued by the identity provider. The token
//! is verified with RS256 against the provider's published key set, which is
//! cached process-wide:
//!
//! - **Key cache** ([`JwksCache`]): fetches and time-caches signing keys,
//!   collapsing concurrent refreshes into one request.
//! - **Verifier** ([`TokenVerifier`]): finds the token in the request,
//!   checks signature, issuer and expiry, and returns the claims.
//! - **Provisioner** ([`UserProvisioner`]): creates the local user record the
//!   first time a subject is seen.
//!
//! Handlers use the [`AuthUser`] and [`MaybeAuthUser`] extractors.

mod extractor;
pub mod jwks;
mod provisioner;
mod token;
mod verifier;

pub use extractor::{AuthUser, MaybeAuthUser};
pub use jwks::{DEFAULT_CACHE_TTL_SECONDS, JwksCache, JwksCacheError};
pub use provisioner::UserProvisioner;
pub use token::{Claims, extract_token};
pub use verifier::{
    AuthConfig, AuthError, AuthenticatedUser, DEFAULT_SESSION_COOKIE, DEFAULT_SESSION_HEADER,
    TokenVerifier,
};
