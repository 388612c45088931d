//! Axum extractors for authenticated and optionally authenticated routes.

use axum::extract::FromRequestParts;
use http::request::Parts;

use crate::api::ApiError;
use crate::auth::verifier::AuthenticatedUser;
use crate::state::AppState;

/// Rejects the request with 401 unless a valid session token is present.
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = state.verifier().verify(&parts.headers).await?;
        Ok(Self(user))
    }
}

/// The caller if their token verifies, `None` otherwise. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthenticatedUser>);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(state.verifier().verify_optional(&parts.headers).await))
    }
}
