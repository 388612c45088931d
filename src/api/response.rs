//! Response envelope and the HTTP-facing error type.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use crate::search::SearchError;
use crate::services::ServiceError;

/// `{success, message, data}` wrapper used by every JSON endpoint that is
/// not a straight pass-through of the media API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: None,
        })
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// 401
    #[error("{0}")]
    Unauthenticated(String),

    /// 400
    #[error("{0}")]
    Validation(String),

    /// 404
    #[error("{0}")]
    NotFound(String),

    /// 400
    #[error("{0}")]
    DuplicateBookmark(String),

    /// 500, message returned to the caller
    #[error("{0}")]
    Upstream(String),

    /// 500, message only logged
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) | Self::DuplicateBookmark(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            Self::Internal(msg) => {
                error!(error = %msg, "internal server error");
                "Internal server error".to_string()
            }
            Self::Upstream(msg) => {
                error!(error = %msg, "media API request failed");
                msg.clone()
            }
            other => other.to_string(),
        };

        let body = ApiResponse::<()> {
            success: false,
            message,
            data: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_client_error() {
            Self::Unauthenticated(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => Self::NotFound(msg),
            ServiceError::Validation(msg) => Self::Validation(msg),
            dup @ ServiceError::DuplicateBookmark(_) => Self::DuplicateBookmark(dup.to_string()),
            ServiceError::Storage(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Validation(msg) => Self::Validation(msg),
            SearchError::Upstream(msg) => Self::Upstream(msg),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::RepositoryError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(AuthError::Unauthenticated("no credentials")).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::KeyLookup("k1".to_string())).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::KeyServiceUnavailable("down".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(ServiceError::DuplicateBookmark("m1".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ServiceError::NotFound("gone".to_string())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ServiceError::Storage(RepositoryError::Backend("x".to_string())))
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(SearchError::Validation("bad".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_duplicate_message() {
        let err = ApiError::from(ServiceError::DuplicateBookmark("m1".to_string()));
        assert_eq!(err.to_string(), "Media item m1 is already bookmarked");
    }

    #[test]
    fn test_envelope_serialization() {
        let Json(body) = ApiResponse::ok("done", vec![1, 2]);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "done");
        assert_eq!(value["data"], serde_json::json!([1, 2]));

        let Json(body) = ApiResponse::message("deleted");
        let value = serde_json::to_value(&body).unwrap();
        assert!(value["data"].is_null());
    }
}
