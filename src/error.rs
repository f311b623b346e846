use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ApiError
///
/// The semantic failure kinds produced by the core services. Every kind is a
/// business-rule outcome raised synchronously at first detection; none is a
/// transient fault and none is retried. The transport mapping lives in the
/// `IntoResponse` impl below so core code never touches status codes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    /// A genre, series, review or identity was absent at some level of a lookup.
    #[error("{0}")]
    ResourceNotFound(String),

    /// Role or ownership mismatch for the attempted operation.
    #[error("{0}")]
    Unauthorized(String),

    /// The resource's recorded owner is gone; the entity is frozen against mutation.
    #[error("{0}")]
    UnupdatableResource(String),

    /// The operation requires a resolvable session identity and none is present.
    #[error("{0}")]
    Unauthenticated(String),

    /// Malformed or tampered token. Distinct from simple expiry.
    #[error("invalid token")]
    InvalidToken,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::FORBIDDEN,
            ApiError::UnupdatableResource(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
