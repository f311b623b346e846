use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    models::Role,
    token::TokenIssuer,
};

/// CallerContext
///
/// The resolved identity of an authenticated request: the subject id and role
/// recovered from the access token's claims. Every SessionManager and resolver
/// operation that needs to know "who is asking" receives this value explicitly;
/// there is no ambient per-request user state anywhere in the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerContext {
    pub id: Uuid,
    pub role: Role,
}

/// CallerContext Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making CallerContext usable as a
/// function argument in any authenticated handler. Authentication (token
/// validation) stays in this extractor; business logic stays in the handlers.
///
/// The process:
/// 1. Local Bypass: development-time access via `x-caller-id`/`x-caller-role`
///    headers, active only under `Env::Local`.
/// 2. Token Extraction: standard Bearer scheme on the Authorization header.
/// 3. Token Validation: signature, issuer, audience and expiry via TokenIssuer.
///
/// Rejection: `Unauthenticated` (missing/expired credentials) or `InvalidToken`
/// (malformed/tampered token), mapped to 401 at the boundary.
impl<S> FromRequestParts<S> for CallerContext
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        // Local Development Bypass Check. Guarded by the Env check so the headers
        // are inert in production.
        if config.env == Env::Local {
            if let Some(caller) = bypass_from_headers(parts) {
                return Ok(caller);
            }
        }

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthenticated("missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthenticated("malformed authorization header".to_string()))?;

        let claims = TokenIssuer::new(config.jwt.clone()).validate_access_token(token)?;

        Ok(CallerContext {
            id: claims.sub,
            role: claims.role,
        })
    }
}

/// bypass_from_headers
///
/// Parses the development bypass headers. Both must be present and well-formed;
/// anything else falls through to the standard Bearer flow.
fn bypass_from_headers(parts: &Parts) -> Option<CallerContext> {
    let id = parts
        .headers
        .get("x-caller-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())?;
    let role = parts
        .headers
        .get("x-caller-role")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Role>().ok())?;

    Some(CallerContext { id, role })
}
