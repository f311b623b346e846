use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client.
/// Everything else in the application sits behind the token these endpoints hand
/// out.
///
/// The refresh endpoint is public on purpose: its access token is typically
/// expired, so the standard extractor would reject it. Its security rests on the
/// token signature plus the stored refresh token, both checked by SessionManager.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Simple liveness endpoint used for monitoring and load balancer checks.
        .route("/health", get(handlers::health))
        // POST /auth/sign-up
        // New identity creation. The role secret in the body selects the role.
        .route("/auth/sign-up", post(handlers::sign_up))
        // POST /auth/token
        // Credential exchange: email + password in, access/refresh pair out.
        .route("/auth/token", post(handlers::sign_in))
        // POST /auth/token/refresh
        // Token rotation. Consumes the (possibly expired) access token and the
        // current refresh token; the old refresh token dies with the rotation.
        .route("/auth/token/refresh", post(handlers::refresh_token))
}
