use crate::{AppState, handlers};
use axum::{Router, routing::delete};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to identities with the Admin role.
/// The router sits behind the authentication middleware; the Admin role check is
/// performed inside each handler after the request passes that layer.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // DELETE /admin/sessions/{id}
        // Force-revokes an arbitrary identity's session (clears its refresh
        // token). Already-issued access tokens run out on their own.
        .route("/sessions/{id}", delete(handlers::revoke_target_session))
        // DELETE /admin/identities/{id}
        // Removes an identity entirely. Its reviews survive with the reviewer
        // reference nulled, which freezes them against further mutation.
        .route("/identities/{id}", delete(handlers::delete_identity))
}
