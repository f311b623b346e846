use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any identity that has passed the
/// authentication layer. Role gates (Admin for genres, Poster+ for series) and the
/// review ownership rule are enforced inside the handlers; the chain resolver
/// validates every nested genre/series/review path before anything is touched.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /auth/revoke
        // Logs the caller out by clearing their stored refresh token.
        .route("/auth/revoke", post(handlers::revoke_session))
        // PATCH /me
        // Lets the caller change their own email address.
        .route("/me", axum::routing::patch(handlers::update_my_email))
        // --- Taxonomy (genre mutation is Admin-only) ---
        .route(
            "/genres",
            get(handlers::get_genres).post(handlers::create_genre),
        )
        // The parameter name must match the nested routes below; the router
        // rejects conflicting parameter names at the same position.
        .route(
            "/genres/{genre_id}",
            get(handlers::get_genre)
                .put(handlers::update_genre)
                .delete(handlers::delete_genre),
        )
        // --- Series (mutation requires Poster or Admin; no ownership) ---
        // Flat listing plus creation; creation validates the poster reference.
        .route(
            "/series",
            get(handlers::get_all_series).post(handlers::create_series),
        )
        // Nested addressing: the series must belong to the genre in the path.
        .route(
            "/genres/{genre_id}/series/{series_id}",
            get(handlers::get_series)
                .patch(handlers::update_series)
                .delete(handlers::delete_series),
        )
        // --- Reviews (any role may write; mutation is strictly owner-only) ---
        .route(
            "/genres/{genre_id}/series/{series_id}/reviews",
            get(handlers::get_reviews).post(handlers::create_review),
        )
        .route(
            "/genres/{genre_id}/series/{series_id}/reviews/{review_id}",
            get(handlers::get_review)
                .put(handlers::update_review)
                .delete(handlers::delete_review),
        )
}
