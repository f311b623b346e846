use crate::{
    AppState,
    auth::CallerContext,
    error::ApiError,
    guard::require_role,
    models::{
        CreateGenreRequest, CreateReviewRequest, CreateSeriesRequest, Genre, RefreshTokenRequest,
        Review, Role, Series, SignInRequest, SignUpRequest, TokenPair, UpdateEmailRequest,
        UpdateGenreRequest, UpdateReviewRequest, UpdateSeriesRequest,
    },
    resolver::{ensure_review_attribution, ensure_review_mutable},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use uuid::Uuid;

// --- Session Handlers ---

/// sign_up
///
/// [Public Route] Registers a new identity. The role is selected by the supplied
/// role secret; an unknown secret produces a basic User account. Returns 400 when
/// the email is already registered.
#[utoipa::path(
    post,
    path = "/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Registered"),
        (status = 400, description = "Email taken")
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> StatusCode {
    if state.sessions.create_user(payload).await {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

/// sign_in
///
/// [Public Route] Exchanges credentials for a token pair. An unknown email and a
/// wrong password are indistinguishable to the client.
#[utoipa::path(
    post,
    path = "/auth/token",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 400, description = "Bad credentials")
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<TokenPair>, StatusCode> {
    match state.sessions.sign_in(payload).await {
        Some(pair) => Ok(Json(pair)),
        None => Err(StatusCode::BAD_REQUEST),
    }
}

/// refresh_token
///
/// [Public Route] Rotates a session. The access token may be expired, since only
/// its signature is checked here, but a tampered token is rejected as 401,
/// distinct from the 400 produced by a stale or mismatched refresh token.
#[utoipa::path(
    post,
    path = "/auth/token/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Rotated token pair", body = TokenPair),
        (status = 400, description = "Stale or mismatched refresh token"),
        (status = 401, description = "Tampered access token")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Response {
    match state.sessions.refresh_token(payload).await {
        Ok(Some(pair)) => Json(pair).into_response(),
        Ok(None) => StatusCode::BAD_REQUEST.into_response(),
        Err(e) => e.into_response(),
    }
}

/// revoke_session
///
/// [Authenticated Route] Self-revocation: clears the caller's stored refresh
/// token. Access tokens already issued stay valid until their own expiry.
#[utoipa::path(
    post,
    path = "/auth/revoke",
    responses(
        (status = 204, description = "Revoked"),
        (status = 401, description = "No session identity")
    )
)]
pub async fn revoke_session(
    caller: CallerContext,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.sessions.revoke_self(&caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// revoke_target_session
///
/// [Admin Route] Revokes an arbitrary identity's session by id.
#[utoipa::path(
    delete,
    path = "/admin/sessions/{id}",
    params(("id" = Uuid, Path, description = "Identity ID")),
    responses(
        (status = 204, description = "Revoked"),
        (status = 403, description = "Not admin"),
        (status = 404, description = "No such identity")
    )
)]
pub async fn revoke_target_session(
    caller: CallerContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_role(&caller, Role::Admin)?;
    state.sessions.revoke(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// delete_identity
///
/// [Admin Route] Removes an identity. Reviews authored by it persist with their
/// reviewer reference nulled, which permanently freezes them against mutation.
#[utoipa::path(
    delete,
    path = "/admin/identities/{id}",
    params(("id" = Uuid, Path, description = "Identity ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not admin"),
        (status = 404, description = "No such identity")
    )
)]
pub async fn delete_identity(
    caller: CallerContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_role(&caller, Role::Admin)?;
    if state.identities.delete_identity(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::ResourceNotFound(format!(
            "there is no such identity: '{id}'"
        )))
    }
}

/// update_my_email
///
/// [Authenticated Route] Changes the caller's own email address. Identity rows are
/// otherwise immutable from the outside; credential and refresh-token fields move
/// only through the session lifecycle.
#[utoipa::path(
    patch,
    path = "/me",
    request_body = UpdateEmailRequest,
    responses(
        (status = 200, description = "Updated"),
        (status = 404, description = "No such identity")
    )
)]
pub async fn update_my_email(
    caller: CallerContext,
    State(state): State<AppState>,
    Json(payload): Json<UpdateEmailRequest>,
) -> Result<StatusCode, ApiError> {
    if state.identities.update_email(caller.id, &payload.email).await {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::ResourceNotFound(format!(
            "there is no such identity: '{}'",
            caller.id
        )))
    }
}

// --- Genre Handlers ---

/// get_genres
///
/// [Authenticated Route] Lists the whole taxonomy.
#[utoipa::path(
    get,
    path = "/genres",
    responses((status = 200, description = "All genres", body = [Genre]))
)]
pub async fn get_genres(
    _caller: CallerContext,
    State(state): State<AppState>,
) -> Json<Vec<Genre>> {
    Json(state.catalog.get_genres().await)
}

/// get_genre
///
/// [Authenticated Route] Single genre by id.
#[utoipa::path(
    get,
    path = "/genres/{genre_id}",
    params(("genre_id" = Uuid, Path, description = "Genre ID")),
    responses(
        (status = 200, description = "Found", body = Genre),
        (status = 404, description = "No such genre")
    )
)]
pub async fn get_genre(
    _caller: CallerContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Genre>, ApiError> {
    match state.catalog.get_genre(id).await {
        Some(genre) => Ok(Json(genre)),
        None => Err(ApiError::ResourceNotFound(format!(
            "there is no such genre: '{id}'"
        ))),
    }
}

/// create_genre
///
/// [Admin Route] Adds a taxonomy node. Genre mutation is role-gated only; there is
/// no ownership concept at this level.
#[utoipa::path(
    post,
    path = "/genres",
    request_body = CreateGenreRequest,
    responses(
        (status = 201, description = "Created", body = Genre),
        (status = 403, description = "Not admin")
    )
)]
pub async fn create_genre(
    caller: CallerContext,
    State(state): State<AppState>,
    Json(payload): Json<CreateGenreRequest>,
) -> Result<(StatusCode, Json<Genre>), Response> {
    require_role(&caller, Role::Admin).map_err(IntoResponse::into_response)?;

    let genre = Genre {
        id: Uuid::new_v4(),
        name: payload.name,
        description: payload.description,
        series: vec![],
    };
    match state.catalog.insert_genre(genre).await {
        Some(created) => Ok((StatusCode::CREATED, Json(created))),
        None => Err(StatusCode::BAD_REQUEST.into_response()),
    }
}

/// update_genre
///
/// [Admin Route] Partial update of name/description.
#[utoipa::path(
    put,
    path = "/genres/{genre_id}",
    params(("genre_id" = Uuid, Path, description = "Genre ID")),
    request_body = UpdateGenreRequest,
    responses(
        (status = 200, description = "Updated"),
        (status = 403, description = "Not admin"),
        (status = 404, description = "No such genre")
    )
)]
pub async fn update_genre(
    caller: CallerContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateGenreRequest>,
) -> Result<StatusCode, ApiError> {
    require_role(&caller, Role::Admin)?;

    if state.catalog.update_genre(id, payload).await {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::ResourceNotFound(format!(
            "there is no such genre: '{id}'"
        )))
    }
}

/// delete_genre
///
/// [Admin Route] Removes a genre and its series memberships.
#[utoipa::path(
    delete,
    path = "/genres/{genre_id}",
    params(("genre_id" = Uuid, Path, description = "Genre ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not admin"),
        (status = 404, description = "No such genre")
    )
)]
pub async fn delete_genre(
    caller: CallerContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_role(&caller, Role::Admin)?;

    if state.catalog.delete_genre(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::ResourceNotFound(format!(
            "there is no such genre: '{id}'"
        )))
    }
}

// --- Series Handlers ---

/// get_all_series
///
/// [Authenticated Route] Flat catalog listing across all genres.
#[utoipa::path(
    get,
    path = "/series",
    responses((status = 200, description = "All series", body = [Series]))
)]
pub async fn get_all_series(
    _caller: CallerContext,
    State(state): State<AppState>,
) -> Json<Vec<Series>> {
    Json(state.catalog.get_all_series().await)
}

/// get_series
///
/// [Authenticated Route] Nested lookup: the series must be a member of the genre
/// named in the path. The chain resolver reports only the first failing level.
#[utoipa::path(
    get,
    path = "/genres/{genre_id}/series/{series_id}",
    params(
        ("genre_id" = Uuid, Path, description = "Genre ID"),
        ("series_id" = Uuid, Path, description = "Series ID")
    ),
    responses(
        (status = 200, description = "Found", body = Series),
        (status = 404, description = "Chain broken")
    )
)]
pub async fn get_series(
    _caller: CallerContext,
    State(state): State<AppState>,
    Path((genre_id, series_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Series>, ApiError> {
    let series = state.resolver.resolve_series(genre_id, series_id).await?;
    Ok(Json(series))
}

/// create_series
///
/// [Poster/Admin Route] Adds shared catalog content. The poster reference must
/// resolve to a real identity holding at least the Poster role, and every listed
/// genre must exist.
#[utoipa::path(
    post,
    path = "/series",
    request_body = CreateSeriesRequest,
    responses(
        (status = 201, description = "Created", body = Series),
        (status = 400, description = "Unknown genre or poster"),
        (status = 403, description = "Insufficient role")
    )
)]
pub async fn create_series(
    caller: CallerContext,
    State(state): State<AppState>,
    Json(payload): Json<CreateSeriesRequest>,
) -> Result<(StatusCode, Json<Series>), Response> {
    require_role(&caller, Role::Poster).map_err(IntoResponse::into_response)?;

    // The recorded poster must be a real identity able to post.
    let poster_can_post = state
        .identities
        .get_identity(payload.poster_id)
        .await
        .is_some_and(|identity| identity.role.has_at_least(Role::Poster));
    if !poster_can_post {
        return Err(StatusCode::BAD_REQUEST.into_response());
    }

    let series = Series {
        id: Uuid::new_v4(),
        name: payload.name,
        description: payload.description,
        poster_id: payload.poster_id,
        genres: payload.genres,
        reviews: vec![],
    };
    match state.catalog.insert_series(series).await {
        Some(created) => Ok((StatusCode::CREATED, Json(created))),
        None => Err(StatusCode::BAD_REQUEST.into_response()),
    }
}

/// update_series
///
/// [Poster/Admin Route] Partial update. Any qualifying role may mutate any series;
/// there is no per-series ownership check, deliberately.
#[utoipa::path(
    patch,
    path = "/genres/{genre_id}/series/{series_id}",
    params(
        ("genre_id" = Uuid, Path, description = "Genre ID"),
        ("series_id" = Uuid, Path, description = "Series ID")
    ),
    request_body = UpdateSeriesRequest,
    responses(
        (status = 200, description = "Updated"),
        (status = 403, description = "Insufficient role"),
        (status = 404, description = "Chain broken")
    )
)]
pub async fn update_series(
    caller: CallerContext,
    State(state): State<AppState>,
    Path((genre_id, series_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateSeriesRequest>,
) -> Result<StatusCode, ApiError> {
    require_role(&caller, Role::Poster)?;
    let series = state.resolver.resolve_series(genre_id, series_id).await?;

    if state.catalog.update_series(series.id, payload).await {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::ResourceNotFound(format!(
            "there is no such series: '{series_id}'"
        )))
    }
}

/// delete_series
///
/// [Poster/Admin Route] Removes a series (and, via the schema, its reviews).
#[utoipa::path(
    delete,
    path = "/genres/{genre_id}/series/{series_id}",
    params(
        ("genre_id" = Uuid, Path, description = "Genre ID"),
        ("series_id" = Uuid, Path, description = "Series ID")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Insufficient role"),
        (status = 404, description = "Chain broken")
    )
)]
pub async fn delete_series(
    caller: CallerContext,
    State(state): State<AppState>,
    Path((genre_id, series_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    require_role(&caller, Role::Poster)?;
    let series = state.resolver.resolve_series(genre_id, series_id).await?;

    if state.catalog.delete_series(series.id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::ResourceNotFound(format!(
            "there is no such series: '{series_id}'"
        )))
    }
}

// --- Review Handlers ---

/// get_reviews
///
/// [Authenticated Route] All reviews of a series, addressed through the chain.
#[utoipa::path(
    get,
    path = "/genres/{genre_id}/series/{series_id}/reviews",
    params(
        ("genre_id" = Uuid, Path, description = "Genre ID"),
        ("series_id" = Uuid, Path, description = "Series ID")
    ),
    responses(
        (status = 200, description = "Reviews", body = [Review]),
        (status = 404, description = "Chain broken")
    )
)]
pub async fn get_reviews(
    _caller: CallerContext,
    State(state): State<AppState>,
    Path((genre_id, series_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<Review>>, ApiError> {
    let series = state.resolver.resolve_series(genre_id, series_id).await?;
    Ok(Json(state.catalog.reviews_for_series(series.id).await))
}

/// get_review
///
/// [Authenticated Route] Single review, addressed through the full chain.
#[utoipa::path(
    get,
    path = "/genres/{genre_id}/series/{series_id}/reviews/{review_id}",
    params(
        ("genre_id" = Uuid, Path, description = "Genre ID"),
        ("series_id" = Uuid, Path, description = "Series ID"),
        ("review_id" = Uuid, Path, description = "Review ID")
    ),
    responses(
        (status = 200, description = "Found", body = Review),
        (status = 404, description = "Chain broken")
    )
)]
pub async fn get_review(
    _caller: CallerContext,
    State(state): State<AppState>,
    Path((genre_id, series_id, review_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<Review>, ApiError> {
    let review = state
        .resolver
        .resolve_review(genre_id, series_id, review_id)
        .await?;
    Ok(Json(review))
}

/// create_review
///
/// [Authenticated Route] Posts a review under the resolved series. Any
/// authenticated role may review, but the attribution must be the caller's own id.
#[utoipa::path(
    post,
    path = "/genres/{genre_id}/series/{series_id}/reviews",
    params(
        ("genre_id" = Uuid, Path, description = "Genre ID"),
        ("series_id" = Uuid, Path, description = "Series ID")
    ),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Created", body = Review),
        (status = 403, description = "Attribution mismatch"),
        (status = 404, description = "Chain broken")
    )
)]
pub async fn create_review(
    caller: CallerContext,
    State(state): State<AppState>,
    Path((genre_id, series_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), Response> {
    let series = state
        .resolver
        .resolve_series(genre_id, series_id)
        .await
        .map_err(|e| ApiError::from(e).into_response())?;
    ensure_review_attribution(payload.reviewer_id, &caller)
        .map_err(IntoResponse::into_response)?;

    let review = Review {
        id: Uuid::new_v4(),
        rating: payload.rating,
        text: payload.text,
        post_date: Utc::now(),
        series_id: series.id,
        reviewer_id: Some(caller.id),
    };
    match state.catalog.insert_review(review).await {
        Some(created) => Ok((StatusCode::CREATED, Json(created))),
        // Duplicate review id or storage failure.
        None => Err(StatusCode::BAD_REQUEST.into_response()),
    }
}

/// update_review
///
/// [Authenticated Route] Strict ownership: only the recorded reviewer may touch
/// the review, whatever the caller's role. A review whose reviewer was deleted is
/// frozen for everyone.
#[utoipa::path(
    put,
    path = "/genres/{genre_id}/series/{series_id}/reviews/{review_id}",
    params(
        ("genre_id" = Uuid, Path, description = "Genre ID"),
        ("series_id" = Uuid, Path, description = "Series ID"),
        ("review_id" = Uuid, Path, description = "Review ID")
    ),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Updated"),
        (status = 403, description = "Not the reviewer, or review frozen"),
        (status = 404, description = "Chain broken")
    )
)]
pub async fn update_review(
    caller: CallerContext,
    State(state): State<AppState>,
    Path((genre_id, series_id, review_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<StatusCode, ApiError> {
    let review = state
        .resolver
        .resolve_review(genre_id, series_id, review_id)
        .await?;
    ensure_review_mutable(&review, &caller)?;

    if state.catalog.update_review(review.id, payload).await {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::ResourceNotFound(format!(
            "there is no such review: '{review_id}'"
        )))
    }
}

/// delete_review
///
/// [Authenticated Route] Same ownership discipline as update.
#[utoipa::path(
    delete,
    path = "/genres/{genre_id}/series/{series_id}/reviews/{review_id}",
    params(
        ("genre_id" = Uuid, Path, description = "Genre ID"),
        ("series_id" = Uuid, Path, description = "Series ID"),
        ("review_id" = Uuid, Path, description = "Review ID")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the reviewer, or review frozen"),
        (status = 404, description = "Chain broken")
    )
)]
pub async fn delete_review(
    caller: CallerContext,
    State(state): State<AppState>,
    Path((genre_id, series_id, review_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let review = state
        .resolver
        .resolve_review(genre_id, series_id, review_id)
        .await?;
    ensure_review_mutable(&review, &caller)?;

    if state.catalog.delete_review(review.id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::ResourceNotFound(format!(
            "there is no such review: '{review_id}'"
        )))
    }
}

/// health
///
/// [Public Route] Liveness probe for monitoring and load balancer checks.
pub async fn health() -> &'static str {
    "ok"
}
