use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repository;
pub mod resolver;
pub mod session;
pub mod token;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::CallerContext; // The resolved authenticated caller identity.
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::AppConfig;
pub use password::{Argon2PasswordHasher, HasherState};
pub use repository::{
    CatalogState, IdentityState, PostgresCatalogStore, PostgresIdentityStore,
};
pub use resolver::ResourceChainResolver;
pub use session::SessionManager;
pub use token::TokenIssuer;

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the application.
/// It aggregates all API paths and data schemas decorated with the
/// `#[utoipa::path]` and `#[derive(utoipa::ToSchema)]` macros.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::sign_up, handlers::sign_in, handlers::refresh_token,
        handlers::revoke_session, handlers::revoke_target_session,
        handlers::delete_identity, handlers::update_my_email,
        handlers::get_genres, handlers::get_genre,
        handlers::create_genre, handlers::update_genre, handlers::delete_genre,
        handlers::get_all_series, handlers::get_series, handlers::create_series,
        handlers::update_series, handlers::delete_series, handlers::get_reviews,
        handlers::get_review, handlers::create_review, handlers::update_review,
        handlers::delete_review
    ),
    components(
        schemas(
            models::Role, models::Genre, models::Series, models::Review,
            models::TokenPair, models::SignUpRequest, models::SignInRequest,
            models::RefreshTokenRequest, models::UpdateEmailRequest,
            models::CreateGenreRequest,
            models::UpdateGenreRequest, models::CreateSeriesRequest,
            models::UpdateSeriesRequest, models::CreateReviewRequest,
            models::UpdateReviewRequest,
        )
    ),
    tags(
        (name = "show-portal", description = "Series Catalog & Review API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all essential application
/// services and configuration, shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Identity persistence, behind the abstract store contract.
    pub identities: IdentityState,
    /// Catalog persistence (genres/series/reviews), behind the abstract store contract.
    pub catalog: CatalogState,
    /// Session-token lifecycle orchestration.
    pub sessions: SessionManager,
    /// Nested genre→series→review path validation.
    pub resolver: ResourceChainResolver,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    /// new
    ///
    /// Wires the core services over the two store collaborators. Kept here so
    /// main.rs and the test harnesses assemble the state identically.
    pub fn new(identities: IdentityState, catalog: CatalogState, config: AppConfig) -> Self {
        let hasher: HasherState = std::sync::Arc::new(Argon2PasswordHasher::new());
        let sessions = SessionManager::new(
            identities.clone(),
            hasher,
            TokenIssuer::new(config.jwt.clone()),
            config.jwt.refresh_token_days,
            config.role_secrets.clone(),
        );
        let resolver = ResourceChainResolver::new(catalog.clone());

        Self {
            identities,
            catalog,
            sessions,
            resolver,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow extractors and handlers to selectively pull
// components from the shared AppState.

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identities.clone()
    }
}

impl FromRef<AppState> for CatalogState {
    fn from_ref(app_state: &AppState) -> CatalogState {
        app_state.catalog.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the protected route groups.
///
/// *Mechanism*: it attempts to extract `CallerContext` from the request. Since
/// `CallerContext` implements `FromRequestParts`, a failed token validation
/// rejects the request with 401 before the handler runs; on success the request
/// proceeds and the handler re-extracts the caller for its own checks.
async fn auth_middleware(_caller: CallerContext, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and scoped
/// middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: no middleware applied.
        .merge(public::public_routes())
        // Authenticated Routes: protected by the `auth_middleware`.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Admin Routes: nested under '/admin'. The Admin role check is performed
        // *inside* the handlers after the request passes the authentication layer.
        .nest(
            "/admin",
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a unique UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: wraps the request/response lifecycle in a span
                // that carries the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Helper used by `TraceLayer` to customize span creation: extracts the
/// `x-request-id` header (if present) and includes it in the structured logging
/// metadata alongside the HTTP method and URI, so every log line for a single
/// request is correlated by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
