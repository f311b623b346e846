use axum::{
    extract::FromRequestParts,
    http::{Method, Request, Uri, header, request::Parts},
};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use show_portal::{
    auth::CallerContext,
    config::{AppConfig, Env},
    error::ApiError,
    models::Role,
    token::Claims,
};
use std::time::SystemTime;
use uuid::Uuid;

// --- Helper Functions ---

const TEST_USER_ID: Uuid = Uuid::from_u128(1);

fn test_config(env: Env) -> AppConfig {
    let mut config = AppConfig::default();
    config.env = env;
    config
}

/// Forges a token signed with the default test secret. `exp_offset` may be
/// negative to produce an already-expired token.
fn create_token(config: &AppConfig, user_id: Uuid, role: Role, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        role,
        iss: config.jwt.issuer.clone(),
        aud: config.jwt.audience.clone(),
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    let key = EncodingKey::from_secret(config.jwt.secret.as_bytes());
    encode(&Header::new(Algorithm::HS512), &claims, &key).unwrap()
}

/// Helper to get the mutable Parts struct from a generated Request.
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(parts: &mut Parts, token: &str) {
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let config = test_config(Env::Production);
    let token = create_token(&config, TEST_USER_ID, Role::Poster, 3600);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let caller = CallerContext::from_request_parts(&mut parts, &config).await;

    assert!(caller.is_ok());
    let caller = caller.unwrap();
    assert_eq!(caller.id, TEST_USER_ID);
    assert_eq!(caller.role, Role::Poster);
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let config = test_config(Env::Production);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let caller = CallerContext::from_request_parts(&mut parts, &config).await;

    assert!(matches!(caller, Err(ApiError::Unauthenticated(_))));
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let config = test_config(Env::Production);
    // Expired an hour ago, well past any validation leeway.
    let token = create_token(&config, TEST_USER_ID, Role::User, -3600);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let caller = CallerContext::from_request_parts(&mut parts, &config).await;

    // Expiry is an authentication failure, distinct from tampering.
    assert!(matches!(caller, Err(ApiError::Unauthenticated(_))));
}

#[tokio::test]
async fn test_auth_failure_with_garbage_token() {
    let config = test_config(Env::Production);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, "not.a.jwt");

    let caller = CallerContext::from_request_parts(&mut parts, &config).await;

    assert_eq!(caller, Err(ApiError::InvalidToken));
}

#[tokio::test]
async fn test_auth_failure_with_foreign_signature() {
    let config = test_config(Env::Production);
    let mut foreign = test_config(Env::Production);
    foreign.jwt.secret = "a-completely-different-secret".to_string();
    let token = create_token(&foreign, TEST_USER_ID, Role::Admin, 3600);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let caller = CallerContext::from_request_parts(&mut parts, &config).await;

    assert_eq!(caller, Err(ApiError::InvalidToken));
}

#[tokio::test]
async fn test_auth_failure_with_non_bearer_scheme() {
    let config = test_config(Env::Production);
    let token = create_token(&config, TEST_USER_ID, Role::User, 3600);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Basic {}", token)).unwrap(),
    );

    let caller = CallerContext::from_request_parts(&mut parts, &config).await;

    assert!(matches!(caller, Err(ApiError::Unauthenticated(_))));
}

#[tokio::test]
async fn test_local_bypass_success() {
    let config = test_config(Env::Local);
    let caller_id = Uuid::new_v4();

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-caller-id"),
        header::HeaderValue::from_str(&caller_id.to_string()).unwrap(),
    );
    parts.headers.insert(
        header::HeaderName::from_static("x-caller-role"),
        header::HeaderValue::from_static("Admin"),
    );

    let caller = CallerContext::from_request_parts(&mut parts, &config).await;

    assert!(caller.is_ok());
    let caller = caller.unwrap();
    assert_eq!(caller.id, caller_id);
    assert_eq!(caller.role, Role::Admin);
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let config = test_config(Env::Production);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    // Provide ONLY the local bypass headers.
    parts.headers.insert(
        header::HeaderName::from_static("x-caller-id"),
        header::HeaderValue::from_str(&Uuid::new_v4().to_string()).unwrap(),
    );
    parts.headers.insert(
        header::HeaderName::from_static("x-caller-role"),
        header::HeaderValue::from_static("Admin"),
    );

    let caller = CallerContext::from_request_parts(&mut parts, &config).await;

    assert!(caller.is_err());
}

#[tokio::test]
async fn test_local_bypass_with_bad_role_falls_through() {
    let config = test_config(Env::Local);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-caller-id"),
        header::HeaderValue::from_str(&Uuid::new_v4().to_string()).unwrap(),
    );
    parts.headers.insert(
        header::HeaderName::from_static("x-caller-role"),
        header::HeaderValue::from_static("SuperAdmin"),
    );

    // Malformed bypass headers do not authenticate; with no Bearer token either,
    // the request is rejected.
    let caller = CallerContext::from_request_parts(&mut parts, &config).await;

    assert!(matches!(caller, Err(ApiError::Unauthenticated(_))));
}
