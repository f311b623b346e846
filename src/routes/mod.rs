/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules.
/// Access control is applied explicitly at the module level (via Axum layers),
/// preventing accidental exposure of protected endpoints.

/// Routes accessible without a session: health, registration and the token
/// endpoints (refresh accepts an expired access token by design).
pub mod public;

/// Routes protected by the `CallerContext` extractor middleware.
/// Requires a validated access token.
pub mod authenticated;

/// Routes restricted exclusively to identities with the Admin role.
/// The role check itself happens inside the handlers.
pub mod admin;
