use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    auth::CallerContext,
    config::RoleSecrets,
    error::ApiError,
    models::{Identity, RefreshTokenRequest, Role, SignInRequest, SignUpRequest, TokenPair},
    password::HasherState,
    repository::IdentityState,
    token::TokenIssuer,
};

/// SessionManager
///
/// Orchestrates the session-token lifecycle: sign-up, sign-in, refresh-token
/// rotation and revocation. Per identity the states are `LoggedOut → Active`
/// (sign-in), `Active → Active` (refresh, token rotated) and `Active → LoggedOut`
/// (revoke, or a refresh attempt with a stale/expired/mismatched refresh token).
#[derive(Clone)]
pub struct SessionManager {
    identities: IdentityState,
    hasher: HasherState,
    tokens: TokenIssuer,
    refresh_token_days: i64,
    role_secrets: RoleSecrets,
}

impl SessionManager {
    pub fn new(
        identities: IdentityState,
        hasher: HasherState,
        tokens: TokenIssuer,
        refresh_token_days: i64,
        role_secrets: RoleSecrets,
    ) -> Self {
        Self {
            identities,
            hasher,
            tokens,
            refresh_token_days,
            role_secrets,
        }
    }

    /// role_for_secret
    ///
    /// Matches the sign-up secret against the three configuration-bound values.
    /// An unrecognized secret yields the basic User role rather than an error.
    fn role_for_secret(&self, secret: &str) -> Role {
        if secret == self.role_secrets.admin {
            Role::Admin
        } else if secret == self.role_secrets.poster {
            Role::Poster
        } else {
            Role::User
        }
    }

    /// create_user
    ///
    /// Registers a new identity. Returns false if the email is already registered
    /// or the credential material could not be produced; nothing is persisted in
    /// either case.
    pub async fn create_user(&self, request: SignUpRequest) -> bool {
        if self.identities.find_by_email(&request.email).await.is_some() {
            return false;
        }

        let salt = match self.hasher.create_salt() {
            Ok(salt) => salt,
            Err(e) => {
                tracing::error!("salt generation failed: {e}");
                return false;
            }
        };
        let hashed_password = match self.hasher.hash_password(&request.password, &salt) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::error!("password hashing failed: {e}");
                return false;
            }
        };

        let identity = Identity {
            id: Uuid::new_v4(),
            email: request.email,
            hashed_password,
            salt,
            role: self.role_for_secret(&request.role_secret),
            refresh_token: None,
            refresh_token_expiry: None,
        };

        self.identities.insert_identity(identity).await.is_some()
    }

    /// sign_in
    ///
    /// Verifies credentials and opens a session. On success a fresh access/refresh
    /// pair is issued and the refresh token is persisted with its expiry,
    /// overwriting any prior one. An identity has a single active session, so
    /// signing in elsewhere invalidates the previous refresh token immediately.
    pub async fn sign_in(&self, request: SignInRequest) -> Option<TokenPair> {
        let identity = self.identities.find_by_email(&request.email).await?;

        let valid = self.hasher.verify_password(
            &identity.hashed_password,
            &request.password,
            &identity.salt,
        );
        if !valid {
            return None;
        }

        let access_token = match self
            .tokens
            .generate_access_token(identity.id, identity.role)
        {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("access token generation failed: {:?}", e);
                return None;
            }
        };
        let refresh_token = self.tokens.generate_refresh_token();
        let expiry = Utc::now() + Duration::days(self.refresh_token_days);

        if !self
            .identities
            .store_refresh_token(identity.id, &refresh_token, expiry)
            .await
        {
            return None;
        }

        Some(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// refresh_token
    ///
    /// Rotates the session credentials. The subject is recovered from the access
    /// token while deliberately ignoring its expiry; a cryptographically invalid
    /// token is an `InvalidToken` error, never a silent None. The presented
    /// refresh token must string-equal the stored one and be unexpired, and the
    /// rotation itself is a compare-and-swap at the store: under two concurrent
    /// refreshes exactly one pair survives and the loser fails deterministically.
    pub async fn refresh_token(
        &self,
        request: RefreshTokenRequest,
    ) -> Result<Option<TokenPair>, ApiError> {
        let claims = self
            .tokens
            .extract_claims_ignoring_expiry(&request.access_token)?;

        let Some(identity) = self.identities.get_identity(claims.sub).await else {
            return Ok(None);
        };

        // Lazy expiry check; no background sweeping exists.
        let now = Utc::now();
        let stored_matches = identity.refresh_token.as_deref() == Some(request.refresh_token.as_str());
        let unexpired = identity.refresh_token_expiry.is_some_and(|expiry| now < expiry);
        if !stored_matches || !unexpired {
            return Ok(None);
        }

        let access_token = match self
            .tokens
            .generate_access_token(identity.id, identity.role)
        {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("access token generation failed: {:?}", e);
                return Ok(None);
            }
        };
        let refresh_token = self.tokens.generate_refresh_token();
        let expiry = now + Duration::days(self.refresh_token_days);

        let rotated = self
            .identities
            .rotate_refresh_token(identity.id, &request.refresh_token, &refresh_token, expiry)
            .await;
        if !rotated {
            // A concurrent rotation won the swap; this caller's token is stale.
            return Ok(None);
        }

        Ok(Some(TokenPair {
            access_token,
            refresh_token,
        }))
    }

    /// revoke_self
    ///
    /// Logs the caller out of their own session. Fails with `Unauthenticated` when
    /// no identity is resolvable for the caller. Already-issued access tokens stay
    /// valid until their own short expiry elapses; only the refresh token dies.
    pub async fn revoke_self(&self, caller: &CallerContext) -> Result<(), ApiError> {
        if self.identities.get_identity(caller.id).await.is_none() {
            return Err(ApiError::Unauthenticated(
                "no signed-in identity to revoke".to_string(),
            ));
        }

        self.identities.clear_refresh_token(caller.id).await;
        Ok(())
    }

    /// revoke
    ///
    /// Administrative revocation of an arbitrary identity's session. Fails with
    /// `ResourceNotFound` when the target id does not exist.
    pub async fn revoke(&self, target_id: Uuid) -> Result<(), ApiError> {
        if self.identities.get_identity(target_id).await.is_none() {
            return Err(ApiError::ResourceNotFound(format!(
                "there is no such identity: '{target_id}'"
            )));
        }

        self.identities.clear_refresh_token(target_id).await;
        Ok(())
    }
}
