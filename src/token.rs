use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::JwtOptions, error::ApiError, models::Role};

/// Claims
///
/// Represents the payload structure carried inside a signed access token.
/// These claims are signed by the server's secret and validated on every
/// authenticated request; the same layout must round-trip through
/// `extract_claims_ignoring_expiry` so a refresh call can recover the subject
/// from a stale token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the identity.
    pub sub: Uuid,
    /// The identity's role at issuance time.
    pub role: Role,
    /// Issuer (iss): fixed per deployment.
    pub iss: String,
    /// Audience (aud): fixed per deployment.
    pub aud: String,
    /// Expiration Time (exp): timestamp after which the token must not be accepted
    /// for regular authentication (refresh deliberately ignores it).
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// TokenIssuer
///
/// Issues and validates the two session credentials: the HS512-signed access token
/// and the opaque refresh token. The refresh token carries no structure at all;
/// its only meaning is string equality with the copy persisted on the Identity.
#[derive(Clone)]
pub struct TokenIssuer {
    options: JwtOptions,
}

impl TokenIssuer {
    pub fn new(options: JwtOptions) -> Self {
        Self { options }
    }

    /// generate_access_token
    ///
    /// Signs a short-lived token with the configured expiry, issuer and audience.
    /// Claims always include the role and subject id.
    pub fn generate_access_token(
        &self,
        subject: Uuid,
        role: Role,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: subject,
            role,
            iss: self.options.issuer.clone(),
            aud: self.options.audience.clone(),
            exp: now + self.options.access_token_seconds as usize,
            iat: now,
        };

        let key = EncodingKey::from_secret(self.options.secret.as_bytes());
        encode(&Header::new(Algorithm::HS512), &claims, &key)
    }

    /// generate_refresh_token
    ///
    /// 256 bits of randomness, base64url without padding. Opaque and unrelated to
    /// the access token's contents.
    pub fn generate_refresh_token(&self) -> String {
        let mut buf = [0u8; 32];
        // Failure here means the OS entropy source is broken; an all-zero token
        // would still be rejected server-side, but surface it loudly.
        if let Err(e) = getrandom::getrandom(&mut buf) {
            tracing::error!("refresh token entropy source failed: {e}");
        }
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
    }

    /// validate_access_token
    ///
    /// Full validation path used on every authenticated request: signature,
    /// issuer, audience, and expiry all enforced.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, ApiError> {
        match decode::<Claims>(token, &self.decoding_key(), &self.validation(true)) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                // Expired-but-genuine is an authentication failure, not tampering.
                ErrorKind::ExpiredSignature => {
                    Err(ApiError::Unauthenticated("access token expired".to_string()))
                }
                _ => Err(ApiError::InvalidToken),
            },
        }
    }

    /// extract_claims_ignoring_expiry
    ///
    /// Validates the cryptographic signature (and issuer/audience) but deliberately
    /// accepts an expired token. Needed so a refresh call can recover the subject
    /// id from a stale access token. Fails with `InvalidToken` if the signature is
    /// invalid or the token is malformed; that failure is distinct from expiry and
    /// must never be swallowed.
    pub fn extract_claims_ignoring_expiry(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding_key(), &self.validation(false))
            .map(|data| data.claims)
            .map_err(|_| ApiError::InvalidToken)
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.options.secret.as_bytes())
    }

    fn validation(&self, validate_exp: bool) -> Validation {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.set_issuer(&[&self.options.issuer]);
        validation.set_audience(&[&self.options.audience]);
        validation.validate_exp = validate_exp;
        validation
    }
}
