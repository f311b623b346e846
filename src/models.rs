use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas ---

/// Role
///
/// The account role tag. Roles form a strict hierarchy (`User < Poster < Admin`):
/// a higher role retains every capability of the roles below it, except where an
/// ownership rule overrides role entirely (reviews). The ordering is encoded once
/// as an ordinal level; see `guard::require_role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Poster,
    Admin,
}

impl Role {
    /// Ordinal position in the hierarchy. Only `has_at_least` should compare these.
    pub(crate) fn level(self) -> u8 {
        match self {
            Role::User => 0,
            Role::Poster => 1,
            Role::Admin => 2,
        }
    }

    /// True when this role meets or exceeds `required` in the hierarchy.
    pub fn has_at_least(self, required: Role) -> bool {
        self.level() >= required.level()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::User => "User",
            Role::Poster => "Poster",
            Role::Admin => "Admin",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(Role::User),
            "Poster" => Ok(Role::Poster),
            "Admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Identity
///
/// The canonical account record. Besides the credential material this carries the
/// single active refresh token (opaque, server-side only) and its expiry; both are
/// None while the identity is logged out. They are mutated exclusively by
/// sign-in/refresh/revoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Identity {
    pub id: Uuid,
    // Unique across all identities.
    pub email: String,
    // Argon2id PHC string.
    pub hashed_password: String,
    pub salt: String,
    pub role: Role,
    pub refresh_token: Option<String>,
    pub refresh_token_expiry: Option<DateTime<Utc>>,
}

/// Genre
///
/// Taxonomy node at the top of the resource chain. `series` holds the ids of the
/// member series (many-to-many), which is all the chain resolver needs to decide
/// membership without a second round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Genre {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub series: Vec<Uuid>,
}

/// Series
///
/// Shared catalog content. Owned (in the attribution sense) by the poster identity
/// that created it, but mutation is role-gated, not ownership-gated: any Poster or
/// Admin may mutate any series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Series {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    // The Poster/Admin identity that posted the series.
    pub poster_id: Uuid,
    pub genres: Vec<Uuid>,
    pub reviews: Vec<Uuid>,
}

/// Review
///
/// Personal opinion attached to exactly one series. `reviewer_id` is nulled (not
/// cascaded) when the reviewing identity is deleted; a review with no reviewer is
/// permanently frozen against mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Review {
    pub id: Uuid,
    pub rating: i32,
    pub text: String,
    #[ts(type = "string")]
    pub post_date: DateTime<Utc>,
    pub series_id: Uuid,
    pub reviewer_id: Option<Uuid>,
}

/// TokenPair
///
/// The session credential pair returned by sign-in and refresh: a short-lived
/// signed access token and the long-lived opaque refresh token whose only other
/// copy lives on the Identity row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

// --- Request Payloads (Input Schemas) ---

/// SignUpRequest
///
/// Input payload for registration (POST /auth/sign-up). `role_secret` is matched
/// against the configured role secrets; anything unrecognized yields a basic User.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub role_secret: String,
}

/// SignInRequest
///
/// Input payload for the token endpoint (POST /auth/token).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// RefreshTokenRequest
///
/// Input payload for token rotation. The access token may be expired (only its
/// signature must hold); the refresh token must match the stored one exactly.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RefreshTokenRequest {
    pub access_token: String,
    pub refresh_token: String,
}

/// UpdateEmailRequest
///
/// Input payload for changing the caller's own email address (PATCH /me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateEmailRequest {
    pub email: String,
}

/// CreateGenreRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateGenreRequest {
    pub name: String,
    pub description: String,
}

/// UpdateGenreRequest
///
/// Partial update payload. Uses `Option<T>` plus `skip_serializing_if` so only the
/// provided fields travel in the JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateGenreRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// CreateSeriesRequest
///
/// `genres` must all resolve to existing genres; `poster_id` must resolve to an
/// identity holding at least the Poster role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateSeriesRequest {
    pub name: String,
    pub description: String,
    pub poster_id: Uuid,
    pub genres: Vec<Uuid>,
}

/// UpdateSeriesRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateSeriesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// CreateReviewRequest
///
/// `reviewer_id` must equal the caller's own id; anything else is attribution
/// forgery and is rejected before any store call.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateReviewRequest {
    pub rating: i32,
    pub text: String,
    pub reviewer_id: Uuid,
}

/// UpdateReviewRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateReviewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}
