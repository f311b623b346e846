use crate::{auth::CallerContext, error::ApiError, models::Role};

/// require_role
///
/// The single role-membership primitive. The hierarchy (`User < Poster < Admin`)
/// is applied here by ordinal comparison, so call sites name only the minimum
/// required role and never construct per-site allow-lists.
pub fn require_role(caller: &CallerContext, required: Role) -> Result<(), ApiError> {
    if caller.role.has_at_least(required) {
        return Ok(());
    }

    Err(ApiError::Unauthorized(format!(
        "role {} does not grant {} access",
        caller.role, required
    )))
}
