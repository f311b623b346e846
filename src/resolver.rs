use uuid::Uuid;

use crate::{
    auth::CallerContext,
    error::ApiError,
    models::{Review, Series},
    repository::CatalogState,
};

/// ChainError
///
/// Tagged outcome of resolving a nested genre→series→review path. Exactly one
/// level is reported: the first one that fails walking top-down. A series that
/// exists globally but not under the requested genre produces the same
/// `MissingSeries` as a series that does not exist at all, so cross-container
/// existence is never disclosed. Same for reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainError {
    MissingGenre(Uuid),
    MissingSeries(Uuid),
    MissingReview(Uuid),
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        let message = match err {
            ChainError::MissingGenre(id) => format!("there is no such genre: '{id}'"),
            ChainError::MissingSeries(id) => format!("there is no such series: '{id}'"),
            ChainError::MissingReview(id) => format!("there is no such review: '{id}'"),
        };
        ApiError::ResourceNotFound(message)
    }
}

/// ResourceChainResolver
///
/// Resolves and validates nested identifiers before any read or mutation touches
/// the catalog. Both resolvers apply the same canonical top-down order: genre
/// first, then series within that genre, then review within that series.
#[derive(Clone)]
pub struct ResourceChainResolver {
    catalog: CatalogState,
}

impl ResourceChainResolver {
    pub fn new(catalog: CatalogState) -> Self {
        Self { catalog }
    }

    /// resolve_series
    ///
    /// Loads the genre, then searches the series within that genre's member set.
    pub async fn resolve_series(
        &self,
        genre_id: Uuid,
        series_id: Uuid,
    ) -> Result<Series, ChainError> {
        let genre = self
            .catalog
            .get_genre(genre_id)
            .await
            .ok_or(ChainError::MissingGenre(genre_id))?;

        if !genre.series.contains(&series_id) {
            return Err(ChainError::MissingSeries(series_id));
        }

        // Membership listed but the row gone is the same user-visible outcome.
        self.catalog
            .get_series(series_id)
            .await
            .ok_or(ChainError::MissingSeries(series_id))
    }

    /// resolve_review
    ///
    /// Full three-level walk: genre, series within it, review within the series.
    pub async fn resolve_review(
        &self,
        genre_id: Uuid,
        series_id: Uuid,
        review_id: Uuid,
    ) -> Result<Review, ChainError> {
        let series = self.resolve_series(genre_id, series_id).await?;

        if !series.reviews.contains(&review_id) {
            return Err(ChainError::MissingReview(review_id));
        }

        self.catalog
            .get_review(review_id)
            .await
            .filter(|review| review.series_id == series_id)
            .ok_or(ChainError::MissingReview(review_id))
    }
}

/// ensure_review_mutable
///
/// The ownership guard applied before every review update/delete. A review whose
/// reviewer was deleted is frozen: its original owner is gone and no one, not
/// even an Admin, may claim it. Otherwise the caller must be the recorded
/// reviewer; role is irrelevant here.
pub fn ensure_review_mutable(review: &Review, caller: &CallerContext) -> Result<(), ApiError> {
    match review.reviewer_id {
        None => Err(ApiError::UnupdatableResource(
            "reviewer was deleted and the review can no longer be modified".to_string(),
        )),
        Some(owner) if owner != caller.id => Err(ApiError::Unauthorized(
            "trying to modify a review that does not belong to you".to_string(),
        )),
        Some(_) => Ok(()),
    }
}

/// ensure_review_attribution
///
/// The insert guard: the supplied reviewer reference must be the caller's own id,
/// whether or not the other id happens to be a valid identity.
pub fn ensure_review_attribution(reviewer_id: Uuid, caller: &CallerContext) -> Result<(), ApiError> {
    if reviewer_id == caller.id {
        return Ok(());
    }

    Err(ApiError::Unauthorized(
        "a review must be attributed to its author".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn caller(id: u128, role: Role) -> CallerContext {
        CallerContext {
            id: Uuid::from_u128(id),
            role,
        }
    }

    fn review_by(reviewer: Option<u128>) -> Review {
        Review {
            id: Uuid::from_u128(9),
            reviewer_id: reviewer.map(Uuid::from_u128),
            ..Review::default()
        }
    }

    #[test]
    fn owner_may_mutate() {
        let review = review_by(Some(2));
        assert!(ensure_review_mutable(&review, &caller(2, Role::User)).is_ok());
    }

    #[test]
    fn admin_without_ownership_is_rejected() {
        let review = review_by(Some(2));
        assert_eq!(
            ensure_review_mutable(&review, &caller(1, Role::Admin)),
            Err(ApiError::Unauthorized(
                "trying to modify a review that does not belong to you".to_string()
            ))
        );
    }

    #[test]
    fn orphaned_review_is_frozen_for_everyone() {
        let review = review_by(None);
        for role in [Role::User, Role::Poster, Role::Admin] {
            assert!(matches!(
                ensure_review_mutable(&review, &caller(1, role)),
                Err(ApiError::UnupdatableResource(_))
            ));
        }
    }

    #[test]
    fn attribution_must_match_caller() {
        assert!(ensure_review_attribution(Uuid::from_u128(3), &caller(3, Role::User)).is_ok());
        assert!(matches!(
            ensure_review_attribution(Uuid::from_u128(4), &caller(3, Role::User)),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
