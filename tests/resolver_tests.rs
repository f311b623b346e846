use async_trait::async_trait;
use show_portal::{
    error::ApiError,
    models::{
        Genre, Review, Series, UpdateGenreRequest, UpdateReviewRequest, UpdateSeriesRequest,
    },
    repository::{CatalogState, CatalogStore},
    resolver::{ChainError, ResourceChainResolver},
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// --- Mock Catalog Store ---

#[derive(Default)]
struct MockCatalogStore {
    genres: Mutex<HashMap<Uuid, Genre>>,
    series: Mutex<HashMap<Uuid, Series>>,
    reviews: Mutex<HashMap<Uuid, Review>>,
}

#[async_trait]
impl CatalogStore for MockCatalogStore {
    async fn get_genre(&self, id: Uuid) -> Option<Genre> {
        self.genres.lock().unwrap().get(&id).cloned()
    }
    async fn get_genres(&self) -> Vec<Genre> {
        self.genres.lock().unwrap().values().cloned().collect()
    }
    async fn insert_genre(&self, genre: Genre) -> Option<Genre> {
        self.genres.lock().unwrap().insert(genre.id, genre.clone());
        Some(genre)
    }
    async fn update_genre(&self, id: Uuid, req: UpdateGenreRequest) -> bool {
        let mut map = self.genres.lock().unwrap();
        match map.get_mut(&id) {
            Some(genre) => {
                if let Some(name) = req.name {
                    genre.name = name;
                }
                if let Some(description) = req.description {
                    genre.description = description;
                }
                true
            }
            None => false,
        }
    }
    async fn delete_genre(&self, id: Uuid) -> bool {
        self.genres.lock().unwrap().remove(&id).is_some()
    }

    async fn get_series(&self, id: Uuid) -> Option<Series> {
        self.series.lock().unwrap().get(&id).cloned()
    }
    async fn get_all_series(&self) -> Vec<Series> {
        self.series.lock().unwrap().values().cloned().collect()
    }
    async fn insert_series(&self, series: Series) -> Option<Series> {
        // Every claimed genre membership must resolve.
        let genres = self.genres.lock().unwrap();
        if !series.genres.iter().all(|g| genres.contains_key(g)) {
            return None;
        }
        drop(genres);
        self.series.lock().unwrap().insert(series.id, series.clone());
        Some(series)
    }
    async fn update_series(&self, id: Uuid, req: UpdateSeriesRequest) -> bool {
        let mut map = self.series.lock().unwrap();
        match map.get_mut(&id) {
            Some(series) => {
                if let Some(name) = req.name {
                    series.name = name;
                }
                if let Some(description) = req.description {
                    series.description = description;
                }
                true
            }
            None => false,
        }
    }
    async fn delete_series(&self, id: Uuid) -> bool {
        self.series.lock().unwrap().remove(&id).is_some()
    }

    async fn get_review(&self, id: Uuid) -> Option<Review> {
        self.reviews.lock().unwrap().get(&id).cloned()
    }
    async fn reviews_for_series(&self, series_id: Uuid) -> Vec<Review> {
        self.reviews
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.series_id == series_id)
            .cloned()
            .collect()
    }
    async fn insert_review(&self, review: Review) -> Option<Review> {
        let mut map = self.reviews.lock().unwrap();
        if map.contains_key(&review.id) {
            return None;
        }
        map.insert(review.id, review.clone());
        Some(review)
    }
    async fn update_review(&self, id: Uuid, req: UpdateReviewRequest) -> bool {
        let mut map = self.reviews.lock().unwrap();
        match map.get_mut(&id) {
            Some(review) => {
                if let Some(rating) = req.rating {
                    review.rating = rating;
                }
                if let Some(text) = req.text {
                    review.text = text;
                }
                true
            }
            None => false,
        }
    }
    async fn delete_review(&self, id: Uuid) -> bool {
        self.reviews.lock().unwrap().remove(&id).is_some()
    }
}

// --- Fixture ---

// Two genres, two series, two reviews:
//   crime ∋ heist_show   (reviews: praised, orphaned)
//   drama ∋ court_show   (no reviews)
const CRIME: Uuid = Uuid::from_u128(0x10);
const DRAMA: Uuid = Uuid::from_u128(0x11);
const HEIST_SHOW: Uuid = Uuid::from_u128(0x20);
const COURT_SHOW: Uuid = Uuid::from_u128(0x21);
const PRAISED: Uuid = Uuid::from_u128(0x30);
const ORPHANED: Uuid = Uuid::from_u128(0x31);
const REVIEWER: Uuid = Uuid::from_u128(0x2);
const POSTER: Uuid = Uuid::from_u128(0x3);

fn seeded() -> Arc<MockCatalogStore> {
    let store = MockCatalogStore::default();
    store.genres.lock().unwrap().insert(
        CRIME,
        Genre {
            id: CRIME,
            name: "Crime".to_string(),
            description: "Heists and whodunits".to_string(),
            series: vec![HEIST_SHOW],
        },
    );
    store.genres.lock().unwrap().insert(
        DRAMA,
        Genre {
            id: DRAMA,
            name: "Drama".to_string(),
            description: "Courtrooms mostly".to_string(),
            series: vec![COURT_SHOW],
        },
    );
    store.series.lock().unwrap().insert(
        HEIST_SHOW,
        Series {
            id: HEIST_SHOW,
            name: "The Long Con".to_string(),
            description: "Six seasons of setups".to_string(),
            poster_id: POSTER,
            genres: vec![CRIME],
            reviews: vec![PRAISED, ORPHANED],
        },
    );
    store.series.lock().unwrap().insert(
        COURT_SHOW,
        Series {
            id: COURT_SHOW,
            name: "Objection!".to_string(),
            description: "Legal drama".to_string(),
            poster_id: POSTER,
            genres: vec![DRAMA],
            reviews: vec![],
        },
    );
    store.reviews.lock().unwrap().insert(
        PRAISED,
        Review {
            id: PRAISED,
            rating: 9,
            text: "Stuck the landing".to_string(),
            series_id: HEIST_SHOW,
            reviewer_id: Some(REVIEWER),
            ..Review::default()
        },
    );
    store.reviews.lock().unwrap().insert(
        ORPHANED,
        Review {
            id: ORPHANED,
            rating: 3,
            text: "Author account long gone".to_string(),
            series_id: HEIST_SHOW,
            reviewer_id: None,
            ..Review::default()
        },
    );
    Arc::new(store)
}

fn resolver(store: Arc<MockCatalogStore>) -> ResourceChainResolver {
    ResourceChainResolver::new(store as CatalogState)
}

// --- Two-level resolution ---

#[tokio::test]
async fn resolve_series_succeeds_on_a_valid_chain() {
    let resolver = resolver(seeded());

    let series = resolver.resolve_series(CRIME, HEIST_SHOW).await.unwrap();

    assert_eq!(series.id, HEIST_SHOW);
    assert_eq!(series.poster_id, POSTER);
}

#[tokio::test]
async fn resolve_series_reports_missing_genre_first() {
    let resolver = resolver(seeded());
    let nowhere = Uuid::from_u128(0xdead);

    // Both levels are wrong; only the topmost failure is reported.
    assert_eq!(
        resolver.resolve_series(nowhere, Uuid::from_u128(0xbeef)).await,
        Err(ChainError::MissingGenre(nowhere))
    );
}

#[tokio::test]
async fn resolve_series_does_not_disclose_cross_genre_existence() {
    let resolver = resolver(seeded());
    let unknown = Uuid::from_u128(0xbeef);

    // A series that exists globally but under another genre reports the same
    // not-found as a series that does not exist at all.
    let foreign = resolver.resolve_series(DRAMA, HEIST_SHOW).await;
    let absent = resolver.resolve_series(DRAMA, unknown).await;

    assert_eq!(foreign, Err(ChainError::MissingSeries(HEIST_SHOW)));
    assert_eq!(absent, Err(ChainError::MissingSeries(unknown)));
}

// --- Three-level resolution ---

#[tokio::test]
async fn resolve_review_succeeds_on_a_valid_chain() {
    let resolver = resolver(seeded());

    let review = resolver
        .resolve_review(CRIME, HEIST_SHOW, PRAISED)
        .await
        .unwrap();

    assert_eq!(review.id, PRAISED);
    assert_eq!(review.reviewer_id, Some(REVIEWER));
}

#[tokio::test]
async fn resolve_review_walks_top_down() {
    let resolver = resolver(seeded());
    let nowhere = Uuid::from_u128(0xdead);

    // Genre level fails before the (also wrong) series and review levels.
    assert_eq!(
        resolver.resolve_review(nowhere, HEIST_SHOW, PRAISED).await,
        Err(ChainError::MissingGenre(nowhere))
    );
    // Series level fails before the review level.
    assert_eq!(
        resolver.resolve_review(DRAMA, HEIST_SHOW, PRAISED).await,
        Err(ChainError::MissingSeries(HEIST_SHOW))
    );
}

#[tokio::test]
async fn resolve_review_rejects_a_review_under_another_series() {
    let resolver = resolver(seeded());

    // PRAISED exists, but not under COURT_SHOW.
    assert_eq!(
        resolver.resolve_review(DRAMA, COURT_SHOW, PRAISED).await,
        Err(ChainError::MissingReview(PRAISED))
    );
}

#[tokio::test]
async fn resolve_review_rejects_an_unknown_review() {
    let resolver = resolver(seeded());
    let unknown = Uuid::from_u128(0xbeef);

    assert_eq!(
        resolver.resolve_review(CRIME, HEIST_SHOW, unknown).await,
        Err(ChainError::MissingReview(unknown))
    );
}

#[tokio::test]
async fn membership_without_a_backing_row_still_reads_as_missing() {
    let store = seeded();
    // The genre lists the series but the series row is gone.
    store.series.lock().unwrap().remove(&HEIST_SHOW);
    let resolver = resolver(store);

    assert_eq!(
        resolver.resolve_series(CRIME, HEIST_SHOW).await,
        Err(ChainError::MissingSeries(HEIST_SHOW))
    );
}

// --- Error mapping & store contract ---

#[test]
fn chain_errors_map_to_resource_not_found() {
    let id = Uuid::from_u128(0x77);
    for err in [
        ChainError::MissingGenre(id),
        ChainError::MissingSeries(id),
        ChainError::MissingReview(id),
    ] {
        assert!(matches!(ApiError::from(err), ApiError::ResourceNotFound(_)));
    }
}

#[tokio::test]
async fn duplicate_review_id_is_rejected_by_the_store() {
    let store = seeded();

    let duplicate = Review {
        id: PRAISED,
        series_id: HEIST_SHOW,
        reviewer_id: Some(REVIEWER),
        ..Review::default()
    };

    assert!(store.insert_review(duplicate).await.is_none());
}

#[tokio::test]
async fn series_with_unknown_genre_membership_is_rejected_by_the_store() {
    let store = seeded();

    let stray = Series {
        id: Uuid::from_u128(0x99),
        name: "Unmoored".to_string(),
        description: "Claims a genre that does not exist".to_string(),
        poster_id: POSTER,
        genres: vec![Uuid::from_u128(0xdead)],
        reviews: vec![],
    };

    assert!(store.insert_series(stray).await.is_none());
}
