use crate::models::{
    Genre, Identity, Review, Role, Series, UpdateGenreRequest, UpdateReviewRequest,
    UpdateSeriesRequest,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

// --- Store Contracts ---

/// IdentityStore
///
/// Defines the abstract contract for all identity persistence. This is the core of
/// the store-abstraction pattern: SessionManager and the handlers interact with
/// identities without knowing the concrete backing (Postgres in production, an
/// in-memory mock in tests).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn IdentityStore>`) safely shareable across Axum's task boundaries.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Email lookup for sign-up uniqueness and sign-in.
    async fn find_by_email(&self, email: &str) -> Option<Identity>;

    async fn get_identity(&self, id: Uuid) -> Option<Identity>;

    /// Inserts a new identity. Returns None if the email is already registered.
    async fn insert_identity(&self, identity: Identity) -> Option<Identity>;

    async fn update_email(&self, id: Uuid, email: &str) -> bool;

    /// Removes the identity. Reviews authored by it survive with their reviewer
    /// reference nulled (schema-level `ON DELETE SET NULL`), freezing them.
    async fn delete_identity(&self, id: Uuid) -> bool;

    /// Unconditionally overwrites the stored refresh token and expiry (sign-in).
    /// Any previously active session for the identity is invalidated.
    async fn store_refresh_token(&self, id: Uuid, token: &str, expiry: DateTime<Utc>) -> bool;

    /// Atomic rotation (refresh): succeeds only if `current` still string-equals
    /// the stored token AND the stored expiry is in the future. Two concurrent
    /// rotations presenting the same token race on this compare-and-swap; exactly
    /// one wins and the loser observes `false`.
    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
        expiry: DateTime<Utc>,
    ) -> bool;

    /// Clears the stored refresh token (revoke). Outstanding access tokens remain
    /// valid until their own expiry elapses.
    async fn clear_refresh_token(&self, id: Uuid) -> bool;
}

/// CatalogStore
///
/// Abstract contract for the genre/series/review catalog, including the
/// relationship traversal the chain resolver depends on (genre→series membership,
/// series→reviews).
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // --- Genres ---
    async fn get_genre(&self, id: Uuid) -> Option<Genre>;
    async fn get_genres(&self) -> Vec<Genre>;
    async fn insert_genre(&self, genre: Genre) -> Option<Genre>;
    async fn update_genre(&self, id: Uuid, req: UpdateGenreRequest) -> bool;
    async fn delete_genre(&self, id: Uuid) -> bool;

    // --- Series ---
    async fn get_series(&self, id: Uuid) -> Option<Series>;
    async fn get_all_series(&self) -> Vec<Series>;
    /// Inserts a series and its genre memberships. Every id in `series.genres`
    /// must resolve to an existing genre; otherwise nothing is created.
    async fn insert_series(&self, series: Series) -> Option<Series>;
    async fn update_series(&self, id: Uuid, req: UpdateSeriesRequest) -> bool;
    async fn delete_series(&self, id: Uuid) -> bool;

    // --- Reviews ---
    async fn get_review(&self, id: Uuid) -> Option<Review>;
    async fn reviews_for_series(&self, series_id: Uuid) -> Vec<Review>;
    /// Inserts a review. Returns None if the review id is already taken.
    async fn insert_review(&self, review: Review) -> Option<Review>;
    async fn update_review(&self, id: Uuid, req: UpdateReviewRequest) -> bool;
    async fn delete_review(&self, id: Uuid) -> bool;
}

/// The concrete types used to share the persistence layer across the application state.
pub type IdentityState = Arc<dyn IdentityStore>;
pub type CatalogState = Arc<dyn CatalogStore>;

// --- Postgres Implementation ---

/// PostgresIdentityStore
///
/// Concrete `IdentityStore` backed by PostgreSQL. Queries use the runtime binding
/// API; every database error is logged and surfaces to callers as the operation's
/// negative outcome, never as a panic.
pub struct PostgresIdentityStore {
    pool: PgPool,
}

impl PostgresIdentityStore {
    /// Creates a new store instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Raw identity row. The role column is text; conversion to the typed enum happens
/// in `From<IdentityRow>` so the rest of the crate never sees the string form.
#[derive(FromRow)]
struct IdentityRow {
    id: Uuid,
    email: String,
    hashed_password: String,
    salt: String,
    role: String,
    refresh_token: Option<String>,
    refresh_token_expiry: Option<DateTime<Utc>>,
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        let role = row.role.parse::<Role>().unwrap_or_else(|e| {
            tracing::error!("identity {} has unreadable role: {e}", row.id);
            Role::User
        });
        Identity {
            id: row.id,
            email: row.email,
            hashed_password: row.hashed_password,
            salt: row.salt,
            role,
            refresh_token: row.refresh_token,
            refresh_token_expiry: row.refresh_token_expiry,
        }
    }
}

const IDENTITY_COLUMNS: &str =
    "id, email, hashed_password, salt, role, refresh_token, refresh_token_expiry";

#[async_trait]
impl IdentityStore for PostgresIdentityStore {
    async fn find_by_email(&self, email: &str) -> Option<Identity> {
        let query = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE email = $1");
        sqlx::query_as::<_, IdentityRow>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("find_by_email error: {:?}", e);
                None
            })
            .map(Identity::from)
    }

    async fn get_identity(&self, id: Uuid) -> Option<Identity> {
        let query = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE id = $1");
        sqlx::query_as::<_, IdentityRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_identity error: {:?}", e);
                None
            })
            .map(Identity::from)
    }

    /// insert_identity
    ///
    /// Uses `ON CONFLICT DO NOTHING` so a concurrently taken email surfaces as
    /// None rather than an error, mirroring the sign-up contract.
    async fn insert_identity(&self, identity: Identity) -> Option<Identity> {
        let query = format!(
            "INSERT INTO identities (id, email, hashed_password, salt, role) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (email) DO NOTHING \
             RETURNING {IDENTITY_COLUMNS}"
        );
        sqlx::query_as::<_, IdentityRow>(&query)
            .bind(identity.id)
            .bind(&identity.email)
            .bind(&identity.hashed_password)
            .bind(&identity.salt)
            .bind(identity.role.to_string())
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("insert_identity error: {:?}", e);
                None
            })
            .map(Identity::from)
    }

    async fn update_email(&self, id: Uuid, email: &str) -> bool {
        match sqlx::query("UPDATE identities SET email = $2 WHERE id = $1")
            .bind(id)
            .bind(email)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("update_email error: {:?}", e);
                false
            }
        }
    }

    async fn delete_identity(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM identities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_identity error: {:?}", e);
                false
            }
        }
    }

    async fn store_refresh_token(&self, id: Uuid, token: &str, expiry: DateTime<Utc>) -> bool {
        match sqlx::query(
            "UPDATE identities SET refresh_token = $2, refresh_token_expiry = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expiry)
        .execute(&self.pool)
        .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("store_refresh_token error: {:?}", e);
                false
            }
        }
    }

    /// rotate_refresh_token
    ///
    /// The optimistic concurrency guard: the WHERE clause is the compare half of
    /// the compare-and-swap, so a rotation whose presented token was already
    /// superseded (or expired) affects zero rows.
    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
        expiry: DateTime<Utc>,
    ) -> bool {
        match sqlx::query(
            "UPDATE identities SET refresh_token = $3, refresh_token_expiry = $4 \
             WHERE id = $1 AND refresh_token = $2 AND refresh_token_expiry > NOW()",
        )
        .bind(id)
        .bind(current)
        .bind(next)
        .bind(expiry)
        .execute(&self.pool)
        .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("rotate_refresh_token error: {:?}", e);
                false
            }
        }
    }

    async fn clear_refresh_token(&self, id: Uuid) -> bool {
        match sqlx::query(
            "UPDATE identities SET refresh_token = NULL, refresh_token_expiry = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("clear_refresh_token error: {:?}", e);
                false
            }
        }
    }
}

/// PostgresCatalogStore
///
/// Concrete `CatalogStore` backed by PostgreSQL. Genre↔series membership lives in
/// the `genre_series` join table; `reviews.reviewer_id` is declared
/// `ON DELETE SET NULL` so identity deletion freezes reviews instead of removing
/// them.
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn series_ids_for_genre(&self, genre_id: Uuid) -> Vec<Uuid> {
        sqlx::query_scalar::<_, Uuid>("SELECT series_id FROM genre_series WHERE genre_id = $1")
            .bind(genre_id)
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("series_ids_for_genre error: {:?}", e);
                vec![]
            })
    }

    async fn genre_ids_for_series(&self, series_id: Uuid) -> Vec<Uuid> {
        sqlx::query_scalar::<_, Uuid>("SELECT genre_id FROM genre_series WHERE series_id = $1")
            .bind(series_id)
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("genre_ids_for_series error: {:?}", e);
                vec![]
            })
    }

    async fn review_ids_for_series(&self, series_id: Uuid) -> Vec<Uuid> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM reviews WHERE series_id = $1")
            .bind(series_id)
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("review_ids_for_series error: {:?}", e);
                vec![]
            })
    }

    /// One round trip for the whole membership table, grouped in memory. Used by
    /// the list endpoints to avoid per-row membership queries.
    async fn membership_pairs(&self) -> Vec<(Uuid, Uuid)> {
        #[derive(FromRow)]
        struct Pair {
            genre_id: Uuid,
            series_id: Uuid,
        }
        sqlx::query_as::<_, Pair>("SELECT genre_id, series_id FROM genre_series")
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("membership_pairs error: {:?}", e);
                vec![]
            })
            .into_iter()
            .map(|p| (p.genre_id, p.series_id))
            .collect()
    }
}

#[derive(FromRow)]
struct GenreRow {
    id: Uuid,
    name: String,
    description: String,
}

#[derive(FromRow)]
struct SeriesRow {
    id: Uuid,
    name: String,
    description: String,
    poster_id: Uuid,
}

#[derive(FromRow)]
struct ReviewRow {
    id: Uuid,
    rating: i32,
    text: String,
    post_date: DateTime<Utc>,
    series_id: Uuid,
    reviewer_id: Option<Uuid>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            rating: row.rating,
            text: row.text,
            post_date: row.post_date,
            series_id: row.series_id,
            reviewer_id: row.reviewer_id,
        }
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    async fn get_genre(&self, id: Uuid) -> Option<Genre> {
        let row = sqlx::query_as::<_, GenreRow>(
            "SELECT id, name, description FROM genres WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_genre error: {:?}", e);
            None
        })?;

        let series = self.series_ids_for_genre(row.id).await;
        Some(Genre {
            id: row.id,
            name: row.name,
            description: row.description,
            series,
        })
    }

    async fn get_genres(&self) -> Vec<Genre> {
        let rows = sqlx::query_as::<_, GenreRow>(
            "SELECT id, name, description FROM genres ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_genres error: {:?}", e);
            vec![]
        });

        let mut members: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (genre_id, series_id) in self.membership_pairs().await {
            members.entry(genre_id).or_default().push(series_id);
        }

        rows.into_iter()
            .map(|row| Genre {
                series: members.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                description: row.description,
            })
            .collect()
    }

    async fn insert_genre(&self, genre: Genre) -> Option<Genre> {
        let row = sqlx::query_as::<_, GenreRow>(
            "INSERT INTO genres (id, name, description) VALUES ($1, $2, $3) \
             RETURNING id, name, description",
        )
        .bind(genre.id)
        .bind(&genre.name)
        .bind(&genre.description)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("insert_genre error: {:?}", e);
            None
        })?;

        Some(Genre {
            id: row.id,
            name: row.name,
            description: row.description,
            series: vec![],
        })
    }

    /// update_genre
    ///
    /// Uses the PostgreSQL `COALESCE` function to handle `Option<T>` fields,
    /// only updating a column if the corresponding field in `req` is `Some`.
    async fn update_genre(&self, id: Uuid, req: UpdateGenreRequest) -> bool {
        match sqlx::query(
            "UPDATE genres SET name = COALESCE($2, name), \
             description = COALESCE($3, description) WHERE id = $1",
        )
        .bind(id)
        .bind(req.name)
        .bind(req.description)
        .execute(&self.pool)
        .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("update_genre error: {:?}", e);
                false
            }
        }
    }

    async fn delete_genre(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM genres WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_genre error: {:?}", e);
                false
            }
        }
    }

    async fn get_series(&self, id: Uuid) -> Option<Series> {
        let row = sqlx::query_as::<_, SeriesRow>(
            "SELECT id, name, description, poster_id FROM series WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_series error: {:?}", e);
            None
        })?;

        let genres = self.genre_ids_for_series(row.id).await;
        let reviews = self.review_ids_for_series(row.id).await;
        Some(Series {
            id: row.id,
            name: row.name,
            description: row.description,
            poster_id: row.poster_id,
            genres,
            reviews,
        })
    }

    async fn get_all_series(&self) -> Vec<Series> {
        let rows = sqlx::query_as::<_, SeriesRow>(
            "SELECT id, name, description, poster_id FROM series ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_all_series error: {:?}", e);
            vec![]
        });

        let mut genres: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (genre_id, series_id) in self.membership_pairs().await {
            genres.entry(series_id).or_default().push(genre_id);
        }

        #[derive(FromRow)]
        struct ReviewRef {
            id: Uuid,
            series_id: Uuid,
        }
        let mut reviews: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        let review_refs = sqlx::query_as::<_, ReviewRef>("SELECT id, series_id FROM reviews")
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_all_series reviews error: {:?}", e);
                vec![]
            });
        for r in review_refs {
            reviews.entry(r.series_id).or_default().push(r.id);
        }

        rows.into_iter()
            .map(|row| Series {
                genres: genres.remove(&row.id).unwrap_or_default(),
                reviews: reviews.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                description: row.description,
                poster_id: row.poster_id,
            })
            .collect()
    }

    /// insert_series
    ///
    /// Runs in a transaction: the series row and its genre memberships land
    /// together or not at all. The genre count check rejects any membership id
    /// that does not resolve to a real genre.
    async fn insert_series(&self, series: Series) -> Option<Series> {
        let mut tx = match self.pool.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                tracing::error!("insert_series begin error: {:?}", e);
                return None;
            }
        };

        let known: i64 =
            match sqlx::query_scalar("SELECT COUNT(*) FROM genres WHERE id = ANY($1)")
                .bind(&series.genres)
                .fetch_one(&mut *tx)
                .await
            {
                Ok(count) => count,
                Err(e) => {
                    tracing::error!("insert_series genre check error: {:?}", e);
                    return None;
                }
            };
        if known != series.genres.len() as i64 {
            return None;
        }

        let inserted = sqlx::query(
            "INSERT INTO series (id, name, description, poster_id) VALUES ($1, $2, $3, $4)",
        )
        .bind(series.id)
        .bind(&series.name)
        .bind(&series.description)
        .bind(series.poster_id)
        .execute(&mut *tx)
        .await;
        if let Err(e) = inserted {
            tracing::error!("insert_series error: {:?}", e);
            return None;
        }

        let memberships = sqlx::query(
            "INSERT INTO genre_series (genre_id, series_id) SELECT unnest($1::uuid[]), $2",
        )
        .bind(&series.genres)
        .bind(series.id)
        .execute(&mut *tx)
        .await;
        if let Err(e) = memberships {
            tracing::error!("insert_series membership error: {:?}", e);
            return None;
        }

        match tx.commit().await {
            Ok(()) => Some(Series {
                reviews: vec![],
                ..series
            }),
            Err(e) => {
                tracing::error!("insert_series commit error: {:?}", e);
                None
            }
        }
    }

    async fn update_series(&self, id: Uuid, req: UpdateSeriesRequest) -> bool {
        match sqlx::query(
            "UPDATE series SET name = COALESCE($2, name), \
             description = COALESCE($3, description) WHERE id = $1",
        )
        .bind(id)
        .bind(req.name)
        .bind(req.description)
        .execute(&self.pool)
        .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("update_series error: {:?}", e);
                false
            }
        }
    }

    async fn delete_series(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM series WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_series error: {:?}", e);
                false
            }
        }
    }

    async fn get_review(&self, id: Uuid) -> Option<Review> {
        sqlx::query_as::<_, ReviewRow>(
            "SELECT id, rating, text, post_date, series_id, reviewer_id \
             FROM reviews WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_review error: {:?}", e);
            None
        })
        .map(Review::from)
    }

    async fn reviews_for_series(&self, series_id: Uuid) -> Vec<Review> {
        sqlx::query_as::<_, ReviewRow>(
            "SELECT id, rating, text, post_date, series_id, reviewer_id \
             FROM reviews WHERE series_id = $1 ORDER BY post_date ASC",
        )
        .bind(series_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("reviews_for_series error: {:?}", e);
            vec![]
        })
        .into_iter()
        .map(Review::from)
        .collect()
    }

    /// insert_review
    ///
    /// `ON CONFLICT DO NOTHING` turns a duplicate review id into None instead of
    /// an error.
    async fn insert_review(&self, review: Review) -> Option<Review> {
        sqlx::query_as::<_, ReviewRow>(
            "INSERT INTO reviews (id, rating, text, post_date, series_id, reviewer_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO NOTHING \
             RETURNING id, rating, text, post_date, series_id, reviewer_id",
        )
        .bind(review.id)
        .bind(review.rating)
        .bind(&review.text)
        .bind(review.post_date)
        .bind(review.series_id)
        .bind(review.reviewer_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("insert_review error: {:?}", e);
            None
        })
        .map(Review::from)
    }

    async fn update_review(&self, id: Uuid, req: UpdateReviewRequest) -> bool {
        match sqlx::query(
            "UPDATE reviews SET rating = COALESCE($2, rating), \
             text = COALESCE($3, text) WHERE id = $1",
        )
        .bind(id)
        .bind(req.rating)
        .bind(req.text)
        .execute(&self.pool)
        .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("update_review error: {:?}", e);
                false
            }
        }
    }

    async fn delete_review(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_review error: {:?}", e);
                false
            }
        }
    }
}
