use async_trait::async_trait;
use marquee_domain::repository::CatalogStore;
use marquee_domain::{Movie, Show, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::map_db_err;

pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct MovieRow {
    id: Uuid,
    title: String,
    duration_minutes: i32,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<MovieRow> for Movie {
    fn from(row: MovieRow) -> Self {
        Movie {
            id: row.id,
            title: row.title,
            duration_minutes: row.duration_minutes.max(0) as u32,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ShowRow {
    id: Uuid,
    movie_id: Uuid,
    screen_name: String,
    starts_at: chrono::DateTime<chrono::Utc>,
    total_seats: i32,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<ShowRow> for Show {
    fn from(row: ShowRow) -> Self {
        Show {
            id: row.id,
            movie_id: row.movie_id,
            screen_name: row.screen_name,
            starts_at: row.starts_at,
            total_seats: row.total_seats.max(0) as u32,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn create_movie(&self, movie: &Movie) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO movies (id, title, duration_minutes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(movie.id)
        .bind(&movie.title)
        .bind(movie.duration_minutes as i32)
        .bind(movie.created_at)
        .bind(movie.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(())
    }

    async fn create_show(&self, show: &Show) -> Result<(), StoreError> {
        // unique (screen_name, starts_at) surfaces here as Duplicate
        sqlx::query(
            r#"
            INSERT INTO shows (id, movie_id, screen_name, starts_at, total_seats, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(show.id)
        .bind(show.movie_id)
        .bind(&show.screen_name)
        .bind(show.starts_at)
        .bind(show.total_seats as i32)
        .bind(show.created_at)
        .bind(show.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(())
    }

    async fn get_movie(&self, movie_id: Uuid) -> Result<Option<Movie>, StoreError> {
        let row = sqlx::query_as::<_, MovieRow>(
            r#"
            SELECT id, title, duration_minutes, created_at, updated_at
            FROM movies WHERE id = $1
            "#,
        )
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(row.map(Movie::from))
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, StoreError> {
        let rows = sqlx::query_as::<_, MovieRow>(
            r#"
            SELECT id, title, duration_minutes, created_at, updated_at
            FROM movies ORDER BY title ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(rows.into_iter().map(Movie::from).collect())
    }

    async fn get_show(&self, show_id: Uuid) -> Result<Option<Show>, StoreError> {
        let row = sqlx::query_as::<_, ShowRow>(
            r#"
            SELECT id, movie_id, screen_name, starts_at, total_seats, created_at, updated_at
            FROM shows WHERE id = $1
            "#,
        )
        .bind(show_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(row.map(Show::from))
    }

    async fn list_shows_for_movie(&self, movie_id: Uuid) -> Result<Vec<Show>, StoreError> {
        let rows = sqlx::query_as::<_, ShowRow>(
            r#"
            SELECT id, movie_id, screen_name, starts_at, total_seats, created_at, updated_at
            FROM shows WHERE movie_id = $1 ORDER BY starts_at ASC
            "#,
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(rows.into_iter().map(Show::from).collect())
    }
}
