use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use marquee_domain::movie::{MAX_DURATION_MINUTES, MAX_TOTAL_SEATS};
use marquee_domain::{Movie, Show};
use marquee_engine::SeatSummary;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/movies", get(list_movies))
        .route("/v1/movies/{movie_id}/shows", get(list_shows))
        .route("/v1/shows/{show_id}/seats", get(show_seats))
}

/// Catalog writes are administrative; they sit behind the auth middleware.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/movies", post(create_movie))
        .route("/v1/admin/movies/{movie_id}/shows", post(create_show))
}

async fn list_movies(State(state): State<AppState>) -> Result<Json<Vec<Movie>>, AppError> {
    Ok(Json(state.catalog.list_movies().await?))
}

async fn list_shows(
    State(state): State<AppState>,
    Path(movie_id): Path<Uuid>,
) -> Result<Json<Vec<Show>>, AppError> {
    if state.catalog.get_movie(movie_id).await?.is_none() {
        return Err(AppError::NotFoundError("movie not found".to_string()));
    }
    Ok(Json(state.catalog.list_shows_for_movie(movie_id).await?))
}

async fn show_seats(
    State(state): State<AppState>,
    Path(show_id): Path<Uuid>,
) -> Result<Json<SeatSummary>, AppError> {
    Ok(Json(state.engine.seat_summary(show_id).await?))
}

#[derive(Debug, Deserialize)]
struct CreateMovieRequest {
    title: String,
    duration_minutes: u32,
}

async fn create_movie(
    State(state): State<AppState>,
    Json(req): Json<CreateMovieRequest>,
) -> Result<(StatusCode, Json<Movie>), AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::ValidationError("title must not be empty".to_string()));
    }
    if req.duration_minutes == 0 || req.duration_minutes > MAX_DURATION_MINUTES {
        return Err(AppError::ValidationError(format!(
            "duration must be between 1 and {MAX_DURATION_MINUTES} minutes"
        )));
    }

    let movie = Movie::new(req.title, req.duration_minutes);
    state.catalog.create_movie(&movie).await?;
    info!(movie_id = %movie.id, title = %movie.title, "movie created");
    Ok((StatusCode::CREATED, Json(movie)))
}

#[derive(Debug, Deserialize)]
struct CreateShowRequest {
    screen_name: String,
    starts_at: DateTime<Utc>,
    total_seats: u32,
}

async fn create_show(
    State(state): State<AppState>,
    Path(movie_id): Path<Uuid>,
    Json(req): Json<CreateShowRequest>,
) -> Result<(StatusCode, Json<Show>), AppError> {
    if state.catalog.get_movie(movie_id).await?.is_none() {
        return Err(AppError::NotFoundError("movie not found".to_string()));
    }
    if req.screen_name.trim().is_empty() {
        return Err(AppError::ValidationError("screen name must not be empty".to_string()));
    }
    if req.total_seats == 0 || req.total_seats > MAX_TOTAL_SEATS {
        return Err(AppError::ValidationError(format!(
            "total seats must be between 1 and {MAX_TOTAL_SEATS}"
        )));
    }

    let show = Show::new(movie_id, req.screen_name, req.starts_at, req.total_seats);
    state.catalog.create_show(&show).await.map_err(|e| match e {
        marquee_domain::StoreError::Duplicate(_) => AppError::ValidationError(
            "another show already occupies this screen at that time".to_string(),
        ),
        other => other.into(),
    })?;

    info!(show_id = %show.id, screen = %show.screen_name, "show scheduled");
    Ok((StatusCode::CREATED, Json(show)))
}
