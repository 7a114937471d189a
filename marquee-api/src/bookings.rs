use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use marquee_domain::Booking;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/shows/{show_id}/book", post(book_seat))
        .route("/v1/bookings/{booking_id}/cancel", post(cancel_booking))
        .route("/v1/my-bookings", get(my_bookings))
}

#[derive(Debug, Deserialize)]
struct BookSeatRequest {
    seat_number: u32,
}

async fn book_seat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(show_id): Path<Uuid>,
    Json(req): Json<BookSeatRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let identity = claims.user_id()?;
    let booking = state
        .engine
        .reserve_seat(identity, show_id, req.seat_number)
        .await?;

    info!(booking_id = %booking.id, show_id = %show_id, seat = req.seat_number, "seat booked");
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let identity = claims.user_id()?;
    let booking = state.engine.cancel_booking(identity, booking_id).await?;

    info!(booking_id = %booking.id, "booking cancelled");
    Ok(Json(booking))
}

async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let identity = claims.user_id()?;
    Ok(Json(state.engine.bookings_for(identity).await?))
}
