use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A claim on one seat of one show by one user.
///
/// At most one booking per (show_id, seat_number) may be in `Booked` at any
/// time; cancelled rows are history and never block a re-book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub show_id: Uuid,
    pub seat_number: u32,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// A fresh active booking. Bookings are born `Booked`; there is no
    /// pending state.
    pub fn new(user_id: Uuid, show_id: Uuid, seat_number: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            show_id,
            seat_number,
            status: BookingStatus::Booked,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Booked,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Booked => "BOOKED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BOOKED" => Some(BookingStatus::Booked),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}
