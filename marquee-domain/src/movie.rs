use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound on a movie's running time, in minutes.
pub const MAX_DURATION_MINUTES: u32 = 600;

/// Upper bound on a show's seat count.
pub const MAX_TOTAL_SEATS: u32 = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub duration_minutes: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Movie {
    pub fn new(title: String, duration_minutes: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            duration_minutes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A scheduled screening of a movie on a named screen.
///
/// (screen_name, starts_at) is unique: no two shows share a screen at the
/// same instant. Bookings reference shows but never own them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Show {
    pub id: Uuid,
    pub movie_id: Uuid,
    pub screen_name: String,
    pub starts_at: DateTime<Utc>,
    pub total_seats: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Show {
    pub fn new(movie_id: Uuid, screen_name: String, starts_at: DateTime<Utc>, total_seats: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            movie_id,
            screen_name,
            starts_at,
            total_seats,
            created_at: now,
            updated_at: now,
        }
    }
}
