use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::booking::Booking;
use crate::error::StoreError;
use crate::movie::{Movie, Show};
use crate::user::User;

/// Read-mostly catalog access. Writes exist for administrative seeding and
/// are not on the reservation hot path.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_movie(&self, movie: &Movie) -> Result<(), StoreError>;

    /// Fails with `Duplicate` when another show already occupies
    /// (screen_name, starts_at).
    async fn create_show(&self, show: &Show) -> Result<(), StoreError>;

    async fn get_movie(&self, movie_id: Uuid) -> Result<Option<Movie>, StoreError>;

    /// All movies, ordered by title.
    async fn list_movies(&self) -> Result<Vec<Movie>, StoreError>;

    async fn get_show(&self, show_id: Uuid) -> Result<Option<Show>, StoreError>;

    /// Shows for one movie, ordered by start time ascending.
    async fn list_shows_for_movie(&self, movie_id: Uuid) -> Result<Vec<Show>, StoreError>;
}

/// Booking persistence. The booking table is the only contended resource
/// in the system; implementations must make `insert_active` atomic with
/// respect to the active-seat uniqueness key (show_id, seat_number,
/// status=BOOKED) and report the loser with `SeatConflict`.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Insert a booking in `Booked` status. Exactly one of any number of
    /// concurrent inserts for the same seat key may succeed.
    async fn insert_active(&self, booking: &Booking) -> Result<(), StoreError>;

    async fn get(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Flip a booking to `Cancelled` iff it is still `Booked`, returning
    /// the updated row. `None` means the booking was not in `Booked`
    /// status; racing cancels cannot both win.
    async fn mark_cancelled(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Count of bookings in `Booked` status for the show.
    async fn count_active(&self, show_id: Uuid) -> Result<u32, StoreError>;

    /// Seat numbers currently held by `Booked` bookings for the show.
    async fn active_seats(&self, show_id: Uuid) -> Result<BTreeSet<u32>, StoreError>;

    /// All bookings ever made by the user, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, StoreError>;

    /// Active bookings whose show starts inside [from, until), ordered by
    /// show start time. Feeds reminder jobs; cancelled rows never appear.
    async fn active_starting_within(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Duplicate` when the username is taken.
    async fn create(&self, user: &User) -> Result<(), StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
}
