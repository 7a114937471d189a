pub mod access;
pub mod booking;
pub mod error;
pub mod events;
pub mod movie;
pub mod repository;
pub mod user;

pub use booking::{Booking, BookingStatus};
pub use error::{ReservationError, StoreError};
pub use events::{BookingNotice, NotificationHook, NotifyError};
pub use movie::{Movie, Show};
pub use user::User;
