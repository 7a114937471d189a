use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::booking::Booking;
use crate::movie::{Movie, Show};

/// Payload handed to the mailer after a booking changes state: the full
/// booking plus the show/movie fields a message template needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingNotice {
    pub booking: Booking,
    pub movie_title: String,
    pub screen_name: String,
    pub starts_at: DateTime<Utc>,
}

impl BookingNotice {
    pub fn new(booking: Booking, show: &Show, movie: &Movie) -> Self {
        Self {
            booking,
            movie_title: movie.title.clone(),
            screen_name: show.screen_name.clone(),
            starts_at: show.starts_at,
        }
    }
}

#[derive(Debug, Error)]
#[error("notification dropped: {0}")]
pub struct NotifyError(pub String);

/// Fire-and-forget seam to the external mailer. Called strictly after the
/// reservation/cancellation commits; a returned error is logged by the
/// engine and never propagates to the booking caller.
#[async_trait]
pub trait NotificationHook: Send + Sync {
    async fn booking_created(&self, notice: &BookingNotice) -> Result<(), NotifyError>;
    async fn booking_cancelled(&self, notice: &BookingNotice) -> Result<(), NotifyError>;
}

/// Hook for contexts with no mailer attached.
pub struct NoopHook;

#[async_trait]
impl NotificationHook for NoopHook {
    async fn booking_created(&self, _notice: &BookingNotice) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn booking_cancelled(&self, _notice: &BookingNotice) -> Result<(), NotifyError> {
        Ok(())
    }
}
