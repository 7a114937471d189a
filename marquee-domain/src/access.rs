use uuid::Uuid;

use crate::booking::Booking;
use crate::error::ReservationError;

/// Owner-only cancellation rule. Stateless: a pure function of the
/// identity and the booking.
pub fn authorize_cancel(identity: Uuid, booking: &Booking) -> Result<(), ReservationError> {
    if identity == booking.user_id {
        Ok(())
    } else {
        Err(ReservationError::Forbidden)
    }
}
