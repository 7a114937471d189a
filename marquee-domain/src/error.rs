use thiserror::Error;

/// Failures reported by a store implementation.
///
/// `SeatConflict` and `Duplicate` are constraint outcomes the caller turns
/// into business errors; `Unavailable` is transient (deadlock, lost
/// connection) and safe to retry at the request level.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("an active booking already holds this seat")]
    SeatConflict,

    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Expected business outcomes of the reservation operations. None of these
/// are fatal; they map 1:1 onto 4xx responses at the API edge.
#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("seat {seat} is out of range for this show ({total} seats)")]
    OutOfRange { seat: u32, total: u32 },

    #[error("seat {0} is already booked for this show")]
    SeatTaken(u32),

    #[error("you can only cancel your own bookings")]
    Forbidden,

    #[error("booking is already cancelled")]
    AlreadyCancelled,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReservationError {
    /// True only for transient store failures: retry the whole operation.
    /// Rule violations are deterministic and must not be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReservationError::Store(StoreError::Unavailable(_)))
    }
}
