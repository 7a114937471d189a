pub mod reservation;

pub use reservation::{ReservationEngine, SeatSummary};
