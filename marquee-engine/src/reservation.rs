use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use marquee_domain::access;
use marquee_domain::repository::{BookingStore, CatalogStore};
use marquee_domain::{
    Booking, BookingNotice, BookingStatus, NotificationHook, ReservationError, Show, StoreError,
};

/// Derived seat state for one show. Computed on every request; nothing here
/// is cached across requests.
#[derive(Debug, Serialize)]
pub struct SeatSummary {
    pub total_seats: u32,
    pub available_seats: u32,
    pub booked_seat_numbers: BTreeSet<u32>,
}

/// The reservation core: validates booking requests against the catalog and
/// the active-booking state, commits through the store, and emits
/// best-effort notifications after commit.
///
/// The engine performs no I/O of its own; atomicity of the
/// check-then-insert sequence is delegated to the store's active-seat
/// uniqueness guarantee, so under concurrent calls for the same
/// (show, seat) exactly one caller wins and the rest see `SeatTaken`.
#[derive(Clone)]
pub struct ReservationEngine {
    catalog: Arc<dyn CatalogStore>,
    bookings: Arc<dyn BookingStore>,
    hook: Arc<dyn NotificationHook>,
}

impl ReservationEngine {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        bookings: Arc<dyn BookingStore>,
        hook: Arc<dyn NotificationHook>,
    ) -> Self {
        Self {
            catalog,
            bookings,
            hook,
        }
    }

    /// Book one seat on one show for `identity`.
    ///
    /// Precondition order: show exists, seat in 1..=total_seats, seat not
    /// actively booked. The last check is enforced by the store's
    /// constraint on the insert path; a conflict surfaces as `SeatTaken`.
    pub async fn reserve_seat(
        &self,
        identity: Uuid,
        show_id: Uuid,
        seat_number: u32,
    ) -> Result<Booking, ReservationError> {
        let show = self
            .catalog
            .get_show(show_id)
            .await?
            .ok_or(ReservationError::NotFound("show"))?;

        if seat_number == 0 || seat_number > show.total_seats {
            return Err(ReservationError::OutOfRange {
                seat: seat_number,
                total: show.total_seats,
            });
        }

        let booking = Booking::new(identity, show_id, seat_number);
        match self.bookings.insert_active(&booking).await {
            Ok(()) => {}
            Err(StoreError::SeatConflict) => return Err(ReservationError::SeatTaken(seat_number)),
            Err(e) => return Err(e.into()),
        }

        self.notify(Notify::Created, &booking, &show).await;
        Ok(booking)
    }

    /// Cancel a booking on behalf of its owner. The status flip is a
    /// compare-and-swap in the store, so a cancel that loses a race with
    /// another cancel fails with `AlreadyCancelled` instead of silently
    /// succeeding twice.
    pub async fn cancel_booking(
        &self,
        identity: Uuid,
        booking_id: Uuid,
    ) -> Result<Booking, ReservationError> {
        let booking = self
            .bookings
            .get(booking_id)
            .await?
            .ok_or(ReservationError::NotFound("booking"))?;

        access::authorize_cancel(identity, &booking)?;

        if booking.status == BookingStatus::Cancelled {
            return Err(ReservationError::AlreadyCancelled);
        }

        let updated = self
            .bookings
            .mark_cancelled(booking_id)
            .await?
            .ok_or(ReservationError::AlreadyCancelled)?;

        match self.catalog.get_show(updated.show_id).await {
            Ok(Some(show)) => self.notify(Notify::Cancelled, &updated, &show).await,
            Ok(None) | Err(_) => {
                warn!(booking_id = %updated.id, "show lookup failed while building cancellation notice");
            }
        }

        Ok(updated)
    }

    /// total_seats minus the count of active bookings, straight off the
    /// authoritative store.
    pub async fn available_seats(&self, show_id: Uuid) -> Result<u32, ReservationError> {
        let show = self
            .catalog
            .get_show(show_id)
            .await?
            .ok_or(ReservationError::NotFound("show"))?;
        let active = self.bookings.count_active(show_id).await?;
        Ok(show.total_seats.saturating_sub(active))
    }

    /// Seat numbers currently held by active bookings.
    pub async fn booked_seat_numbers(
        &self,
        show_id: Uuid,
    ) -> Result<BTreeSet<u32>, ReservationError> {
        if self.catalog.get_show(show_id).await?.is_none() {
            return Err(ReservationError::NotFound("show"));
        }
        Ok(self.bookings.active_seats(show_id).await?)
    }

    pub async fn seat_summary(&self, show_id: Uuid) -> Result<SeatSummary, ReservationError> {
        let show = self
            .catalog
            .get_show(show_id)
            .await?
            .ok_or(ReservationError::NotFound("show"))?;
        let booked = self.bookings.active_seats(show_id).await?;
        Ok(SeatSummary {
            total_seats: show.total_seats,
            available_seats: show.total_seats.saturating_sub(booked.len() as u32),
            booked_seat_numbers: booked,
        })
    }

    /// Every booking the user has made, newest first, cancelled included.
    pub async fn bookings_for(&self, identity: Uuid) -> Result<Vec<Booking>, ReservationError> {
        Ok(self.bookings.list_for_user(identity).await?)
    }

    async fn notify(&self, kind: Notify, booking: &Booking, show: &Show) {
        let movie = match self.catalog.get_movie(show.movie_id).await {
            Ok(Some(m)) => m,
            Ok(None) | Err(_) => {
                warn!(booking_id = %booking.id, "movie lookup failed while building notice");
                return;
            }
        };

        let notice = BookingNotice::new(booking.clone(), show, &movie);
        let result = match kind {
            Notify::Created => self.hook.booking_created(&notice).await,
            Notify::Cancelled => self.hook.booking_cancelled(&notice).await,
        };
        if let Err(e) = result {
            warn!(booking_id = %booking.id, error = %e, "notification hook failed");
        }
    }
}

enum Notify {
    Created,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use marquee_domain::{Movie, NotifyError};
    use marquee_store::memory::MemoryStore;
    use std::sync::Mutex;

    /// Captures every notice the engine emits.
    #[derive(Default)]
    struct RecordingHook {
        created: Mutex<Vec<BookingNotice>>,
        cancelled: Mutex<Vec<BookingNotice>>,
    }

    #[async_trait]
    impl NotificationHook for RecordingHook {
        async fn booking_created(&self, notice: &BookingNotice) -> Result<(), NotifyError> {
            self.created.lock().unwrap().push(notice.clone());
            Ok(())
        }

        async fn booking_cancelled(&self, notice: &BookingNotice) -> Result<(), NotifyError> {
            self.cancelled.lock().unwrap().push(notice.clone());
            Ok(())
        }
    }

    /// Always fails, to prove hook errors never reach the caller.
    struct FailingHook;

    #[async_trait]
    impl NotificationHook for FailingHook {
        async fn booking_created(&self, _: &BookingNotice) -> Result<(), NotifyError> {
            Err(NotifyError("mailer down".into()))
        }

        async fn booking_cancelled(&self, _: &BookingNotice) -> Result<(), NotifyError> {
            Err(NotifyError("mailer down".into()))
        }
    }

    struct Fixture {
        engine: ReservationEngine,
        store: MemoryStore,
        hook: Arc<RecordingHook>,
        show_id: Uuid,
    }

    async fn fixture(total_seats: u32) -> Fixture {
        let store = MemoryStore::new();
        let hook = Arc::new(RecordingHook::default());
        let engine = ReservationEngine::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            hook.clone(),
        );

        let movie = Movie::new("Solaris".into(), 167);
        store.create_movie(&movie).await.unwrap();
        let show = Show::new(movie.id, "Screen 1".into(), Utc::now(), total_seats);
        store.create_show(&show).await.unwrap();

        Fixture {
            engine,
            store,
            hook,
            show_id: show.id,
        }
    }

    #[tokio::test]
    async fn availability_tracks_active_bookings() {
        let f = fixture(100).await;
        let user = Uuid::new_v4();

        for seat in 1..=3 {
            f.engine.reserve_seat(user, f.show_id, seat).await.unwrap();
        }

        assert_eq!(f.engine.available_seats(f.show_id).await.unwrap(), 97);
        let booked = f.engine.booked_seat_numbers(f.show_id).await.unwrap();
        assert_eq!(booked, BTreeSet::from([1, 2, 3]));

        let summary = f.engine.seat_summary(f.show_id).await.unwrap();
        assert_eq!(summary.total_seats, 100);
        assert_eq!(summary.available_seats, 97);
    }

    #[tokio::test]
    async fn seat_beyond_total_is_out_of_range() {
        let f = fixture(100).await;
        let err = f
            .engine
            .reserve_seat(Uuid::new_v4(), f.show_id, 101)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::OutOfRange { seat: 101, total: 100 }));
    }

    #[tokio::test]
    async fn seat_zero_is_out_of_range() {
        let f = fixture(100).await;
        let err = f
            .engine
            .reserve_seat(Uuid::new_v4(), f.show_id, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::OutOfRange { seat: 0, .. }));
    }

    #[tokio::test]
    async fn unknown_show_is_not_found() {
        let f = fixture(10).await;
        let missing = Uuid::new_v4();
        assert!(matches!(
            f.engine.reserve_seat(Uuid::new_v4(), missing, 1).await,
            Err(ReservationError::NotFound("show"))
        ));
        assert!(matches!(
            f.engine.available_seats(missing).await,
            Err(ReservationError::NotFound("show"))
        ));
        assert!(matches!(
            f.engine.booked_seat_numbers(missing).await,
            Err(ReservationError::NotFound("show"))
        ));
    }

    #[tokio::test]
    async fn second_booking_for_same_seat_is_taken() {
        let f = fixture(50).await;
        f.engine
            .reserve_seat(Uuid::new_v4(), f.show_id, 12)
            .await
            .unwrap();
        let err = f
            .engine
            .reserve_seat(Uuid::new_v4(), f.show_id, 12)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::SeatTaken(12)));
    }

    #[tokio::test]
    async fn non_owner_cancel_is_forbidden_and_leaves_status_unchanged() {
        let f = fixture(10).await;
        let owner = Uuid::new_v4();
        let booking = f.engine.reserve_seat(owner, f.show_id, 3).await.unwrap();

        let err = f
            .engine
            .cancel_booking(Uuid::new_v4(), booking.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::Forbidden));

        let stored = f.store.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Booked);
    }

    #[tokio::test]
    async fn second_cancel_deterministically_fails() {
        let f = fixture(10).await;
        let owner = Uuid::new_v4();
        let booking = f.engine.reserve_seat(owner, f.show_id, 5).await.unwrap();

        let cancelled = f.engine.cancel_booking(owner, booking.id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert!(cancelled.updated_at >= booking.updated_at);

        let err = f.engine.cancel_booking(owner, booking.id).await.unwrap_err();
        assert!(matches!(err, ReservationError::AlreadyCancelled));
    }

    #[tokio::test]
    async fn cancel_of_unknown_booking_is_not_found() {
        let f = fixture(10).await;
        let err = f
            .engine
            .cancel_booking(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::NotFound("booking")));
    }

    #[tokio::test]
    async fn single_seat_show_lifecycle() {
        let f = fixture(1).await;
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let first = f.engine.reserve_seat(a, f.show_id, 1).await.unwrap();
        assert_eq!(first.status, BookingStatus::Booked);

        let err = f.engine.reserve_seat(b, f.show_id, 1).await.unwrap_err();
        assert!(matches!(err, ReservationError::SeatTaken(1)));

        f.engine.cancel_booking(a, first.id).await.unwrap();
        assert_eq!(f.engine.available_seats(f.show_id).await.unwrap(), 1);

        let second = f.engine.reserve_seat(b, f.show_id, 1).await.unwrap();
        assert_eq!(second.status, BookingStatus::Booked);
        assert_eq!(second.user_id, b);
    }

    #[tokio::test]
    async fn rebooking_creates_a_fresh_row_and_never_resurrects_the_old_one() {
        let f = fixture(5).await;
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let old = f.engine.reserve_seat(a, f.show_id, 2).await.unwrap();
        f.engine.cancel_booking(a, old.id).await.unwrap();
        let new = f.engine.reserve_seat(b, f.show_id, 2).await.unwrap();

        assert_ne!(old.id, new.id);
        let old_stored = f.store.get(old.id).await.unwrap().unwrap();
        assert_eq!(old_stored.status, BookingStatus::Cancelled);
        let new_stored = f.store.get(new.id).await.unwrap().unwrap();
        assert_eq!(new_stored.status, BookingStatus::Booked);
    }

    #[tokio::test]
    async fn user_bookings_are_listed_newest_first_including_cancelled() {
        let f = fixture(10).await;
        let user = Uuid::new_v4();

        let first = f.engine.reserve_seat(user, f.show_id, 1).await.unwrap();
        let second = f.engine.reserve_seat(user, f.show_id, 2).await.unwrap();
        f.engine.cancel_booking(user, first.id).await.unwrap();

        let listed = f.engine.bookings_for(user).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
        assert_eq!(listed[1].status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn notices_carry_denormalized_show_and_movie_fields() {
        let f = fixture(10).await;
        let user = Uuid::new_v4();

        let booking = f.engine.reserve_seat(user, f.show_id, 4).await.unwrap();
        f.engine.cancel_booking(user, booking.id).await.unwrap();

        let created = f.hook.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].movie_title, "Solaris");
        assert_eq!(created[0].screen_name, "Screen 1");
        assert_eq!(created[0].booking.id, booking.id);

        let cancelled = f.hook.cancelled.lock().unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].booking.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn hook_failure_never_propagates() {
        let store = MemoryStore::new();
        let engine = ReservationEngine::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(FailingHook),
        );

        let movie = Movie::new("Stalker".into(), 162);
        store.create_movie(&movie).await.unwrap();
        let show = Show::new(movie.id, "Screen 2".into(), Utc::now(), 10);
        store.create_show(&show).await.unwrap();

        let owner = Uuid::new_v4();
        let booking = engine.reserve_seat(owner, show.id, 1).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Booked);
        let cancelled = engine.cancel_booking(owner, booking.id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_reservations_for_one_seat_admit_exactly_one_winner() {
        let f = fixture(200).await;

        let mut handles = Vec::new();
        for _ in 0..24 {
            let engine = f.engine.clone();
            let show_id = f.show_id;
            handles.push(tokio::spawn(async move {
                engine.reserve_seat(Uuid::new_v4(), show_id, 7).await
            }));
        }

        let mut wins = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(ReservationError::SeatTaken(7)) => conflicts += 1,
                Err(other) => panic!("unexpected outcome: {other}"),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(conflicts, 23);
        assert_eq!(f.engine.available_seats(f.show_id).await.unwrap(), 199);
        assert_eq!(
            f.engine.booked_seat_numbers(f.show_id).await.unwrap(),
            BTreeSet::from([7])
        );
    }
}
