use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_domain::repository::{BookingStore, CatalogStore, UserStore};
use marquee_domain::{Booking, BookingStatus, Movie, Show, StoreError, User};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// In-memory store: the test double for the engine's concurrency
/// properties and the dev-mode backend when no database is configured.
///
/// One mutex guards all state, so check-and-insert is atomic and the
/// active-seat uniqueness behaves exactly like the Postgres partial unique
/// index: of N concurrent `insert_active` calls for one seat key, one wins
/// and the rest get `SeatConflict`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    movies: Vec<Movie>,
    shows: Vec<Show>,
    // Insertion log; bookings are never deleted
    bookings: Vec<Booking>,
    users: Vec<User>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn create_movie(&self, movie: &Movie) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.movies.iter().any(|m| m.id == movie.id) {
            return Err(StoreError::Duplicate(format!("movie {}", movie.id)));
        }
        inner.movies.push(movie.clone());
        Ok(())
    }

    async fn create_show(&self, show: &Show) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .shows
            .iter()
            .any(|s| s.screen_name == show.screen_name && s.starts_at == show.starts_at)
        {
            return Err(StoreError::Duplicate(format!(
                "show on {} at {}",
                show.screen_name, show.starts_at
            )));
        }
        inner.shows.push(show.clone());
        Ok(())
    }

    async fn get_movie(&self, movie_id: Uuid) -> Result<Option<Movie>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.movies.iter().find(|m| m.id == movie_id).cloned())
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut movies = inner.movies.clone();
        movies.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(movies)
    }

    async fn get_show(&self, show_id: Uuid) -> Result<Option<Show>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.shows.iter().find(|s| s.id == show_id).cloned())
    }

    async fn list_shows_for_movie(&self, movie_id: Uuid) -> Result<Vec<Show>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut shows: Vec<Show> = inner
            .shows
            .iter()
            .filter(|s| s.movie_id == movie_id)
            .cloned()
            .collect();
        shows.sort_by_key(|s| s.starts_at);
        Ok(shows)
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn insert_active(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let conflict = inner.bookings.iter().any(|b| {
            b.show_id == booking.show_id
                && b.seat_number == booking.seat_number
                && b.status == BookingStatus::Booked
        });
        if conflict {
            return Err(StoreError::SeatConflict);
        }
        inner.bookings.push(booking.clone());
        Ok(())
    }

    async fn get(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.bookings.iter().find(|b| b.id == booking_id).cloned())
    }

    async fn mark_cancelled(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.bookings.iter_mut().find(|b| b.id == booking_id) {
            Some(b) if b.status == BookingStatus::Booked => {
                b.status = BookingStatus::Cancelled;
                b.updated_at = Utc::now();
                Ok(Some(b.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn count_active(&self, show_id: Uuid) -> Result<u32, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .bookings
            .iter()
            .filter(|b| b.show_id == show_id && b.status == BookingStatus::Booked)
            .count() as u32)
    }

    async fn active_seats(&self, show_id: Uuid) -> Result<BTreeSet<u32>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .bookings
            .iter()
            .filter(|b| b.show_id == show_id && b.status == BookingStatus::Booked)
            .map(|b| b.seat_number)
            .collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let inner = self.inner.lock().unwrap();
        // The insertion log is oldest-first; reverse for newest-first
        Ok(inner
            .bookings
            .iter()
            .rev()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn active_starting_within(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut hits: Vec<(DateTime<Utc>, Booking)> = inner
            .bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Booked)
            .filter_map(|b| {
                let show = inner.shows.iter().find(|s| s.id == b.show_id)?;
                (show.starts_at >= from && show.starts_at < until)
                    .then(|| (show.starts_at, b.clone()))
            })
            .collect();
        hits.sort_by_key(|(starts_at, _)| *starts_at);
        Ok(hits.into_iter().map(|(_, b)| b).collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate(format!("username {}", user.username)));
        }
        inner.users.push(user.clone());
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_show(store: &MemoryStore) -> Show {
        let movie = Movie::new("Ran".into(), 162);
        let show = Show::new(movie.id, "Screen 3".into(), Utc::now(), 40);
        store.create_movie(&movie).await.unwrap();
        store.create_show(&show).await.unwrap();
        show
    }

    #[tokio::test]
    async fn active_insert_conflicts_on_seat_key() {
        let store = MemoryStore::new();
        let show = seeded_show(&store).await;

        let first = Booking::new(Uuid::new_v4(), show.id, 9);
        store.insert_active(&first).await.unwrap();

        let second = Booking::new(Uuid::new_v4(), show.id, 9);
        assert!(matches!(
            store.insert_active(&second).await,
            Err(StoreError::SeatConflict)
        ));

        // A cancelled row frees the key
        store.mark_cancelled(first.id).await.unwrap().unwrap();
        store.insert_active(&second).await.unwrap();
    }

    #[tokio::test]
    async fn mark_cancelled_is_a_one_shot_transition() {
        let store = MemoryStore::new();
        let show = seeded_show(&store).await;

        let booking = Booking::new(Uuid::new_v4(), show.id, 1);
        store.insert_active(&booking).await.unwrap();

        let updated = store.mark_cancelled(booking.id).await.unwrap().unwrap();
        assert_eq!(updated.status, BookingStatus::Cancelled);
        assert!(store.mark_cancelled(booking.id).await.unwrap().is_none());
        assert!(store.mark_cancelled(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn screen_slot_is_unique() {
        let store = MemoryStore::new();
        let movie = Movie::new("Ikiru".into(), 143);
        store.create_movie(&movie).await.unwrap();

        let starts_at = Utc::now();
        let show = Show::new(movie.id, "Screen 1".into(), starts_at, 100);
        store.create_show(&show).await.unwrap();

        let clash = Show::new(movie.id, "Screen 1".into(), starts_at, 50);
        assert!(matches!(
            store.create_show(&clash).await,
            Err(StoreError::Duplicate(_))
        ));

        // Same instant on another screen is fine
        let other = Show::new(movie.id, "Screen 2".into(), starts_at, 50);
        store.create_show(&other).await.unwrap();
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let store = MemoryStore::new();
        let user = User::new("kaori".into(), "kaori@example.com".into(), "$argon2id$x".into());
        store.create(&user).await.unwrap();

        let dup = User::new("kaori".into(), "other@example.com".into(), "$argon2id$y".into());
        assert!(matches!(store.create(&dup).await, Err(StoreError::Duplicate(_))));

        let found = store.find_by_username("kaori").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn reminder_window_picks_active_bookings_by_show_start() {
        let store = MemoryStore::new();
        let movie = Movie::new("Stray Dog".into(), 122);
        store.create_movie(&movie).await.unwrap();

        let now = Utc::now();
        let tonight = Show::new(movie.id, "Screen 1".into(), now + chrono::Duration::hours(5), 20);
        let tomorrow = Show::new(movie.id, "Screen 2".into(), now + chrono::Duration::hours(20), 20);
        let next_week = Show::new(movie.id, "Screen 3".into(), now + chrono::Duration::days(7), 20);
        for show in [&tonight, &tomorrow, &next_week] {
            store.create_show(show).await.unwrap();
        }

        let soon = Booking::new(Uuid::new_v4(), tonight.id, 4);
        let later = Booking::new(Uuid::new_v4(), tomorrow.id, 4);
        let distant = Booking::new(Uuid::new_v4(), next_week.id, 4);
        let dropped = Booking::new(Uuid::new_v4(), tomorrow.id, 5);
        for booking in [&soon, &later, &distant, &dropped] {
            store.insert_active(booking).await.unwrap();
        }
        store.mark_cancelled(dropped.id).await.unwrap().unwrap();

        let window = store
            .active_starting_within(now, now + chrono::Duration::hours(24))
            .await
            .unwrap();
        let ids: Vec<Uuid> = window.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![soon.id, later.id]);
    }

    #[tokio::test]
    async fn shows_list_in_start_order_and_movies_by_title() {
        let store = MemoryStore::new();
        let movie = Movie::new("Yojimbo".into(), 110);
        store.create_movie(&movie).await.unwrap();
        let earlier = Movie::new("High and Low".into(), 143);
        store.create_movie(&earlier).await.unwrap();

        let base = Utc::now();
        let late = Show::new(movie.id, "Screen 1".into(), base + chrono::Duration::hours(6), 30);
        let soon = Show::new(movie.id, "Screen 1".into(), base, 30);
        store.create_show(&late).await.unwrap();
        store.create_show(&soon).await.unwrap();

        let shows = store.list_shows_for_movie(movie.id).await.unwrap();
        assert_eq!(shows[0].id, soon.id);
        assert_eq!(shows[1].id, late.id);

        let movies = store.list_movies().await.unwrap();
        assert_eq!(movies[0].title, "High and Low");
    }
}
