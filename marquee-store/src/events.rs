use async_trait::async_trait;
use marquee_domain::{BookingNotice, NotificationHook, NotifyError};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Event published to mailer subscribers after a booking state change
/// commits.
#[derive(Debug, Clone)]
pub enum BookingEvent {
    Created(BookingNotice),
    Cancelled(BookingNotice),
}

/// Notification hook backed by a broadcast channel. The mailer process
/// subscribes via [`BroadcastHook::subscribe`]; publishing never blocks the
/// booking path, and an empty subscriber list is not an error.
#[derive(Clone)]
pub struct BroadcastHook {
    tx: broadcast::Sender<BookingEvent>,
}

impl BroadcastHook {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.tx.subscribe()
    }

    fn publish(&self, event: BookingEvent) -> Result<(), NotifyError> {
        match self.tx.send(event) {
            Ok(receivers) => {
                debug!(receivers, "booking event published");
                Ok(())
            }
            // send only fails when nobody is subscribed; the hook is
            // best-effort, so that is a logged non-event
            Err(_) => {
                info!("booking event dropped: no mailer subscribed");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl NotificationHook for BroadcastHook {
    async fn booking_created(&self, notice: &BookingNotice) -> Result<(), NotifyError> {
        self.publish(BookingEvent::Created(notice.clone()))
    }

    async fn booking_cancelled(&self, notice: &BookingNotice) -> Result<(), NotifyError> {
        self.publish(BookingEvent::Cancelled(notice.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use marquee_domain::{Booking, Movie, Show};
    use uuid::Uuid;

    fn notice() -> BookingNotice {
        let movie = Movie::new("Seven Samurai".into(), 207);
        let show = Show::new(movie.id, "Screen 1".into(), Utc::now(), 120);
        let booking = Booking::new(Uuid::new_v4(), show.id, 11);
        BookingNotice::new(booking, &show, &movie)
    }

    #[tokio::test]
    async fn subscribers_receive_both_event_kinds() {
        let hook = BroadcastHook::new(8);
        let mut rx = hook.subscribe();

        let n = notice();
        hook.booking_created(&n).await.unwrap();
        hook.booking_cancelled(&n).await.unwrap();

        assert!(matches!(rx.recv().await.unwrap(), BookingEvent::Created(_)));
        match rx.recv().await.unwrap() {
            BookingEvent::Cancelled(got) => {
                assert_eq!(got.booking.id, n.booking.id);
                assert_eq!(got.movie_title, "Seven Samurai");
            }
            other => panic!("expected cancelled event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_not_an_error() {
        let hook = BroadcastHook::new(8);
        hook.booking_created(&notice()).await.unwrap();
    }
}
