use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use marquee_api::{app, state::AuthConfig, AppState};
use marquee_engine::ReservationEngine;
use marquee_store::{BookingEvent, BroadcastHook, DbClient, PgBookingStore, PgCatalogStore, PgUserStore};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = marquee_store::Config::load().context("Failed to load config")?;
    tracing::info!("Starting Marquee API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let hook = BroadcastHook::new(config.notifications.channel_capacity);
    spawn_notice_logger(&hook);

    let catalog = Arc::new(PgCatalogStore::new(db.pool.clone()));
    let bookings = Arc::new(PgBookingStore::new(db.pool.clone()));
    let users = Arc::new(PgUserStore::new(db.pool.clone()));

    let engine = ReservationEngine::new(catalog.clone(), bookings, Arc::new(hook));

    let app_state = AppState {
        engine,
        catalog,
        users,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
            min_password_length: config.auth.min_password_length,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind listener")?;
    axum::serve(listener, app.into_make_service())
        .await
        .context("Server error")?;

    Ok(())
}

/// The mailer consumes booking events from the broadcast channel out of
/// process; until one is attached, keep an in-process subscriber that logs
/// every event so state changes are observable.
fn spawn_notice_logger(hook: &BroadcastHook) {
    let mut rx = hook.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(BookingEvent::Created(n)) => tracing::info!(
                    booking_id = %n.booking.id,
                    movie = %n.movie_title,
                    screen = %n.screen_name,
                    seat = n.booking.seat_number,
                    "booking created"
                ),
                Ok(BookingEvent::Cancelled(n)) => tracing::info!(
                    booking_id = %n.booking.id,
                    movie = %n.movie_title,
                    "booking cancelled"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notice logger lagged behind")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
