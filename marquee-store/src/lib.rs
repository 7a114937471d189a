pub mod app_config;
pub mod booking_repo;
pub mod catalog_repo;
pub mod database;
pub mod events;
pub mod memory;
pub mod user_repo;

pub use app_config::Config;
pub use booking_repo::PgBookingStore;
pub use catalog_repo::PgCatalogStore;
pub use database::DbClient;
pub use events::{BookingEvent, BroadcastHook};
pub use memory::MemoryStore;
pub use user_repo::PgUserStore;
