use std::sync::Arc;

use marquee_domain::repository::{CatalogStore, UserStore};
use marquee_engine::ReservationEngine;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
    pub min_password_length: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: ReservationEngine,
    pub catalog: Arc<dyn CatalogStore>,
    pub users: Arc<dyn UserStore>,
    pub auth: AuthConfig,
}
