// Route exports
pub mod health;
pub mod matches;
pub mod profiles;
pub mod requests;

use crate::core::TutoringService;
use crate::services::{DataStore, SessionResolver};
use actix_web::web;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DataStore>,
    pub sessions: Arc<SessionResolver>,
    pub service: Arc<TutoringService>,
}

impl AppState {
    pub fn new(store: Arc<dyn DataStore>, sessions: Arc<SessionResolver>) -> Self {
        Self {
            service: Arc::new(TutoringService::new(store.clone())),
            store,
            sessions,
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::configure)
            .configure(profiles::configure)
            .configure(requests::configure)
            .configure(matches::configure),
    );
}
