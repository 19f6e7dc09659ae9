pub mod auth;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::{Router, middleware};
use db::DBService;
use services::services::{config::Config, trip_optimizer::TripOptimizer};

#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub config: Arc<Config>,
    /// None when no optimizer access token is configured; planning then
    /// always produces fallback routes.
    pub optimizer: Option<Arc<dyn TripOptimizer>>,
}

pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .merge(routes::optimize_routes::router())
        .merge(routes::assign_deliveries::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new().nest("/api/admin", admin).with_state(state)
}
