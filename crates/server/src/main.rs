use std::sync::Arc;

use db::DBService;
use server::AppState;
use services::services::{
    config::Config,
    trip_optimizer::{HttpTripOptimizer, TripOptimizer},
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    utils::log::init("info,sqlx=warn");

    let config = Config::from_env();
    let db = DBService::new(&config.database_url).await?;

    let optimizer = HttpTripOptimizer::from_config(&config)
        .map_err(|e| anyhow::anyhow!("failed to build trip optimizer client: {e}"))?
        .map(|o| Arc::new(o) as Arc<dyn TripOptimizer>);
    if optimizer.is_none() {
        warn!("OPTIMIZER_ACCESS_TOKEN not set; planned routes will use input stop order");
    }
    if config.admin_token.is_none() {
        warn!("ADMIN_TOKEN not set; all admin requests will be rejected");
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState {
        db,
        config: Arc::new(config),
        optimizer,
    };

    let app = server::router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "romana-dispatch listening");
    axum::serve(listener, app).await?;

    Ok(())
}
