//! Environment-driven service configuration.

use tracing::warn;

use super::geo::Coordinates;

/// Romana dispatch warehouse, Dar es Salaam. Overridable per deployment via
/// `DEPOT_LATITUDE` / `DEPOT_LONGITUDE`.
const DEFAULT_DEPOT: Coordinates = Coordinates {
    latitude: -6.7924,
    longitude: 39.2083,
};

const DEFAULT_OPTIMIZER_BASE_URL: &str = "https://api.mapbox.com";
const DEFAULT_OPTIMIZER_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Fixed dispatch location used as the first/last leg of every trip.
    pub depot: Coordinates,
    pub optimizer_base_url: String,
    /// When unset, route optimization is disabled and planning falls back to
    /// input-order routes.
    pub optimizer_access_token: Option<String>,
    pub optimizer_timeout_secs: u64,
    /// Stand-in for the admin session collaborator: requests must present
    /// this value in `x-admin-token`. Unset means every request is rejected.
    pub admin_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let depot = match (env_f64("DEPOT_LATITUDE"), env_f64("DEPOT_LONGITUDE")) {
            (Some(lat), Some(lng)) => match Coordinates::new(lat, lng) {
                Some(depot) => depot,
                None => {
                    warn!(lat, lng, "depot coordinates out of range, using default depot");
                    DEFAULT_DEPOT
                }
            },
            (None, None) => DEFAULT_DEPOT,
            _ => {
                warn!("only one of DEPOT_LATITUDE/DEPOT_LONGITUDE set, using default depot");
                DEFAULT_DEPOT
            }
        };

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://romana.db".to_string()),
            depot,
            optimizer_base_url: std::env::var("OPTIMIZER_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPTIMIZER_BASE_URL.to_string()),
            optimizer_access_token: std::env::var("OPTIMIZER_ACCESS_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            optimizer_timeout_secs: std::env::var("OPTIMIZER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_OPTIMIZER_TIMEOUT_SECS),
            admin_token: std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            database_url: "sqlite://romana.db".to_string(),
            depot: DEFAULT_DEPOT,
            optimizer_base_url: DEFAULT_OPTIMIZER_BASE_URL.to_string(),
            optimizer_access_token: None,
            optimizer_timeout_secs: DEFAULT_OPTIMIZER_TIMEOUT_SECS,
            admin_token: None,
        }
    }
}

fn env_f64(name: &str) -> Option<f64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
