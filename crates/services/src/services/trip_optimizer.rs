//! HTTP client for the external trip-optimization service.
//!
//! One attempt per call, no retry: planning treats any failure here as
//! "optimizer unavailable" and falls back to input-order routes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use super::{config::Config, geo::Coordinates};

#[derive(Debug, Clone, Error)]
pub enum TripOptimizerError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("json error: {0}")]
    Serde(String),
}

/// Optimized visiting order for one chunk of stops. `visit_order` indexes
/// into the submitted stops; depot legs are already excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedTrip {
    pub visit_order: Vec<usize>,
    pub total_distance_meters: f64,
    pub total_duration_seconds: f64,
}

/// Seam between planning and the external service, so tests can substitute
/// failing or reordering fakes.
#[async_trait]
pub trait TripOptimizer: Send + Sync {
    /// `Ok(None)` means the service answered but produced no usable trip;
    /// callers treat it exactly like an error, minus the log noise.
    async fn optimize(
        &self,
        depot: Coordinates,
        stops: &[Coordinates],
    ) -> Result<Option<OptimizedTrip>, TripOptimizerError>;
}

#[derive(Debug, Clone)]
pub struct HttpTripOptimizer {
    http: Client,
    base_url: String,
    access_token: String,
}

impl HttpTripOptimizer {
    /// Returns `Ok(None)` when no access token is configured: the service is
    /// simply unavailable, not misconfigured enough to refuse startup.
    pub fn from_config(config: &Config) -> Result<Option<Self>, TripOptimizerError> {
        let Some(token) = config.optimizer_access_token.clone() else {
            return Ok(None);
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(config.optimizer_timeout_secs))
            .user_agent(concat!("romana-dispatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TripOptimizerError::Transport(e.to_string()))?;

        Ok(Some(Self {
            http,
            base_url: config.optimizer_base_url.trim_end_matches('/').to_string(),
            access_token: token,
        }))
    }
}

#[async_trait]
impl TripOptimizer for HttpTripOptimizer {
    async fn optimize(
        &self,
        depot: Coordinates,
        stops: &[Coordinates],
    ) -> Result<Option<OptimizedTrip>, TripOptimizerError> {
        if stops.is_empty() {
            return Ok(None);
        }

        let mut coords = Vec::with_capacity(stops.len() + 1);
        coords.push(depot.lng_lat_pair());
        coords.extend(stops.iter().map(Coordinates::lng_lat_pair));

        let url = format!(
            "{}/optimized-trips/v1/mapbox/driving/{}",
            self.base_url,
            coords.join(";")
        );

        let res = self
            .http
            .get(url)
            .query(&[
                ("roundtrip", "true"),
                ("source", "first"),
                ("destination", "first"),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let body: OptimizedTripsResponse = match res.status() {
            s if s.is_success() => res
                .json()
                .await
                .map_err(|e| TripOptimizerError::Serde(e.to_string()))?,
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                return Err(TripOptimizerError::Http { status, body });
            }
        };

        if body.code != "Ok" {
            return Ok(None);
        }
        let Some(trip) = body.trips.first() else {
            return Ok(None);
        };
        let Some(visit_order) = visit_order_from_waypoints(&body.waypoints, stops.len()) else {
            return Ok(None);
        };

        Ok(Some(OptimizedTrip {
            visit_order,
            total_distance_meters: trip.distance,
            total_duration_seconds: trip.duration,
        }))
    }
}

/// Waypoints come back in submission order (depot first); `waypoint_index` is
/// each one's position within the optimized trip. Skip the depot and sort
/// stop indices by trip position.
fn visit_order_from_waypoints(waypoints: &[Waypoint], stop_count: usize) -> Option<Vec<usize>> {
    if waypoints.len() != stop_count + 1 {
        return None;
    }

    let mut positions: Vec<(usize, usize)> = waypoints
        .iter()
        .enumerate()
        .skip(1)
        .map(|(submitted, wp)| (wp.waypoint_index, submitted - 1))
        .collect();
    positions.sort_by_key(|(trip_pos, _)| *trip_pos);

    Some(positions.into_iter().map(|(_, stop)| stop).collect())
}

fn map_reqwest_error(e: reqwest::Error) -> TripOptimizerError {
    if e.is_timeout() {
        TripOptimizerError::Timeout
    } else {
        TripOptimizerError::Transport(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct OptimizedTripsResponse {
    code: String,
    #[serde(default)]
    trips: Vec<Trip>,
    #[serde(default)]
    waypoints: Vec<Waypoint>,
}

#[derive(Debug, Deserialize)]
struct Trip {
    distance: f64,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct Waypoint {
    waypoint_index: usize,
}
