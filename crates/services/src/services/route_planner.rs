//! Region-based delivery route planning.
//!
//! Orders are partitioned by their address region (exact string match),
//! chunked to the external API's stop limit, and each chunk is run through
//! the trip optimizer. A chunk whose optimization fails still becomes a
//! route, in input order, with zeroed distance/duration.

use std::sync::Arc;

use db::models::order::Order;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    geo::Coordinates,
    trip_optimizer::TripOptimizer,
};

/// Hard limit of the external optimization API.
pub const MAX_STOPS_PER_ROUTE: usize = 12;

/// One order's delivery location within a planned route.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub order_id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub address: String,
    pub coordinates: Coordinates,
}

impl Stop {
    fn from_order(order: &Order) -> Option<Self> {
        let coordinates = Coordinates::new(order.latitude?, order.longitude?)?;
        Some(Self {
            order_id: order.id,
            order_number: order.order_number.clone(),
            customer_name: order.customer_name.clone(),
            address: format!("{}, {}", order.street, order.city),
            coordinates,
        })
    }
}

/// Ephemeral planning output; recomputed from live order state on every
/// invocation and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PlannedRoute {
    pub id: String,
    pub region: String,
    pub stops: Vec<Stop>,
    pub driver_id: Option<Uuid>,
    /// 0 when optimization was unavailable: "unknown", not a claim of zero.
    pub total_distance_meters: i64,
    /// 0 when optimization was unavailable.
    pub total_duration_minutes: i64,
}

impl PlannedRoute {
    pub fn order_ids(&self) -> Vec<Uuid> {
        self.stops.iter().map(|s| s.order_id).collect()
    }
}

pub struct RoutePlanner {
    depot: Coordinates,
    optimizer: Option<Arc<dyn TripOptimizer>>,
}

impl RoutePlanner {
    pub fn new(depot: Coordinates, optimizer: Option<Arc<dyn TripOptimizer>>) -> Self {
        Self { depot, optimizer }
    }

    /// Plan routes for the given eligible orders. Input order is preserved
    /// within each region group; every order with coordinates lands in
    /// exactly one route regardless of optimizer health.
    pub async fn plan(&self, orders: &[Order]) -> Vec<PlannedRoute> {
        let mut groups: Vec<(String, Vec<Stop>)> = Vec::new();
        for order in orders {
            let Some(stop) = Stop::from_order(order) else {
                debug!(order_id = %order.id, "skipping order without usable coordinates");
                continue;
            };
            match groups.iter_mut().find(|(region, _)| *region == order.region) {
                Some((_, stops)) => stops.push(stop),
                None => groups.push((order.region.clone(), vec![stop])),
            }
        }

        let mut routes = Vec::new();
        for (region, stops) in groups {
            for (index, chunk) in stops.chunks(MAX_STOPS_PER_ROUTE).enumerate() {
                let id = format!("route-{}-{}", region, index + 1);
                routes.push(self.build_route(id, &region, chunk).await);
            }
        }
        routes
    }

    async fn build_route(&self, id: String, region: &str, chunk: &[Stop]) -> PlannedRoute {
        if let Some(trip) = self.optimize_chunk(&id, chunk).await {
            let stops = trip
                .visit_order
                .iter()
                .map(|&i| chunk[i].clone())
                .collect();
            return PlannedRoute {
                id,
                region: region.to_string(),
                stops,
                driver_id: None,
                total_distance_meters: trip.total_distance_meters.round() as i64,
                total_duration_minutes: (trip.total_duration_seconds / 60.0).round() as i64,
            };
        }

        // Fallback: input order, zeroed estimates. The straight-line span is
        // logged for dispatch visibility but never reported as a distance.
        debug!(
            route_id = %id,
            span_meters = fallback_span_meters(self.depot, chunk).round(),
            "route not optimized, stops kept in input order"
        );
        PlannedRoute {
            id,
            region: region.to_string(),
            stops: chunk.to_vec(),
            driver_id: None,
            total_distance_meters: 0,
            total_duration_minutes: 0,
        }
    }

    async fn optimize_chunk(
        &self,
        route_id: &str,
        chunk: &[Stop],
    ) -> Option<super::trip_optimizer::OptimizedTrip> {
        let optimizer = self.optimizer.as_ref()?;
        let coords: Vec<Coordinates> = chunk.iter().map(|s| s.coordinates).collect();

        let trip = match optimizer.optimize(self.depot, &coords).await {
            Ok(Some(trip)) => trip,
            Ok(None) => {
                debug!(route_id, "optimizer returned no trip, using input order");
                return None;
            }
            Err(e) => {
                warn!(route_id, error = %e, "trip optimization failed, using input order");
                return None;
            }
        };

        if !is_permutation(&trip.visit_order, chunk.len()) {
            warn!(
                route_id,
                ?trip.visit_order,
                "optimizer returned an invalid visiting order, using input order"
            );
            return None;
        }
        Some(trip)
    }
}

/// Straight-line length of an unoptimized route: depot through the stops in
/// input order.
fn fallback_span_meters(depot: Coordinates, stops: &[Stop]) -> f64 {
    let mut span = 0.0;
    let mut previous = depot;
    for stop in stops {
        span += previous.haversine_meters(&stop.coordinates);
        previous = stop.coordinates;
    }
    span
}

/// The visiting order must be a bijection over the chunk, otherwise reordering
/// would drop or duplicate stops.
fn is_permutation(visit_order: &[usize], len: usize) -> bool {
    if visit_order.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    for &i in visit_order {
        if i >= len || seen[i] {
            return false;
        }
        seen[i] = true;
    }
    true
}
