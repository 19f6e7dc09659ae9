//! Driver assignment: greedy load balancing for planned routes, plus the
//! explicit manual-assignment path used by the admin form.

use chrono::Utc;
use db::models::{driver::Driver, order::Order};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{error, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::route_planner::PlannedRoute;

#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("no delivery personnel available")]
    NoDriversAvailable,
    #[error("invalid delivery person")]
    InvalidDriver,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A route successfully committed to a driver.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RouteAssignment {
    pub route_id: String,
    pub region: String,
    pub driver_id: Uuid,
    pub driver_name: String,
    pub order_count: usize,
}

/// A route whose commit did not cover every order: either a concurrent
/// invocation won some of the rows, or the update itself failed.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RouteConflict {
    pub route_id: String,
    pub region: String,
    pub orders_requested: usize,
    pub orders_updated: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOutcome {
    pub assigned: Vec<RouteAssignment>,
    pub conflicts: Vec<RouteConflict>,
}

pub struct AssignmentService;

impl AssignmentService {
    /// Commit each planned route to the currently least-loaded driver.
    ///
    /// Loads are recounted before every route, so a driver picked for an
    /// earlier route weighs heavier for the next one. This is a sequence of
    /// locally greedy choices, deliberately not a global optimum.
    pub async fn assign_routes(
        pool: &SqlitePool,
        routes: &[PlannedRoute],
        drivers: &[Driver],
    ) -> Result<AssignmentOutcome, AssignmentError> {
        if drivers.is_empty() {
            return Err(AssignmentError::NoDriversAvailable);
        }

        let mut assigned = Vec::new();
        let mut conflicts = Vec::new();

        for route in routes {
            if route.stops.is_empty() {
                continue;
            }

            let driver = Self::least_loaded(pool, drivers).await?;
            let order_ids = route.order_ids();

            match Order::assign_driver(pool, &order_ids, driver.id, Utc::now()).await {
                Ok(updated) if updated == order_ids.len() as u64 => {
                    info!(
                        route_id = %route.id,
                        driver = %driver.name,
                        orders = order_ids.len(),
                        "route assigned"
                    );
                    assigned.push(RouteAssignment {
                        route_id: route.id.clone(),
                        region: route.region.clone(),
                        driver_id: driver.id,
                        driver_name: driver.name.clone(),
                        order_count: order_ids.len(),
                    });
                }
                Ok(updated) => {
                    // Lost race: some orders no longer matched the
                    // unassigned/eligible predicate when the update ran.
                    warn!(
                        route_id = %route.id,
                        requested = order_ids.len(),
                        updated,
                        "route assignment only partially applied"
                    );
                    conflicts.push(RouteConflict {
                        route_id: route.id.clone(),
                        region: route.region.clone(),
                        orders_requested: order_ids.len(),
                        orders_updated: updated,
                        reason: "some orders were already assigned or no longer eligible"
                            .to_string(),
                    });
                }
                Err(e) => {
                    error!(route_id = %route.id, error = %e, "route assignment failed");
                    conflicts.push(RouteConflict {
                        route_id: route.id.clone(),
                        region: route.region.clone(),
                        orders_requested: order_ids.len(),
                        orders_updated: 0,
                        reason: format!("update failed: {e}"),
                    });
                }
            }
        }

        Ok(AssignmentOutcome {
            assigned,
            conflicts,
        })
    }

    /// Tentative, non-mutating pass for the preview endpoint: fills in
    /// `driver_id` round-robin over drivers ordered by current load.
    pub async fn preview_assignments(
        pool: &SqlitePool,
        mut routes: Vec<PlannedRoute>,
        drivers: &[Driver],
    ) -> Result<Vec<PlannedRoute>, AssignmentError> {
        if drivers.is_empty() {
            return Err(AssignmentError::NoDriversAvailable);
        }

        let mut by_load: Vec<(i64, &Driver)> = Vec::with_capacity(drivers.len());
        for driver in drivers {
            let load = Order::count_active_for_driver(pool, driver.id).await?;
            by_load.push((load, driver));
        }
        by_load.sort_by_key(|(load, _)| *load);

        for (i, route) in routes.iter_mut().enumerate() {
            route.driver_id = Some(by_load[i % by_load.len()].1.id);
        }
        Ok(routes)
    }

    /// Explicit assignment of chosen orders to one chosen driver. Orders that
    /// no longer match the eligibility predicate are skipped, not an error;
    /// the returned count says how many were actually updated.
    pub async fn assign_manual(
        pool: &SqlitePool,
        order_ids: &[Uuid],
        driver_id: Uuid,
    ) -> Result<u64, AssignmentError> {
        let driver = Driver::find_by_id(pool, driver_id)
            .await?
            .ok_or(AssignmentError::InvalidDriver)?;

        let updated = Order::assign_driver(pool, order_ids, driver.id, Utc::now()).await?;
        info!(
            driver = %driver.name,
            requested = order_ids.len(),
            updated,
            "manual assignment applied"
        );
        Ok(updated)
    }

    /// Fresh per-route load counts; stable tie-break on the input driver
    /// order.
    async fn least_loaded<'a>(
        pool: &SqlitePool,
        drivers: &'a [Driver],
    ) -> Result<&'a Driver, AssignmentError> {
        let mut best: Option<(i64, &Driver)> = None;
        for driver in drivers {
            let load = Order::count_active_for_driver(pool, driver.id).await?;
            if best.is_none_or(|(min, _)| load < min) {
                best = Some((load, driver));
            }
        }
        best.map(|(_, d)| d)
            .ok_or(AssignmentError::NoDriversAvailable)
    }
}
