//! Routes for automatic route planning and assignment.

use std::collections::HashSet;

use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::post,
};
use db::models::{driver::Driver, order::Order};
use serde::{Deserialize, Serialize};
use services::services::{
    assignment::{AssignmentService, RouteAssignment, RouteConflict},
    route_planner::{PlannedRoute, RoutePlanner},
};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub total_orders: usize,
    pub total_routes: usize,
    pub drivers_assigned: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRoutesResponse {
    pub routes: Vec<PlannedRoute>,
    pub summary: RouteSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CommitRoutesResponse {
    pub assignments: Vec<RouteAssignment>,
    pub conflicts: Vec<RouteConflict>,
    pub summary: RouteSummary,
}

/// Plan routes and tentatively spread them over drivers, without committing
/// anything.
pub async fn preview_routes(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<OptimizeRoutesResponse>>, ApiError> {
    let orders = Order::find_routable(&state.db.pool).await?;
    if orders.is_empty() {
        return Ok(ResponseJson(ApiResponse::success_with_message(
            OptimizeRoutesResponse {
                routes: Vec::new(),
                summary: RouteSummary::default(),
            },
            "No orders ready for route planning",
        )));
    }

    let drivers = Driver::find_all(&state.db.pool).await?;
    let planner = RoutePlanner::new(state.config.depot, state.optimizer.clone());
    let routes = planner.plan(&orders).await;
    let routes = AssignmentService::preview_assignments(&state.db.pool, routes, &drivers).await?;

    let summary = preview_summary(orders.len(), &routes);
    let message = format!(
        "Planned {} route(s) covering {} order(s)",
        summary.total_routes, summary.total_orders
    );
    Ok(ResponseJson(ApiResponse::success_with_message(
        OptimizeRoutesResponse { routes, summary },
        message,
    )))
}

/// Plan routes and immediately commit the balanced assignment.
pub async fn commit_routes(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<CommitRoutesResponse>>, ApiError> {
    let orders = Order::find_routable(&state.db.pool).await?;
    if orders.is_empty() {
        return Ok(ResponseJson(ApiResponse::success_with_message(
            CommitRoutesResponse {
                assignments: Vec::new(),
                conflicts: Vec::new(),
                summary: RouteSummary::default(),
            },
            "No orders ready for route planning",
        )));
    }

    let drivers = Driver::find_all(&state.db.pool).await?;
    let planner = RoutePlanner::new(state.config.depot, state.optimizer.clone());
    let routes = planner.plan(&orders).await;

    let outcome = AssignmentService::assign_routes(&state.db.pool, &routes, &drivers).await?;

    let drivers_assigned = outcome
        .assigned
        .iter()
        .map(|a| a.driver_id)
        .collect::<HashSet<_>>()
        .len();
    let summary = RouteSummary {
        total_orders: outcome.assigned.iter().map(|a| a.order_count).sum(),
        total_routes: outcome.assigned.len(),
        drivers_assigned,
    };
    let message = if outcome.conflicts.is_empty() {
        format!(
            "Assigned {} route(s) across {} driver(s)",
            summary.total_routes, summary.drivers_assigned
        )
    } else {
        format!(
            "Assigned {} route(s), {} route(s) had conflicts",
            summary.total_routes,
            outcome.conflicts.len()
        )
    };

    Ok(ResponseJson(ApiResponse::success_with_message(
        CommitRoutesResponse {
            assignments: outcome.assigned,
            conflicts: outcome.conflicts,
            summary,
        },
        message,
    )))
}

fn preview_summary(total_orders: usize, routes: &[PlannedRoute]) -> RouteSummary {
    let drivers_assigned = routes
        .iter()
        .filter_map(|r| r.driver_id)
        .collect::<HashSet<_>>()
        .len();
    RouteSummary {
        total_orders,
        total_routes: routes.len(),
        drivers_assigned,
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/optimize-routes",
        post(preview_routes).patch(commit_routes),
    )
}
