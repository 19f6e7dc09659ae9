//! Routes for the manual assignment form.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    driver::{Driver, DriverWithLoad},
    order::Order,
};
use serde::{Deserialize, Serialize};
use services::services::assignment::AssignmentService;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct AssignDeliveriesRequest {
    pub order_ids: Vec<Uuid>,
    pub delivery_person_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct AssignDeliveriesResponse {
    /// May be lower than the number of requested ids when some orders no
    /// longer matched the eligibility precondition.
    pub assigned_orders: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentBoardResponse {
    pub available_orders: Vec<Order>,
    pub delivery_personnel: Vec<DriverWithLoad>,
}

/// Unassigned orders and delivery personnel (with live load) for the form.
pub async fn get_assignment_board(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<AssignmentBoardResponse>>, ApiError> {
    let available_orders = Order::find_unassigned(&state.db.pool).await?;
    let delivery_personnel = Driver::find_all_with_load(&state.db.pool).await?;

    Ok(ResponseJson(ApiResponse::success(AssignmentBoardResponse {
        available_orders,
        delivery_personnel,
    })))
}

/// Assign the chosen orders to one chosen driver.
///
/// The request body is validated by hand so a missing or malformed field
/// comes back as a 400 in the usual error envelope, not the extractor's
/// plain-text 422.
pub async fn assign_deliveries(
    State(state): State<AppState>,
    payload: Result<Json<AssignDeliveriesRequest>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<AssignDeliveriesResponse>>, ApiError> {
    let Json(body) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    if body.order_ids.is_empty() {
        return Err(ApiError::BadRequest("orderIds is required".to_string()));
    }

    let assigned_orders = AssignmentService::assign_manual(
        &state.db.pool,
        &body.order_ids,
        body.delivery_person_id,
    )
    .await?;

    Ok(ResponseJson(ApiResponse::success_with_message(
        AssignDeliveriesResponse { assigned_orders },
        format!("Assigned {assigned_orders} order(s) for delivery"),
    )))
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/assign-deliveries",
        get(get_assignment_board).patch(assign_deliveries),
    )
}
