//! End-to-end tests for the admin dispatch endpoints, on an in-memory
//! database with the optimizer left unconfigured (fallback routes).

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use db::{
    DBService,
    models::{
        driver::Driver,
        order::{CreateOrder, Order, OrderStatus},
    },
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use server::AppState;
use services::services::config::Config;
use tower::ServiceExt;
use uuid::Uuid;

const ADMIN_TOKEN: &str = "test-admin";

async fn test_app() -> (Router, DBService) {
    let db = DBService::new_in_memory().await.unwrap();
    let config = Config {
        admin_token: Some(ADMIN_TOKEN.to_string()),
        ..Config::default()
    };
    let state = AppState {
        db: db.clone(),
        config: Arc::new(config),
        optimizer: None,
    };
    (server::router(state), db)
}

async fn seed_orders(db: &DBService, region: &str, count: usize) -> Vec<Order> {
    let mut orders = Vec::new();
    for i in 0..count {
        let order = Order::create(
            &db.pool,
            &CreateOrder {
                order_number: format!("ORD-{region}-{i:02}"),
                customer_name: "Asha Mtui".to_string(),
                status: Some(OrderStatus::Confirmed),
                street: format!("{i} Uhuru St"),
                city: "Dar es Salaam".to_string(),
                region: region.to_string(),
                latitude: Some(-6.79 - i as f64 * 0.01),
                longitude: Some(39.21 + i as f64 * 0.01),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        orders.push(order);
    }
    orders
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-admin-token", ADMIN_TOKEN);
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_admin_guard_rejects_missing_token() {
    let (app, _db) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/admin/assign-deliveries")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_assignment_board_lists_orders_and_personnel() {
    let (app, db) = test_app().await;
    seed_orders(&db, "Kinondoni", 2).await;
    Driver::create(&db.pool, Uuid::new_v4(), "Juma", "juma@romana.example", None)
        .await
        .unwrap();

    let response = app
        .oneshot(request("GET", "/api/admin/assign-deliveries", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["availableOrders"].as_array().unwrap().len(), 2);
    let personnel = body["data"]["deliveryPersonnel"].as_array().unwrap();
    assert_eq!(personnel.len(), 1);
    assert_eq!(personnel[0]["activeOrders"], json!(0));
    // Model fields are camelCase on the wire throughout.
    let first_order = &body["data"]["availableOrders"][0];
    assert!(first_order["orderNumber"].is_string());
    assert!(first_order["driverId"].is_null());
}

#[tokio::test]
async fn test_manual_assignment_rejects_invalid_driver() {
    let (app, db) = test_app().await;
    let orders = seed_orders(&db, "Ilala", 2).await;

    let body = json!({
        "orderIds": [orders[0].id, orders[1].id],
        "deliveryPersonId": Uuid::new_v4(),
    });
    let response = app
        .oneshot(request("PATCH", "/api/admin/assign-deliveries", Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Invalid delivery person"));

    // No side effects.
    assert_eq!(Order::find_unassigned(&db.pool).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_manual_assignment_empty_order_ids_is_a_validation_error() {
    let (app, db) = test_app().await;
    let driver = Driver::create(&db.pool, Uuid::new_v4(), "Juma", "juma@romana.example", None)
        .await
        .unwrap();

    let body = json!({ "orderIds": [], "deliveryPersonId": driver.id });
    let response = app
        .oneshot(request("PATCH", "/api/admin/assign-deliveries", Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_manual_assignment_missing_field_is_a_validation_error() {
    let (app, db) = test_app().await;
    let orders = seed_orders(&db, "Ilala", 1).await;

    // No deliveryPersonId at all: still a 400 in the error envelope, not the
    // extractor's bare 422.
    let body = json!({ "orderIds": [orders[0].id] });
    let response = app
        .oneshot(request("PATCH", "/api/admin/assign-deliveries", Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(false));
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("deliveryPersonId"),
        "message should name the missing field: {}",
        body["message"]
    );
    assert_eq!(Order::find_unassigned(&db.pool).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_manual_assignment_then_repeat_updates_zero() {
    let (app, db) = test_app().await;
    let driver = Driver::create(&db.pool, Uuid::new_v4(), "Juma", "juma@romana.example", None)
        .await
        .unwrap();
    let orders = seed_orders(&db, "Temeke", 2).await;
    let body = json!({
        "orderIds": [orders[0].id, orders[1].id],
        "deliveryPersonId": driver.id,
    });

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            "/api/admin/assign-deliveries",
            Some(body.clone()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let first = json_body(response).await;
    assert_eq!(first["data"]["assignedOrders"], json!(2));

    // Second identical call: preconditions no longer match.
    let response = app
        .oneshot(request("PATCH", "/api/admin/assign-deliveries", Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let second = json_body(response).await;
    assert_eq!(second["data"]["assignedOrders"], json!(0));
}

#[tokio::test]
async fn test_preview_requires_drivers_when_orders_exist() {
    let (app, db) = test_app().await;
    seed_orders(&db, "Kinondoni", 3).await;

    let response = app
        .oneshot(request("POST", "/api/admin/optimize-routes", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["message"], json!("No delivery personnel available"));
}

#[tokio::test]
async fn test_preview_with_no_orders_is_a_success() {
    let (app, _db) = test_app().await;

    let response = app
        .oneshot(request("POST", "/api/admin/optimize-routes", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["summary"]["totalRoutes"], json!(0));
    assert_eq!(body["message"], json!("No orders ready for route planning"));
}

#[tokio::test]
async fn test_preview_returns_fallback_routes_without_committing() {
    let (app, db) = test_app().await;
    seed_orders(&db, "Dar es Salaam Central", 14).await;
    Driver::create(&db.pool, Uuid::new_v4(), "Amani", "amani@romana.example", None)
        .await
        .unwrap();
    Driver::create(&db.pool, Uuid::new_v4(), "Baraka", "baraka@romana.example", None)
        .await
        .unwrap();

    let response = app
        .oneshot(request("POST", "/api/admin/optimize-routes", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let routes = body["data"]["routes"].as_array().unwrap();
    assert_eq!(routes.len(), 2);
    assert_eq!(routes[0]["stops"].as_array().unwrap().len(), 12);
    assert_eq!(routes[1]["stops"].as_array().unwrap().len(), 2);
    // Optimizer unconfigured: zeroed sentinels.
    assert_eq!(routes[0]["totalDistanceMeters"], json!(0));
    assert_eq!(routes[0]["totalDurationMinutes"], json!(0));
    assert_eq!(body["data"]["summary"]["totalOrders"], json!(14));
    assert_eq!(body["data"]["summary"]["driversAssigned"], json!(2));

    // Preview never commits.
    assert_eq!(Order::find_routable(&db.pool).await.unwrap().len(), 14);
}

#[tokio::test]
async fn test_commit_ships_all_orders_across_drivers() {
    let (app, db) = test_app().await;
    seed_orders(&db, "Dar es Salaam Central", 14).await;
    let amani = Driver::create(&db.pool, Uuid::new_v4(), "Amani", "amani@romana.example", None)
        .await
        .unwrap();
    let baraka = Driver::create(&db.pool, Uuid::new_v4(), "Baraka", "baraka@romana.example", None)
        .await
        .unwrap();

    let response = app
        .oneshot(request("PATCH", "/api/admin/optimize-routes", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["summary"]["totalOrders"], json!(14));
    assert_eq!(body["data"]["summary"]["totalRoutes"], json!(2));
    assert_eq!(body["data"]["summary"]["driversAssigned"], json!(2));
    assert_eq!(body["data"]["conflicts"].as_array().unwrap().len(), 0);

    assert_eq!(
        Order::count_active_for_driver(&db.pool, amani.id)
            .await
            .unwrap(),
        12
    );
    assert_eq!(
        Order::count_active_for_driver(&db.pool, baraka.id)
            .await
            .unwrap(),
        2
    );
    assert!(Order::find_routable(&db.pool).await.unwrap().is_empty());
}
