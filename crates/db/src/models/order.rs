use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

/// Order projection used by the dispatch flows. The storefront owns order
/// creation; dispatch only reads eligible orders and writes assignments.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub status: OrderStatus,
    pub street: String,
    pub city: String,
    pub region: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub driver_id: Option<Uuid>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivery_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrder {
    pub order_number: String,
    pub customer_name: String,
    pub status: Option<OrderStatus>,
    pub street: String,
    pub city: String,
    pub region: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

const SELECT_COLUMNS: &str = "id, order_number, customer_name, status, street, city, region, \
     latitude, longitude, driver_id, shipped_at, delivery_started_at, created_at, updated_at";

impl Order {
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateOrder,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let status = data.status.clone().unwrap_or_default();
        sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (id, order_number, customer_name, status, street, city, region, latitude, longitude)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(id)
        .bind(&data.order_number)
        .bind(&data.customer_name)
        .bind(status)
        .bind(&data.street)
        .bind(&data.city)
        .bind(&data.region)
        .bind(data.latitude)
        .bind(data.longitude)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {SELECT_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Orders eligible for automatic route planning: unassigned, in an
    /// eligible status, and geocoded. The optimizer cannot accept stops
    /// without coordinates, so the filter lives in the query.
    pub async fn find_routable(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {SELECT_COLUMNS} FROM orders
             WHERE status IN ('confirmed', 'processing')
               AND driver_id IS NULL
               AND latitude IS NOT NULL
               AND longitude IS NOT NULL
             ORDER BY created_at ASC, order_number ASC"
        ))
        .fetch_all(pool)
        .await
    }

    /// All unassigned eligible orders, geocoded or not. Feeds the manual
    /// assignment form, which does not need coordinates.
    pub async fn find_unassigned(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {SELECT_COLUMNS} FROM orders
             WHERE status IN ('confirmed', 'processing')
               AND driver_id IS NULL
             ORDER BY created_at ASC, order_number ASC"
        ))
        .fetch_all(pool)
        .await
    }

    /// A driver's active load: orders they currently have out for delivery.
    pub async fn count_active_for_driver(
        pool: &SqlitePool,
        driver_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM orders WHERE driver_id = $1 AND status = 'shipped'",
        )
        .bind(driver_id)
        .fetch_one(pool)
        .await
    }

    /// Conditional batch assignment. Only rows still matching the eligibility
    /// predicate (unassigned, confirmed/processing) are updated, and the
    /// affected-row count is returned so callers can detect lost races by
    /// comparing it against the number of ids they asked for.
    pub async fn assign_driver(
        pool: &SqlitePool,
        ids: &[Uuid],
        driver_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE orders SET driver_id = ");
        query.push_bind(driver_id);
        query.push(", status = 'shipped', shipped_at = ");
        query.push_bind(now);
        query.push(", delivery_started_at = ");
        query.push_bind(now);
        query.push(", updated_at = ");
        query.push_bind(now);
        query.push(" WHERE id IN (");
        let mut ids_list = query.separated(", ");
        for id in ids {
            ids_list.push_bind(*id);
        }
        query.push(") AND status IN ('confirmed', 'processing') AND driver_id IS NULL");

        let result = query.build().execute(pool).await?;
        Ok(result.rows_affected())
    }
}
