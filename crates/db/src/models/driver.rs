use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
    Delivery,
}

/// Projection of users carrying the delivery role. Dispatch never mutates
/// drivers; their load is derived from the orders table on demand.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
}

/// Driver plus their derived active load, for the admin assignment form.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct DriverWithLoad {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub active_orders: i64,
}

impl Driver {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Driver>(
            "INSERT INTO users (id, name, email, phone, role)
             VALUES ($1, $2, $3, $4, 'delivery')
             RETURNING id, name, phone",
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(phone)
        .fetch_one(pool)
        .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Driver>(
            "SELECT id, name, phone FROM users WHERE role = 'delivery' ORDER BY name ASC",
        )
        .fetch_all(pool)
        .await
    }

    /// Role-checked lookup: a user id without the delivery role resolves to
    /// None, which manual assignment reports as an invalid delivery person.
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Driver>(
            "SELECT id, name, phone FROM users WHERE id = $1 AND role = 'delivery'",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_all_with_load(pool: &SqlitePool) -> Result<Vec<DriverWithLoad>, sqlx::Error> {
        sqlx::query_as::<_, DriverWithLoad>(
            "SELECT u.id, u.name, u.phone,
                    (SELECT COUNT(*) FROM orders o
                      WHERE o.driver_id = u.id AND o.status = 'shipped') AS active_orders
             FROM users u
             WHERE u.role = 'delivery'
             ORDER BY u.name ASC",
        )
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::{
        DBService,
        models::order::{CreateOrder, Order, OrderStatus},
    };

    #[tokio::test]
    async fn test_find_by_id_rejects_non_delivery_roles() {
        let db = DBService::new_in_memory().await.unwrap();

        let admin_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, name, email, role) VALUES ($1, 'Neema', 'neema@romana.example', 'admin')",
        )
        .bind(admin_id)
        .execute(&db.pool)
        .await
        .unwrap();

        let driver = Driver::create(&db.pool, Uuid::new_v4(), "Juma", "juma@romana.example", None)
            .await
            .unwrap();

        assert!(Driver::find_by_id(&db.pool, admin_id).await.unwrap().is_none());
        assert!(Driver::find_by_id(&db.pool, driver.id).await.unwrap().is_some());

        let all = Driver::find_all(&db.pool).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Juma");
    }

    #[tokio::test]
    async fn test_find_all_with_load_counts_shipped_only() {
        let db = DBService::new_in_memory().await.unwrap();
        let driver = Driver::create(&db.pool, Uuid::new_v4(), "Juma", "juma@romana.example", None)
            .await
            .unwrap();

        let order = Order::create(
            &db.pool,
            &CreateOrder {
                order_number: "ORD-20".to_string(),
                customer_name: "Asha Mtui".to_string(),
                status: Some(OrderStatus::Confirmed),
                street: "12 Uhuru St".to_string(),
                city: "Dar es Salaam".to_string(),
                region: "Temeke".to_string(),
                latitude: Some(-6.85),
                longitude: Some(39.26),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let with_load = Driver::find_all_with_load(&db.pool).await.unwrap();
        assert_eq!(with_load[0].active_orders, 0);

        Order::assign_driver(&db.pool, &[order.id], driver.id, Utc::now())
            .await
            .unwrap();

        let with_load = Driver::find_all_with_load(&db.pool).await.unwrap();
        assert_eq!(with_load[0].active_orders, 1);
    }
}
