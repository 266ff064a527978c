use std::collections::HashMap;

use async_trait::async_trait;
use deadpool_postgres::{Client, Pool};
use model::{NewOrder, Order, Payment, PaymentStatus};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;
use tracing::debug;

use crate::payments::PgPaymentsRepository;
use crate::services::{SERVICE_COLUMNS, service_from_row};
use crate::{RepositoryError, profile_columns, profile_from_row};

/// # OrdersRepository
///
/// Repository interface for orders and their service links.
///
/// Orders are loaded with their services and a profile of the customer.
/// Cancelled (soft-deleted) orders are invisible to every method.
#[async_trait]
pub trait OrdersRepository: Send + Sync {
    /// Orders placed by a customer.
    async fn list_for_customer(&self, customer_id: i64) -> Result<Vec<Order>, RepositoryError>;

    /// Orders booking at least one service owned by `provider_id`, excluding
    /// those the provider placed.
    async fn list_for_provider(&self, provider_id: i64) -> Result<Vec<Order>, RepositoryError>;

    async fn find(&self, id: i64) -> Result<Option<Order>, RepositoryError>;

    /// Insert an order and its service links in one transaction.
    async fn insert(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    /// Mark the order accepted and open a pending payment of `amount`.
    ///
    /// Both writes happen in one transaction, and only when the order was not
    /// accepted yet. Returns `None` when another request accepted it first.
    async fn accept(&self, id: i64, amount: f64) -> Result<Option<Payment>, RepositoryError>;

    /// Undo [`accept`](Self::accept) while its payment is still pending and
    /// the order is not completed. Returns `false` when nothing was reverted.
    async fn revert_accept(&self, id: i64) -> Result<bool, RepositoryError>;

    /// Mark an accepted order completed. Returns `false` when nothing changed.
    async fn complete(&self, id: i64) -> Result<bool, RepositoryError>;

    /// Soft delete. Returns `false` when nothing was deleted.
    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;
}

/// PostgreSQL implementation of the OrdersRepository trait.
pub struct PgOrdersRepository {
    pool: Pool,
}

impl PgOrdersRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Load the orders matching `filter` together with their services.
    async fn load(
        client: &Client,
        filter: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Order>, RepositoryError> {
        let query = format!(
            r#"
            SELECT o.id, o.user_id, o.provider_id, o.is_accepted, o.is_completed,
                   o.date_of_event, o.first_name, o.last_name, o.phone, o.email,
                   o.address, o.note, o.created_at, {}
            FROM orders o
            JOIN users u ON u.id = o.user_id
            WHERE o.deleted_at IS NULL AND {filter}
            ORDER BY o.id
            "#,
            profile_columns("u", "customer")
        );
        let rows = client.query(&query, params).await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            orders.push(order_from_row(row)?);
        }
        if orders.is_empty() {
            return Ok(orders);
        }

        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let query = format!(
            r#"
            SELECT os.order_id, {SERVICE_COLUMNS}
            FROM order_services os
            JOIN services s ON s.id = os.service_id
            WHERE os.order_id = ANY($1)
            ORDER BY os.order_id, s.id
            "#
        );
        let rows = client.query(&query, &[&ids]).await?;

        let mut by_order: HashMap<i64, Vec<model::Service>> = HashMap::new();
        for row in &rows {
            let order_id: i64 = row.try_get("order_id")?;
            by_order
                .entry(order_id)
                .or_default()
                .push(service_from_row(row)?);
        }
        for order in &mut orders {
            order.services = by_order.remove(&order.id).unwrap_or_default();
        }

        Ok(orders)
    }
}

fn order_from_row(row: &Row) -> Result<Order, tokio_postgres::Error> {
    let customer_id: i64 = row.try_get("user_id")?;
    Ok(Order {
        id: row.try_get("id")?,
        customer_id,
        provider_id: row.try_get("provider_id")?,
        is_accepted: row.try_get("is_accepted")?,
        is_completed: row.try_get("is_completed")?,
        date_of_event: row.try_get("date_of_event")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        address: row.try_get("address")?,
        note: row.try_get("note")?,
        created_at: row.try_get("created_at")?,
        customer: Some(profile_from_row(row, customer_id, "customer")?),
        services: Vec::new(),
    })
}

#[async_trait]
impl OrdersRepository for PgOrdersRepository {
    async fn list_for_customer(&self, customer_id: i64) -> Result<Vec<Order>, RepositoryError> {
        let client = self.pool.get().await?;
        Self::load(&client, "o.user_id = $1", &[&customer_id]).await
    }

    async fn list_for_provider(&self, provider_id: i64) -> Result<Vec<Order>, RepositoryError> {
        let client = self.pool.get().await?;
        let filter = r#"
            o.user_id <> $1
            AND o.id IN (
                SELECT DISTINCT os.order_id
                FROM order_services os
                JOIN services s ON s.id = os.service_id
                WHERE s.user_id = $1
            )
        "#;
        Self::load(&client, filter, &[&provider_id]).await
    }

    async fn find(&self, id: i64) -> Result<Option<Order>, RepositoryError> {
        let client = self.pool.get().await?;
        let mut orders = Self::load(&client, "o.id = $1", &[&id]).await?;
        Ok(orders.pop())
    }

    async fn insert(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let row = tx
            .query_one(
                r#"
                INSERT INTO orders (user_id, provider_id, date_of_event, first_name,
                                    last_name, phone, email, address, note)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING id
                "#,
                &[
                    &order.customer_id,
                    &order.provider_id,
                    &order.date_of_event,
                    &order.first_name,
                    &order.last_name,
                    &order.phone,
                    &order.email,
                    &order.address,
                    &order.note,
                ],
            )
            .await?;
        let id: i64 = row.try_get("id")?;

        tx.execute(
            r#"
            INSERT INTO order_services (order_id, service_id)
            SELECT $1, unnest($2::BIGINT[])
            "#,
            &[&id, &order.service_ids],
        )
        .await?;

        tx.commit().await?;
        debug!(order_id = id, services = order.service_ids.len(), "order inserted");

        let mut orders = Self::load(&client, "o.id = $1", &[&id]).await?;
        orders.pop().ok_or(RepositoryError::NotFound)
    }

    async fn accept(&self, id: i64, amount: f64) -> Result<Option<Payment>, RepositoryError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let updated = tx
            .execute(
                r#"
                UPDATE orders SET is_accepted = TRUE, updated_at = now()
                WHERE id = $1 AND deleted_at IS NULL AND NOT is_accepted
                "#,
                &[&id],
            )
            .await?;
        if updated == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let payment = PgPaymentsRepository::insert_tx(&tx, id, amount).await?;
        tx.commit().await?;

        Ok(Some(payment))
    }

    async fn revert_accept(&self, id: i64) -> Result<bool, RepositoryError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let updated = tx
            .execute(
                r#"
                UPDATE orders SET is_accepted = FALSE, updated_at = now()
                WHERE id = $1 AND deleted_at IS NULL AND is_accepted AND NOT is_completed
                "#,
                &[&id],
            )
            .await?;
        let removed = tx
            .execute(
                "DELETE FROM payments WHERE order_id = $1 AND status = $2",
                &[&id, &PaymentStatus::Pending],
            )
            .await?;
        if updated == 0 || removed == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        debug!(order_id = id, "accept reverted");
        Ok(true)
    }

    async fn complete(&self, id: i64) -> Result<bool, RepositoryError> {
        let client = self.pool.get().await?;
        let updated = client
            .execute(
                r#"
                UPDATE orders SET is_completed = TRUE, updated_at = now()
                WHERE id = $1 AND deleted_at IS NULL AND is_accepted AND NOT is_completed
                "#,
                &[&id],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute(
                "UPDATE orders SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
                &[&id],
            )
            .await?;
        Ok(deleted > 0)
    }
}
