use async_trait::async_trait;
use deadpool_postgres::{Pool, Transaction};
use model::{Payment, PaymentStatus};
use tokio_postgres::Row;
use tracing::info;

use crate::RepositoryError;

/// # PaymentsRepository
///
/// Repository interface for order payments. Payments are created by
/// [`crate::OrdersRepository::accept`]; this trait only reads and settles them.
#[async_trait]
pub trait PaymentsRepository: Send + Sync {
    async fn find_by_order_id(&self, order_id: i64) -> Result<Option<Payment>, RepositoryError>;

    async fn find_by_order_ids(&self, order_ids: &[i64]) -> Result<Vec<Payment>, RepositoryError>;

    /// Apply a final status to a still-pending payment.
    ///
    /// A failed payment also cancels its order in the same transaction.
    /// Returns `None` when the payment was no longer pending, so repeated
    /// notifications change nothing.
    async fn settle(
        &self,
        order_id: i64,
        status: PaymentStatus,
    ) -> Result<Option<Payment>, RepositoryError>;
}

/// PostgreSQL implementation of the PaymentsRepository trait.
pub struct PgPaymentsRepository {
    pool: Pool,
}

const PAYMENT_COLUMNS: &str = "id, order_id, amount, status, created_at, updated_at";

fn payment_from_row(row: &Row) -> Result<Payment, tokio_postgres::Error> {
    Ok(Payment {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        amount: row.try_get("amount")?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl PgPaymentsRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Insert a pending payment inside an existing transaction.
    pub async fn insert_tx(
        tx: &Transaction<'_>,
        order_id: i64,
        amount: f64,
    ) -> Result<Payment, RepositoryError> {
        let query = format!(
            r#"
            INSERT INTO payments (order_id, amount, status)
            VALUES ($1, $2, $3)
            RETURNING {PAYMENT_COLUMNS}
            "#
        );
        let row = tx
            .query_one(&query, &[&order_id, &amount, &PaymentStatus::Pending])
            .await?;
        Ok(payment_from_row(&row)?)
    }
}

#[async_trait]
impl PaymentsRepository for PgPaymentsRepository {
    async fn find_by_order_id(&self, order_id: i64) -> Result<Option<Payment>, RepositoryError> {
        let client = self.pool.get().await?;
        let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1");
        let row = client.query_opt(&query, &[&order_id]).await?;
        Ok(row.as_ref().map(payment_from_row).transpose()?)
    }

    async fn find_by_order_ids(&self, order_ids: &[i64]) -> Result<Vec<Payment>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.pool.get().await?;
        let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = ANY($1)");
        let rows = client.query(&query, &[&order_ids]).await?;
        let mut payments = Vec::with_capacity(rows.len());
        for row in &rows {
            payments.push(payment_from_row(row)?);
        }
        Ok(payments)
    }

    async fn settle(
        &self,
        order_id: i64,
        status: PaymentStatus,
    ) -> Result<Option<Payment>, RepositoryError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let query = format!(
            r#"
            UPDATE payments SET status = $2, updated_at = now()
            WHERE order_id = $1 AND status = $3
            RETURNING {PAYMENT_COLUMNS}
            "#
        );
        let row = tx
            .query_opt(&query, &[&order_id, &status, &PaymentStatus::Pending])
            .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let payment = payment_from_row(&row)?;

        if status == PaymentStatus::Fail {
            tx.execute(
                "UPDATE orders SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
                &[&order_id],
            )
            .await?;
            info!(order_id, "order cancelled after failed payment");
        }

        tx.commit().await?;
        Ok(Some(payment))
    }
}
