use async_trait::async_trait;
use deadpool_postgres::Pool;
use model::{Feedback, NewFeedback};
use tokio_postgres::{GenericClient, Row};
use tracing::debug;

use crate::{RepositoryError, profile_columns, profile_from_row};

/// # FeedbacksRepository
///
/// Repository interface for customer feedback about organizers.
#[async_trait]
pub trait FeedbacksRepository: Send + Sync {
    /// All feedback, or only feedback received by `to_user_id`.
    async fn list(&self, to_user_id: Option<i64>) -> Result<Vec<Feedback>, RepositoryError>;

    /// Feedback already given by `from_user_id` to `to_user_id`.
    async fn feedbacks_count(&self, from_user_id: i64, to_user_id: i64)
    -> Result<i64, RepositoryError>;

    /// Completed orders `from_user_id` placed for services of `to_user_id`.
    async fn completed_orders_count(
        &self,
        from_user_id: i64,
        to_user_id: i64,
    ) -> Result<i64, RepositoryError>;

    /// Insert feedback if the pair still has a completed order without feedback.
    ///
    /// Eligibility is re-checked under a transaction-scoped advisory lock
    /// keyed on the customer. Returns `None` when the re-check fails.
    async fn insert_if_eligible(
        &self,
        feedback: &NewFeedback,
    ) -> Result<Option<Feedback>, RepositoryError>;
}

/// PostgreSQL implementation of the FeedbacksRepository trait.
pub struct PgFeedbacksRepository {
    pool: Pool,
}

impl PgFeedbacksRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn select_feedbacks(filter: &str) -> String {
    format!(
        r#"
        SELECT f.id, f.description, f.rating, f.positive, f.negative,
               f.from_user_id, f.to_user_id, f.created_at, {}, {}
        FROM feedbacks f
        JOIN users fu ON fu.id = f.from_user_id
        JOIN users tu ON tu.id = f.to_user_id
        WHERE {filter}
        ORDER BY f.id
        "#,
        profile_columns("fu", "from"),
        profile_columns("tu", "to"),
    )
}

fn feedback_from_row(row: &Row) -> Result<Feedback, tokio_postgres::Error> {
    let from_user_id: i64 = row.try_get("from_user_id")?;
    let to_user_id: i64 = row.try_get("to_user_id")?;
    Ok(Feedback {
        id: row.try_get("id")?,
        description: row.try_get("description")?,
        rating: row.try_get("rating")?,
        positive: row.try_get("positive")?,
        negative: row.try_get("negative")?,
        from_user_id,
        to_user_id,
        created_at: row.try_get("created_at")?,
        from_user: Some(profile_from_row(row, from_user_id, "from")?),
        to_user: Some(profile_from_row(row, to_user_id, "to")?),
    })
}

async fn count_feedbacks<C: GenericClient + Sync>(
    client: &C,
    from_user_id: i64,
    to_user_id: i64,
) -> Result<i64, RepositoryError> {
    let row = client
        .query_one(
            "SELECT COUNT(1) AS n FROM feedbacks WHERE from_user_id = $1 AND to_user_id = $2",
            &[&from_user_id, &to_user_id],
        )
        .await?;
    Ok(row.try_get("n")?)
}

async fn count_completed_orders<C: GenericClient + Sync>(
    client: &C,
    from_user_id: i64,
    to_user_id: i64,
) -> Result<i64, RepositoryError> {
    let row = client
        .query_one(
            r#"
            SELECT COUNT(DISTINCT o.id) AS n
            FROM orders o
            JOIN order_services os ON os.order_id = o.id
            JOIN services s ON s.id = os.service_id
            WHERE o.user_id = $1 AND s.user_id = $2
              AND o.is_completed AND o.deleted_at IS NULL
            "#,
            &[&from_user_id, &to_user_id],
        )
        .await?;
    Ok(row.try_get("n")?)
}

#[async_trait]
impl FeedbacksRepository for PgFeedbacksRepository {
    async fn list(&self, to_user_id: Option<i64>) -> Result<Vec<Feedback>, RepositoryError> {
        let client = self.pool.get().await?;
        let query = select_feedbacks("($1::BIGINT IS NULL OR f.to_user_id = $1)");
        let rows = client.query(&query, &[&to_user_id]).await?;
        let mut feedbacks = Vec::with_capacity(rows.len());
        for row in &rows {
            feedbacks.push(feedback_from_row(row)?);
        }
        Ok(feedbacks)
    }

    async fn feedbacks_count(
        &self,
        from_user_id: i64,
        to_user_id: i64,
    ) -> Result<i64, RepositoryError> {
        let client = self.pool.get().await?;
        count_feedbacks(&**client, from_user_id, to_user_id).await
    }

    async fn completed_orders_count(
        &self,
        from_user_id: i64,
        to_user_id: i64,
    ) -> Result<i64, RepositoryError> {
        let client = self.pool.get().await?;
        count_completed_orders(&**client, from_user_id, to_user_id).await
    }

    async fn insert_if_eligible(
        &self,
        feedback: &NewFeedback,
    ) -> Result<Option<Feedback>, RepositoryError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        tx.execute(
            "SELECT pg_advisory_xact_lock($1)",
            &[&feedback.from_user_id],
        )
        .await?;

        let given = count_feedbacks(&*tx, feedback.from_user_id, feedback.to_user_id).await?;
        let completed =
            count_completed_orders(&*tx, feedback.from_user_id, feedback.to_user_id).await?;
        if given >= completed {
            debug!(
                from_user_id = feedback.from_user_id,
                to_user_id = feedback.to_user_id,
                given,
                completed,
                "feedback no longer eligible"
            );
            tx.rollback().await?;
            return Ok(None);
        }

        let row = tx
            .query_one(
                r#"
                INSERT INTO feedbacks (description, rating, positive, negative, from_user_id, to_user_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                "#,
                &[
                    &feedback.description,
                    &feedback.rating,
                    &feedback.sentiment.positive,
                    &feedback.sentiment.negative,
                    &feedback.from_user_id,
                    &feedback.to_user_id,
                ],
            )
            .await?;
        let id: i64 = row.try_get("id")?;

        let row = tx.query_one(&select_feedbacks("f.id = $1"), &[&id]).await?;
        let inserted = feedback_from_row(&row)?;
        tx.commit().await?;

        Ok(Some(inserted))
    }
}
