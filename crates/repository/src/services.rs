use async_trait::async_trait;
use deadpool_postgres::Pool;
use model::{Service, ServiceDraft};
use tokio_postgres::Row;

use crate::RepositoryError;

/// # ServicesRepository
///
/// Repository interface for the services organizers offer.
/// Deleted services are hidden from every lookup but stay linked to the
/// orders that booked them.
#[async_trait]
pub trait ServicesRepository: Send + Sync {
    /// Published services, optionally filtered by a keyword matched
    /// case-insensitively against name and description.
    async fn list(&self, keyword: Option<&str>) -> Result<Vec<Service>, RepositoryError>;

    async fn find(&self, id: i64) -> Result<Option<Service>, RepositoryError>;

    /// Every non-deleted service among `ids`, in one query. Unknown ids are
    /// skipped, so callers compare the lengths.
    async fn find_many(&self, ids: &[i64]) -> Result<Vec<Service>, RepositoryError>;

    async fn insert(&self, owner_id: i64, draft: &ServiceDraft) -> Result<Service, RepositoryError>;

    async fn update(&self, id: i64, draft: &ServiceDraft) -> Result<Service, RepositoryError>;

    /// Soft delete. Returns `false` when nothing was deleted.
    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;
}

/// PostgreSQL implementation of the ServicesRepository trait.
pub struct PgServicesRepository {
    pool: Pool,
}

impl PgServicesRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

pub(crate) const SERVICE_COLUMNS: &str =
    "s.id, s.user_id, s.name, s.cost, s.phone, s.email, s.description, s.is_published, s.created_at";

pub(crate) fn service_from_row(row: &Row) -> Result<Service, tokio_postgres::Error> {
    Ok(Service {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        cost: row.try_get("cost")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        description: row.try_get("description")?,
        is_published: row.try_get("is_published")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ServicesRepository for PgServicesRepository {
    async fn list(&self, keyword: Option<&str>) -> Result<Vec<Service>, RepositoryError> {
        let client = self.pool.get().await?;
        let pattern = keyword
            .filter(|k| !k.trim().is_empty())
            .map(|k| format!("%{}%", k.trim()));
        let query = format!(
            r#"
            SELECT {SERVICE_COLUMNS}
            FROM services s
            WHERE s.deleted_at IS NULL
              AND s.is_published
              AND ($1::TEXT IS NULL OR s.name ILIKE $1 OR s.description ILIKE $1)
            ORDER BY s.id
            "#
        );
        let rows = client.query(&query, &[&pattern]).await?;
        let mut services = Vec::with_capacity(rows.len());
        for row in &rows {
            services.push(service_from_row(row)?);
        }
        Ok(services)
    }

    async fn find(&self, id: i64) -> Result<Option<Service>, RepositoryError> {
        let client = self.pool.get().await?;
        let query =
            format!("SELECT {SERVICE_COLUMNS} FROM services s WHERE s.id = $1 AND s.deleted_at IS NULL");
        let row = client.query_opt(&query, &[&id]).await?;
        Ok(row.as_ref().map(service_from_row).transpose()?)
    }

    async fn find_many(&self, ids: &[i64]) -> Result<Vec<Service>, RepositoryError> {
        let client = self.pool.get().await?;
        let query = format!(
            "SELECT {SERVICE_COLUMNS} FROM services s WHERE s.id = ANY($1) AND s.deleted_at IS NULL ORDER BY s.id"
        );
        let rows = client.query(&query, &[&ids]).await?;
        let mut services = Vec::with_capacity(rows.len());
        for row in &rows {
            services.push(service_from_row(row)?);
        }
        Ok(services)
    }

    async fn insert(&self, owner_id: i64, draft: &ServiceDraft) -> Result<Service, RepositoryError> {
        let client = self.pool.get().await?;
        let query = format!(
            r#"
            WITH s AS (
                INSERT INTO services (user_id, name, cost, phone, email, description, is_published)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT {SERVICE_COLUMNS} FROM s
            "#
        );
        let row = client
            .query_one(
                &query,
                &[
                    &owner_id,
                    &draft.name,
                    &draft.cost,
                    &draft.phone,
                    &draft.email,
                    &draft.description,
                    &draft.is_published,
                ],
            )
            .await?;
        Ok(service_from_row(&row)?)
    }

    async fn update(&self, id: i64, draft: &ServiceDraft) -> Result<Service, RepositoryError> {
        let client = self.pool.get().await?;
        let query = format!(
            r#"
            WITH s AS (
                UPDATE services
                SET name = $2, cost = $3, phone = $4, email = $5,
                    description = $6, is_published = $7, updated_at = now()
                WHERE id = $1 AND deleted_at IS NULL
                RETURNING *
            )
            SELECT {SERVICE_COLUMNS} FROM s
            "#
        );
        let row = client
            .query_opt(
                &query,
                &[
                    &id,
                    &draft.name,
                    &draft.cost,
                    &draft.phone,
                    &draft.email,
                    &draft.description,
                    &draft.is_published,
                ],
            )
            .await?;
        match row {
            Some(row) => Ok(service_from_row(&row)?),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute(
                "UPDATE services SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
                &[&id],
            )
            .await?;
        Ok(deleted > 0)
    }
}
