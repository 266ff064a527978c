use async_trait::async_trait;
use deadpool_postgres::Pool;
use model::{NewUser, ProfileUpdate, User};
use tokio_postgres::Row;

use crate::RepositoryError;

/// # UsersRepository
///
/// Repository interface for user accounts of both roles.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn find(&self, id: i64) -> Result<Option<User>, RepositoryError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    /// Insert a user. A taken username yields [`RepositoryError::UniqueViolation`].
    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError>;

    /// Overwrite the name and, when given, the email and address.
    async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<User, RepositoryError>;

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), RepositoryError>;
}

/// PostgreSQL implementation of the UsersRepository trait.
pub struct PgUsersRepository {
    pool: Pool,
}

impl PgUsersRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, name, username, email, address, password_hash, role, created_at";

fn user_from_row(row: &Row) -> Result<User, tokio_postgres::Error> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        address: row.try_get("address")?,
        password_hash: row.try_get("password_hash")?,
        role: row.try_get("role")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl UsersRepository for PgUsersRepository {
    async fn find(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        let client = self.pool.get().await?;
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = client.query_opt(&query, &[&id]).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let client = self.pool.get().await?;
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = client.query_opt(&query, &[&username]).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let client = self.pool.get().await?;
        let query = format!(
            r#"
            INSERT INTO users (name, username, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = client
            .query_one(
                &query,
                &[
                    &user.name,
                    &user.username,
                    &user.email,
                    &user.password_hash,
                    &user.role,
                ],
            )
            .await?;
        Ok(user_from_row(&row)?)
    }

    async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<User, RepositoryError> {
        let client = self.pool.get().await?;
        let query = format!(
            r#"
            UPDATE users
            SET name = $2,
                email = COALESCE($3, email),
                address = COALESCE($4, address),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = client
            .query_opt(&query, &[&id, &update.name, &update.email, &update.address])
            .await?;
        match row {
            Some(row) => Ok(user_from_row(&row)?),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), RepositoryError> {
        let client = self.pool.get().await?;
        let updated = client
            .execute(
                "UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1",
                &[&id, &password_hash],
            )
            .await?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
