//! # Data Repository Layer
//!
//! This module provides repository traits and PostgreSQL implementations
//! for all entities: users, services, orders, payments, bank accounts and
//! feedbacks. Implementations share a `deadpool_postgres::Pool`; operations
//! that must not interleave with concurrent requests (accepting an order,
//! settling a payment, inserting feedback) run in a single transaction.

mod bank_accounts;
mod feedbacks;
mod orders;
mod payments;
mod services;
mod users;

pub use bank_accounts::{BankAccountsRepository, PgBankAccountsRepository};
pub use feedbacks::{FeedbacksRepository, PgFeedbacksRepository};
pub use orders::{OrdersRepository, PgOrdersRepository};
pub use payments::{PaymentsRepository, PgPaymentsRepository};
pub use services::{PgServicesRepository, ServicesRepository};
pub use users::{PgUsersRepository, UsersRepository};

use thiserror::Error;
use tokio_postgres::error::SqlState;

/// # RepositoryError
///
/// Error types that can occur during repository operations.
///
/// This enum represents the various error conditions that might arise
/// when interacting with the data storage layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database-related errors, wrapping the underlying PostgreSQL error
    #[error("Database error: {0}")]
    Db(#[source] tokio_postgres::Error),
    /// Failed to obtain a connection from the pool.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    /// A unique constraint rejected the write; carries the constraint name.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
    /// No result found.
    #[error("Not found")]
    NotFound,
}

impl From<tokio_postgres::Error> for RepositoryError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
            let constraint = err
                .as_db_error()
                .and_then(|db| db.constraint())
                .unwrap_or_default()
                .to_string();
            return RepositoryError::UniqueViolation(constraint);
        }
        RepositoryError::Db(err)
    }
}

/// Columns of `users` needed to build a [`model::UserProfile`], aliased with a prefix.
pub(crate) fn profile_columns(table: &str, prefix: &str) -> String {
    format!(
        "{table}.name AS {prefix}_name, {table}.username AS {prefix}_username, \
         {table}.email AS {prefix}_email, {table}.address AS {prefix}_address"
    )
}

pub(crate) fn profile_from_row(
    row: &tokio_postgres::Row,
    id: i64,
    prefix: &str,
) -> Result<model::UserProfile, tokio_postgres::Error> {
    Ok(model::UserProfile {
        id,
        name: row.try_get(format!("{prefix}_name").as_str())?,
        username: row.try_get(format!("{prefix}_username").as_str())?,
        email: row.try_get(format!("{prefix}_email").as_str())?,
        address: row.try_get(format!("{prefix}_address").as_str())?,
    })
}
