//! Business logic layer of the marketplace.
//!
//! Each usecase is a trait (`AccountService`, `CatalogService`,
//! `OrderService`, `BankAccountService`, `FeedbackService`) with an
//! implementation generic over the repositories and gateways it needs.
//! Callers pass the already-authenticated [`Principal`]; role and ownership
//! rules are enforced here, never in the HTTP layer.
//!
//! # Features
//! - Order lifecycle: creation, accept (opens a payment and a gateway charge),
//!   completion, cancellation and payment-webhook reconciliation.
//! - Feedback gated by completed orders and scored by a sentiment analyzer.
//! - Account registration and login with argon2 hashes and signed tokens.
//! - Well-typed error handling via [`ServiceError`].

pub mod account;
pub mod auth;
pub mod bank_accounts;
pub mod catalog;
pub mod feedbacks;
pub mod orders;

#[cfg(test)]
mod testing;

pub use account::{AccountService, AccountServiceImpl};
pub use auth::{Claims, PasswordManager, TokenManager};
pub use bank_accounts::{BankAccountService, BankAccountServiceImpl};
pub use catalog::{CatalogService, CatalogServiceImpl};
pub use feedbacks::{FeedbackService, FeedbackServiceImpl};
pub use orders::{OrderService, OrderServiceImpl};

use gateway::GatewayError;
use model::request::ValidationErrors;
use model::{Principal, Role};
use repository::RepositoryError;
use thiserror::Error;

/// The main error type of every usecase.
///
/// The first five variants are caller errors and carry the message shown to
/// the client; the rest are internal failures.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request payload failed field validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("{0}")]
    BadRequest(String),
    /// Wrong role, not the owner, or bad credentials.
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    /// A repository (database) operation failed.
    #[error("Database error: {0}")]
    Db(#[from] RepositoryError),
    /// An outbound call to the payment gateway or sentiment API failed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("Password hashing error: {0}")]
    Password(String),
    /// Some unexpected or unhandled error.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ServiceError {
    pub(crate) fn not_found(what: &str) -> Self {
        ServiceError::NotFound(format!("{what} not found"))
    }
}

/// Rejects principals whose role differs from `role`.
pub(crate) fn require_role(principal: &Principal, role: Role) -> Result<(), ServiceError> {
    if principal.is(role) {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized)
    }
}

/// Rejects principals that are not `owner_id`.
pub(crate) fn require_owner(principal: &Principal, owner_id: i64) -> Result<(), ServiceError> {
    if principal.user_id == owner_id {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized)
    }
}
