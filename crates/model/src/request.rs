//! Request payloads accepted by the HTTP API and their validation rules.
//!
//! Every payload derives [`Validate`]; a failure lists each bad field with a
//! message, rendered as a `field -> message` object in the error response.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use validator::{Validate, ValidationErrors};

static EVENT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,4}-\d{1,2}-\d{1,2}$").expect("date pattern is valid"));
static ROLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(organizer|customer)$").expect("role pattern is valid"));
static BANK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(bni|bri|bca)$").expect("bank pattern is valid"));

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "cannot be blank"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "cannot be blank"))]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "the length must be no less than 8"))]
    pub password: String,
    #[serde(default)]
    #[validate(regex(path = *ROLE, message = "must be in a valid format"))]
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "cannot be blank"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "cannot be blank"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, Validate)]
pub struct UpdateAccountRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "cannot be blank"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 300, message = "the length must be between 1 and 300"))]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, Validate)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "cannot be blank"))]
    pub old_password: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "the length must be no less than 8"))]
    pub password: String,
}

/// Body of both service creation and service update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, Validate)]
pub struct ServiceRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "the length must be between 1 and 100"))]
    pub name: String,
    #[serde(default)]
    #[validate(range(exclusive_min = 0.0, message = "must be a positive number"))]
    pub cost: f64,
    #[serde(default)]
    #[validate(length(min = 1, max = 20, message = "the length must be between 1 and 20"))]
    pub phone: String,
    #[serde(default)]
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 500, message = "the length must be between 1 and 500"))]
    pub description: String,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, Validate)]
pub struct CreateOrderRequest {
    #[serde(default)]
    #[validate(regex(path = *EVENT_DATE, message = "must be in a valid format"))]
    pub date_of_event: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "the length must be between 1 and 50"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "the length must be between 1 and 50"))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 20, message = "the length must be between 1 and 20"))]
    pub phone: String,
    #[serde(default)]
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 300, message = "the length must be between 1 and 300"))]
    pub address: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 300, message = "the length must be between 1 and 300"))]
    pub note: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "must list between 1 and 50 services"))]
    pub service_ids: Vec<i64>,
}

/// Body of both bank account creation and update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, Validate)]
pub struct BankAccountRequest {
    #[serde(default)]
    #[validate(regex(path = *BANK, message = "must be in a valid format"))]
    pub bank: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "the length must be between 1 and 50"))]
    pub va_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, Validate)]
pub struct CreateFeedbackRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 250, message = "the length must be between 1 and 250"))]
    pub description: String,
    #[serde(default)]
    #[validate(range(min = 0, max = 5, message = "must be between 0 and 5"))]
    pub rating: i32,
    #[serde(default)]
    #[validate(range(min = 1, message = "cannot be blank"))]
    pub to_user_id: i64,
}

/// Payment-status callback sent by the payment gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PaymentNotification {
    #[serde(default)]
    pub order_id: String,
    #[serde(rename = "transaction_status", default)]
    pub status: String,
}
