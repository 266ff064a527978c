//! Domain model of the booking marketplace.
//!
//! Entities mirror the database tables. The order lifecycle is expressed with
//! [`OrderState`] and [`OrderTransition`], payment reconciliation with
//! [`PaymentStatus`] and [`OrderReference`].

pub mod request;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};

/// Role - whether a user offers services or books them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSql, FromSql)]
#[serde(rename_all = "lowercase")]
#[postgres(name = "user_role")]
pub enum Role {
    #[postgres(name = "organizer")]
    Organizer,
    #[postgres(name = "customer")]
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Organizer => "organizer",
            Role::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known [`Role`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "organizer" => Ok(Role::Organizer),
            "customer" => Ok(Role::Customer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Principal - the already-authenticated caller of a usecase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}

/// User - an account of either role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    pub address: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            address: self.address.clone(),
        }
    }
}

/// UserProfile - the public view of a user embedded in other entities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    pub address: String,
}

/// NewUser - a user about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// ProfileUpdate - the editable part of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Service - something an organizer offers for booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub cost: f64,
    pub phone: String,
    pub email: String,
    pub description: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// ServiceDraft - the fields of a service that its owner controls.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDraft {
    pub name: String,
    pub cost: f64,
    pub phone: String,
    pub email: String,
    pub description: String,
    pub is_published: bool,
}

/// Lifecycle state of an order, derived from its accepted/completed flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    Created,
    Accepted,
    Completed,
}

/// A transition requested by the organizer providing an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderTransition {
    Accept,
    Complete,
}

impl OrderTransition {
    /// State the order moves to, or `None` when the transition changes nothing.
    ///
    /// Accepting is only meaningful once; completing requires a prior accept
    /// and is ignored otherwise.
    pub fn next_state(self, current: OrderState) -> Option<OrderState> {
        match (self, current) {
            (OrderTransition::Accept, OrderState::Created) => Some(OrderState::Accepted),
            (OrderTransition::Complete, OrderState::Accepted) => Some(OrderState::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for OrderTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderTransition::Accept => f.write_str("accept"),
            OrderTransition::Complete => f.write_str("complete"),
        }
    }
}

/// Order - a customer's booking of one organizer's services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    /// Organizer owning every service of the order, fixed at creation.
    pub provider_id: i64,
    pub is_accepted: bool,
    pub is_completed: bool,
    pub date_of_event: NaiveDate,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub customer: Option<UserProfile>,
    pub services: Vec<Service>,
}

impl Order {
    pub fn state(&self) -> OrderState {
        if self.is_completed {
            OrderState::Completed
        } else if self.is_accepted {
            OrderState::Accepted
        } else {
            OrderState::Created
        }
    }

    pub fn total_cost(&self) -> f64 {
        self.services.iter().map(|s| s.cost).sum()
    }

    pub fn is_provided_by(&self, user_id: i64) -> bool {
        self.provider_id == user_id
    }

    pub fn is_placed_by(&self, user_id: i64) -> bool {
        self.customer_id == user_id
    }
}

/// NewOrder - an order about to be inserted together with its service links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_id: i64,
    pub provider_id: i64,
    pub date_of_event: NaiveDate,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub note: String,
    pub service_ids: Vec<i64>,
}

/// Status of a payment as stored; gateway vocabulary is normalized into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSql, FromSql)]
#[serde(rename_all = "lowercase")]
#[postgres(name = "payment_status")]
pub enum PaymentStatus {
    #[postgres(name = "pending")]
    Pending,
    #[postgres(name = "success")]
    Success,
    #[postgres(name = "fail")]
    Fail,
}

impl PaymentStatus {
    /// Normalizes a gateway `transaction_status`.
    ///
    /// Returns `None` for statuses that carry no meaning here (refunds,
    /// authorizations and the like).
    pub fn from_gateway(status: &str) -> Option<Self> {
        match status {
            "settlement" | "capture" => Some(PaymentStatus::Success),
            "deny" | "cancel" | "expire" => Some(PaymentStatus::Fail),
            "pending" => Some(PaymentStatus::Pending),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Fail => "fail",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment - the gateway charge opened when an order is accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub amount: f64,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// OrderWithPayment - an order listed together with its payment, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderWithPayment {
    pub order: Order,
    pub payment: Option<Payment>,
}

/// Reference of an order as known to the payment gateway, e.g. `EOP-7`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReference {
    prefix: String,
    order_id: i64,
}

/// Returned when a gateway order reference does not have the `PREFIX-<id>` shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidOrderReference(pub String);

impl fmt::Display for InvalidOrderReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid order reference '{}'", self.0)
    }
}

impl std::error::Error for InvalidOrderReference {}

impl OrderReference {
    pub fn new(prefix: impl Into<String>, order_id: i64) -> Self {
        Self {
            prefix: prefix.into(),
            order_id,
        }
    }

    /// Parses `raw` as `<prefix>-<id>` where `id` is a positive integer.
    pub fn parse(prefix: &str, raw: &str) -> Result<Self, InvalidOrderReference> {
        let invalid = || InvalidOrderReference(raw.to_string());

        let (head, tail) = raw.split_once('-').ok_or_else(invalid)?;
        if head != prefix {
            return Err(invalid());
        }
        let order_id: i64 = tail.parse().map_err(|_| invalid())?;
        if order_id <= 0 {
            return Err(invalid());
        }

        Ok(Self::new(prefix, order_id))
    }

    pub fn order_id(&self) -> i64 {
        self.order_id
    }
}

impl fmt::Display for OrderReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.order_id)
    }
}

/// BankAccount - where an organizer receives bank-transfer payments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BankAccount {
    pub id: i64,
    pub user_id: i64,
    pub bank: String,
    pub va_number: String,
    pub created_at: DateTime<Utc>,
}

/// BankAccountDraft - the editable part of a bank account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankAccountDraft {
    pub bank: String,
    pub va_number: String,
}

/// Sentiment of a text split into non-negative positive/negative parts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SentimentScore {
    pub positive: f64,
    pub negative: f64,
}

impl SentimentScore {
    /// Splits a polarity score in `[-1, 1]` by its sign.
    pub fn from_polarity(score: f32) -> Self {
        let score = f64::from(score);
        if score >= 0.0 {
            Self {
                positive: score,
                negative: 0.0,
            }
        } else {
            Self {
                positive: 0.0,
                negative: score.abs(),
            }
        }
    }
}

/// Feedback - a customer's rating of an organizer after a completed order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub id: i64,
    pub description: String,
    pub rating: i32,
    pub positive: f64,
    pub negative: f64,
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub created_at: DateTime<Utc>,
    pub from_user: Option<UserProfile>,
    pub to_user: Option<UserProfile>,
}

/// NewFeedback - a feedback about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub description: String,
    pub rating: i32,
    pub sentiment: SentimentScore,
    pub from_user_id: i64,
    pub to_user_id: i64,
}
