//! Order lifecycle and payment reconciliation.
//!
//! An order moves `created -> accepted -> completed` under its provider's
//! control. The customer may cancel it until it is completed, and a failed
//! payment cancels an accepted order. Accepting opens a pending payment and
//! asks the payment gateway for a bank-transfer charge; the gateway later
//! reports the outcome through [`OrderService::payment_notification`].

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use gateway::{BankTransfer, ChargeRequest, CustomerDetails, PaymentGateway, TransactionDetails};
use model::request::{CreateOrderRequest, PaymentNotification, Validate};
use model::{
    NewOrder, Order, OrderReference, OrderState, OrderTransition, OrderWithPayment, Payment,
    PaymentStatus, Principal, Role,
};
use repository::{
    BankAccountsRepository, OrdersRepository, PaymentsRepository, ServicesRepository,
};
use tracing::{error, info, instrument, warn};

use crate::{ServiceError, require_owner, require_role};

const CANNOT_PROCEED: &str = "cannot proceed your order";

/// Trait describing business operations on orders.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Orders visible to the principal, each with its payment if one exists.
    ///
    /// Customers see the orders they placed; organizers see the orders
    /// booking their services.
    async fn list_orders(&self, principal: Principal) -> Result<Vec<OrderWithPayment>, ServiceError>;

    /// Places an order for services that all belong to one organizer.
    ///
    /// # Errors
    /// Returns [`ServiceError::BadRequest`] if a service is missing or the
    /// services have different owners; nothing is persisted in that case.
    async fn create_order(
        &self,
        principal: Principal,
        request: CreateOrderRequest,
    ) -> Result<Order, ServiceError>;

    /// Applies `transition` on behalf of the order's provider.
    ///
    /// Transitions that do not apply to the current state leave the order
    /// unchanged. Returns the order as stored afterwards.
    async fn accept_or_complete(
        &self,
        principal: Principal,
        id: i64,
        transition: OrderTransition,
    ) -> Result<Order, ServiceError>;

    /// Cancels an order on behalf of the customer who placed it.
    async fn cancel_order(&self, principal: Principal, id: i64) -> Result<(), ServiceError>;

    /// Applies a payment-status callback from the payment gateway.
    ///
    /// Only the first final status of a payment is applied; replays and
    /// unknown statuses are acknowledged without effect.
    async fn payment_notification(
        &self,
        notification: PaymentNotification,
    ) -> Result<(), ServiceError>;
}

/// Implementation of [`OrderService`] over repositories and a payment gateway.
pub struct OrderServiceImpl<O, S, P, B, G> {
    orders: O,
    services: S,
    payments: P,
    bank_accounts: B,
    gateway: G,
    reference_prefix: String,
}

impl<O, S, P, B, G> OrderServiceImpl<O, S, P, B, G>
where
    O: OrdersRepository,
    S: ServicesRepository,
    P: PaymentsRepository,
    B: BankAccountsRepository,
    G: PaymentGateway,
{
    /// `reference_prefix` is the prefix of order references sent to the
    /// gateway, e.g. `EOP` for `EOP-7`.
    pub fn new(
        orders: O,
        services: S,
        payments: P,
        bank_accounts: B,
        gateway: G,
        reference_prefix: impl Into<String>,
    ) -> Self {
        Self {
            orders,
            services,
            payments,
            bank_accounts,
            gateway,
            reference_prefix: reference_prefix.into(),
        }
    }

    async fn find_order(&self, id: i64) -> Result<Order, ServiceError> {
        self.orders
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order"))
    }

    /// Resolves the requested services and returns their common owner.
    /// `service_ids` must be free of duplicates.
    async fn provider_of(&self, service_ids: &[i64]) -> Result<i64, ServiceError> {
        let services = self.services.find_many(service_ids).await?;
        if services.is_empty() || services.len() != service_ids.len() {
            warn!(
                requested = service_ids.len(),
                found = services.len(),
                "order references unknown services"
            );
            return Err(ServiceError::BadRequest(CANNOT_PROCEED.into()));
        }

        let provider_id = services[0].user_id;
        if services.iter().any(|s| s.user_id != provider_id) {
            warn!("order mixes services of several organizers");
            return Err(ServiceError::BadRequest(CANNOT_PROCEED.into()));
        }
        Ok(provider_id)
    }

    /// Opens the payment and requests the charge for a not yet accepted order.
    async fn accept(&self, order: &Order) -> Result<(), ServiceError> {
        let bank_account = self
            .bank_accounts
            .find_by_user_id(order.provider_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("bank account"))?;

        let Some(payment) = self.orders.accept(order.id, order.total_cost()).await? else {
            info!(order_id = order.id, "order accepted concurrently");
            return Ok(());
        };

        let request = self.charge_request(order, &payment, bank_account.bank, bank_account.va_number);
        if let Err(e) = self.gateway.charge(&request).await {
            error!(order_id = order.id, error = %e, "charge request failed");
            match self.orders.revert_accept(order.id).await {
                Ok(true) => info!(order_id = order.id, "accept reverted after failed charge"),
                Ok(false) => warn!(order_id = order.id, "accept already moved on, nothing reverted"),
                Err(revert) => error!(order_id = order.id, error = %revert, "failed to revert accept"),
            }
            return Err(e.into());
        }

        info!(order_id = order.id, amount = payment.amount, "order accepted");
        Ok(())
    }

    fn charge_request(
        &self,
        order: &Order,
        payment: &Payment,
        bank: String,
        va_number: String,
    ) -> ChargeRequest {
        ChargeRequest::bank_transfer(
            TransactionDetails {
                order_id: OrderReference::new(self.reference_prefix.as_str(), order.id).to_string(),
                gross_amount: payment.amount,
            },
            BankTransfer { bank, va_number },
            Some(CustomerDetails {
                first_name: order.first_name.clone(),
                last_name: order.last_name.clone(),
                phone: order.phone.clone(),
                email: order.email.clone(),
                address: order.address.clone(),
            }),
        )
    }
}

/// Keeps the first occurrence of every id.
fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[async_trait]
impl<O, S, P, B, G> OrderService for OrderServiceImpl<O, S, P, B, G>
where
    O: OrdersRepository,
    S: ServicesRepository,
    P: PaymentsRepository,
    B: BankAccountsRepository,
    G: PaymentGateway,
{
    #[instrument(skip(self))]
    async fn list_orders(&self, principal: Principal) -> Result<Vec<OrderWithPayment>, ServiceError> {
        let orders = match principal.role {
            Role::Customer => self.orders.list_for_customer(principal.user_id).await?,
            Role::Organizer => self.orders.list_for_provider(principal.user_id).await?,
        };

        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let mut payments = self.payments.find_by_order_ids(&ids).await?;

        Ok(orders
            .into_iter()
            .map(|order| {
                let payment = payments
                    .iter()
                    .position(|p| p.order_id == order.id)
                    .map(|i| payments.swap_remove(i));
                OrderWithPayment { order, payment }
            })
            .collect())
    }

    #[instrument(skip(self, request))]
    async fn create_order(
        &self,
        principal: Principal,
        request: CreateOrderRequest,
    ) -> Result<Order, ServiceError> {
        require_role(&principal, Role::Customer)?;
        request.validate()?;

        let date_of_event = NaiveDate::parse_from_str(&request.date_of_event, "%Y-%m-%d")
            .map_err(|e| {
                ServiceError::Unexpected(format!(
                    "invalid date_of_event '{}': {e}",
                    request.date_of_event
                ))
            })?;

        let service_ids = dedup_ids(&request.service_ids);
        let provider_id = self.provider_of(&service_ids).await?;

        let new_order = NewOrder {
            customer_id: principal.user_id,
            provider_id,
            date_of_event,
            first_name: request.first_name,
            last_name: request.last_name,
            phone: request.phone,
            email: request.email,
            address: request.address,
            note: request.note,
            service_ids,
        };
        let order = self.orders.insert(&new_order).await?;

        info!(order_id = order.id, provider_id, "order created");
        Ok(order)
    }

    #[instrument(skip(self, transition), fields(%transition))]
    async fn accept_or_complete(
        &self,
        principal: Principal,
        id: i64,
        transition: OrderTransition,
    ) -> Result<Order, ServiceError> {
        let order = self.find_order(id).await?;
        require_owner(&principal, order.provider_id)?;

        match transition.next_state(order.state()) {
            Some(OrderState::Accepted) => self.accept(&order).await?,
            Some(OrderState::Completed) => {
                if self.orders.complete(id).await? {
                    info!(order_id = id, "order completed");
                }
            }
            Some(OrderState::Created) | None => return Ok(order),
        }

        self.find_order(id).await
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, principal: Principal, id: i64) -> Result<(), ServiceError> {
        let order = self.find_order(id).await?;
        require_owner(&principal, order.customer_id)?;
        if order.state() == OrderState::Completed {
            return Err(ServiceError::Forbidden);
        }

        if !self.orders.delete(id).await? {
            return Err(ServiceError::not_found("order"));
        }
        info!(order_id = id, "order cancelled");
        Ok(())
    }

    #[instrument(skip_all, fields(order_ref = %notification.order_id, status = %notification.status))]
    async fn payment_notification(
        &self,
        notification: PaymentNotification,
    ) -> Result<(), ServiceError> {
        let reference = OrderReference::parse(&self.reference_prefix, &notification.order_id)
            .map_err(|_| ServiceError::BadRequest("invalid order id".into()))?;
        let order_id = reference.order_id();

        let payment = self
            .payments
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order"))?;

        let status = match PaymentStatus::from_gateway(&notification.status) {
            Some(PaymentStatus::Pending) => return Ok(()),
            Some(status) => status,
            None => {
                info!(payment_id = payment.id, "ignoring unhandled payment status");
                return Ok(());
            }
        };

        match self.payments.settle(order_id, status).await? {
            Some(settled) => info!(payment_id = settled.id, status = %settled.status, "payment settled"),
            None => info!(payment_id = payment.id, current = %payment.status, "payment already settled"),
        }
        Ok(())
    }
}
