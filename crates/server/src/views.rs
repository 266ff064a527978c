//! Response shapes that add derived fields to domain entities.

use model::{Order, OrderState, OrderWithPayment, PaymentStatus};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct OrderView {
    #[serde(flatten)]
    order: Order,
    total_cost: f64,
    state: OrderState,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_status: Option<PaymentStatus>,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            total_cost: order.total_cost(),
            state: order.state(),
            payment_status: None,
            order,
        }
    }
}

impl From<OrderWithPayment> for OrderView {
    fn from(entry: OrderWithPayment) -> Self {
        Self {
            payment_status: entry.payment.map(|p| p.status),
            ..Self::from(entry.order)
        }
    }
}
