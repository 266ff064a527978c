use axum::extract::State;
use axum::response::Response;
use model::OrderTransition;
use model::request::{CreateOrderRequest, PaymentNotification};

use crate::AppState;
use crate::auth::Authenticated;
use crate::response::{ApiError, Deleted, JsonBody, OrFail, PathParam, message, success};
use crate::views::OrderView;

pub(crate) async fn handle_list_orders(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Response, ApiError> {
    let orders = state
        .services
        .orders
        .list_orders(principal)
        .await
        .or_fail("fetch orders failure")?;
    let views: Vec<OrderView> = orders.into_iter().map(OrderView::from).collect();
    Ok(success("fetch orders successful", views))
}

pub(crate) async fn handle_create_order(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    JsonBody(request): JsonBody<CreateOrderRequest>,
) -> Result<Response, ApiError> {
    let order = state
        .services
        .orders
        .create_order(principal, request)
        .await
        .or_fail("create order failure")?;
    Ok(success("create order successful", OrderView::from(order)))
}

async fn transition(
    state: AppState,
    principal: model::Principal,
    id: i64,
    transition: OrderTransition,
) -> Result<Response, ApiError> {
    let order = state
        .services
        .orders
        .accept_or_complete(principal, id, transition)
        .await
        .or_fail("accept or complete order failure")?;
    Ok(success("accept or complete order successful", OrderView::from(order)))
}

pub(crate) async fn handle_accept_order(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    PathParam(id): PathParam<i64>,
) -> Result<Response, ApiError> {
    transition(state, principal, id, OrderTransition::Accept).await
}

pub(crate) async fn handle_complete_order(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    PathParam(id): PathParam<i64>,
) -> Result<Response, ApiError> {
    transition(state, principal, id, OrderTransition::Complete).await
}

pub(crate) async fn handle_cancel_order(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    PathParam(id): PathParam<i64>,
) -> Result<Response, ApiError> {
    state
        .services
        .orders
        .cancel_order(principal, id)
        .await
        .or_fail("cancel order failure")?;
    Ok(success("cancel order successful", Deleted::new("order", id)))
}

/// Payment-gateway callback; unauthenticated, reachable only on the configured path.
pub(crate) async fn handle_payment_notification(
    State(state): State<AppState>,
    JsonBody(notification): JsonBody<PaymentNotification>,
) -> Result<Response, ApiError> {
    state
        .services
        .orders
        .payment_notification(notification)
        .await
        .or_fail("payment failure")?;
    Ok(message("payment successful"))
}
