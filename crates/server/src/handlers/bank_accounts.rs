use axum::extract::State;
use axum::response::Response;
use model::request::BankAccountRequest;

use crate::AppState;
use crate::auth::Authenticated;
use crate::response::{ApiError, JsonBody, OrFail, success};

pub(crate) async fn handle_get_bank_accounts(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Response, ApiError> {
    let accounts = state
        .services
        .bank_accounts
        .get_bank_accounts(principal)
        .await
        .or_fail("fetch bank accounts failure")?;
    Ok(success("fetch bank accounts successful", accounts))
}

pub(crate) async fn handle_create_bank_account(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    JsonBody(request): JsonBody<BankAccountRequest>,
) -> Result<Response, ApiError> {
    let account = state
        .services
        .bank_accounts
        .create_bank_account(principal, request)
        .await
        .or_fail("create bank account failure")?;
    Ok(success("create bank account successful", account))
}

pub(crate) async fn handle_update_bank_account(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    JsonBody(request): JsonBody<BankAccountRequest>,
) -> Result<Response, ApiError> {
    let account = state
        .services
        .bank_accounts
        .update_bank_account(principal, request)
        .await
        .or_fail("update bank account failure")?;
    Ok(success("update bank account successful", account))
}
