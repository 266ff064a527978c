use axum::extract::State;
use axum::response::Response;
use model::request::{LoginRequest, RegisterRequest, ResetPasswordRequest, UpdateAccountRequest};

use crate::AppState;
use crate::auth::Authenticated;
use crate::response::{ApiError, JsonBody, OrFail, message, success};

pub(crate) async fn handle_register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<Response, ApiError> {
    let user = state
        .services
        .accounts
        .register(request)
        .await
        .or_fail("register failure")?;
    Ok(success("register successful", user))
}

pub(crate) async fn handle_login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Response, ApiError> {
    let token = state
        .services
        .accounts
        .login(request)
        .await
        .or_fail("login failure")?;
    Ok(success("login successful", token))
}

pub(crate) async fn handle_get_account(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Response, ApiError> {
    let user = state
        .services
        .accounts
        .get_account(principal)
        .await
        .or_fail("fetch account failure")?;
    Ok(success("fetch account successful", user))
}

pub(crate) async fn handle_update_account(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    JsonBody(request): JsonBody<UpdateAccountRequest>,
) -> Result<Response, ApiError> {
    let user = state
        .services
        .accounts
        .update_account(principal, request)
        .await
        .or_fail("update account failure")?;
    Ok(success("update account successful", user))
}

pub(crate) async fn handle_reset_password(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    JsonBody(request): JsonBody<ResetPasswordRequest>,
) -> Result<Response, ApiError> {
    state
        .services
        .accounts
        .reset_password(principal, request)
        .await
        .or_fail("reset password failure")?;
    Ok(message("reset password successful"))
}
