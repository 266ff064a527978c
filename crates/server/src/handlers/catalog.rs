use axum::extract::State;
use axum::response::Response;
use model::request::ServiceRequest;
use serde::Deserialize;

use crate::AppState;
use crate::auth::Authenticated;
use crate::response::{ApiError, Deleted, JsonBody, OrFail, PathParam, QueryParams, success};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListServicesQuery {
    keyword: Option<String>,
}

pub(crate) async fn handle_list_services(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListServicesQuery>,
) -> Result<Response, ApiError> {
    let services = state
        .services
        .catalog
        .list_services(query.keyword)
        .await
        .or_fail("fetch services failure")?;
    Ok(success("fetch services successful", services))
}

pub(crate) async fn handle_find_service(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> Result<Response, ApiError> {
    let service = state
        .services
        .catalog
        .find_service(id)
        .await
        .or_fail("fetch service failure")?;
    Ok(success("fetch service successful", service))
}

pub(crate) async fn handle_create_service(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    JsonBody(request): JsonBody<ServiceRequest>,
) -> Result<Response, ApiError> {
    let service = state
        .services
        .catalog
        .create_service(principal, request)
        .await
        .or_fail("create service failure")?;
    Ok(success("create service successful", service))
}

pub(crate) async fn handle_update_service(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    PathParam(id): PathParam<i64>,
    JsonBody(request): JsonBody<ServiceRequest>,
) -> Result<Response, ApiError> {
    let service = state
        .services
        .catalog
        .update_service(principal, id, request)
        .await
        .or_fail("update service failure")?;
    Ok(success("update service successful", service))
}

pub(crate) async fn handle_delete_service(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    PathParam(id): PathParam<i64>,
) -> Result<Response, ApiError> {
    state
        .services
        .catalog
        .delete_service(principal, id)
        .await
        .or_fail("delete service failure")?;
    Ok(success("delete service successful", Deleted::new("service", id)))
}
