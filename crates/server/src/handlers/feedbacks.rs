use axum::extract::State;
use axum::response::Response;
use model::request::CreateFeedbackRequest;
use serde::Deserialize;

use crate::AppState;
use crate::auth::Authenticated;
use crate::response::{ApiError, JsonBody, OrFail, QueryParams, success};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListFeedbacksQuery {
    to_user_id: Option<i64>,
}

pub(crate) async fn handle_list_feedbacks(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListFeedbacksQuery>,
) -> Result<Response, ApiError> {
    let feedbacks = state
        .services
        .feedbacks
        .list_feedbacks(query.to_user_id)
        .await
        .or_fail("fetch feedbacks failure")?;
    Ok(success("fetch feedbacks successful", feedbacks))
}

pub(crate) async fn handle_create_feedback(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    JsonBody(request): JsonBody<CreateFeedbackRequest>,
) -> Result<Response, ApiError> {
    let feedback = state
        .services
        .feedbacks
        .create_feedback(principal, request)
        .await
        .or_fail("create feedback failure")?;
    Ok(success("create feedback successful", feedback))
}
