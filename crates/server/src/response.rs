//! JSON envelope shared by every endpoint.
//!
//! Success: `{"message": "...", "data": ...}`.
//! Failure: `{"message": "...", "error": ...}` where `error` is a string, or
//! a field -> message object for validation failures.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use model::request::ValidationErrors;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use service::ServiceError;
use tracing::{error, warn};

#[derive(Debug, Serialize)]
struct Envelope<T> {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

/// 200 with `message` and `data`.
pub(crate) fn success<T: Serialize>(message: &'static str, data: T) -> Response {
    (
        StatusCode::OK,
        Json(Envelope {
            message,
            data: Some(data),
        }),
    )
        .into_response()
}

/// 200 with only a `message`.
pub(crate) fn message(message: &'static str) -> Response {
    (StatusCode::OK, Json(Envelope::<()> { message, data: None })).into_response()
}

/// Payload of a successful delete.
#[derive(Debug, Serialize)]
pub(crate) struct Deleted {
    pub kind: &'static str,
    pub id: i64,
    pub deleted: bool,
}

impl Deleted {
    pub(crate) fn new(kind: &'static str, id: i64) -> Self {
        Self {
            kind,
            id,
            deleted: true,
        }
    }
}

/// A failed request: the operation that failed and why.
#[derive(Debug)]
pub(crate) struct ApiError {
    message: &'static str,
    error: ServiceError,
}

impl ApiError {
    pub(crate) fn new(message: &'static str, error: ServiceError) -> Self {
        Self { message, error }
    }

    fn status(&self) -> StatusCode {
        match &self.error {
            ServiceError::Validation(_) | ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Db(_)
            | ServiceError::Gateway(_)
            | ServiceError::Token(_)
            | ServiceError::Password(_)
            | ServiceError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self.error {
            ServiceError::Validation(errors) => {
                json!({ "message": "validation error", "error": field_messages(errors) })
            }
            _ if status.is_server_error() => {
                error!(operation = self.message, error = %self.error, "request failed");
                json!({ "message": self.message, "error": "internal server error" })
            }
            other => {
                warn!(operation = self.message, status = status.as_u16(), error = %other, "request rejected");
                json!({ "message": self.message, "error": other.to_string() })
            }
        };
        (status, Json(body)).into_response()
    }
}

/// One message per invalid field; the first failing rule wins.
fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, String> {
    errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| {
            let first = errs.first()?;
            let message = first
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| first.code.to_string());
            Some((field.to_string(), message))
        })
        .collect()
}

/// Attaches the failing operation to a usecase error.
pub(crate) trait OrFail<T> {
    fn or_fail(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> OrFail<T> for Result<T, ServiceError> {
    fn or_fail(self, message: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::new(message, e))
    }
}

/// `axum::Json` whose rejection uses the failure envelope.
pub(crate) struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(rejection_error(rejection)),
        }
    }
}

fn rejection_error(rejection: JsonRejection) -> ApiError {
    ApiError::new(
        "invalid request body",
        ServiceError::BadRequest(rejection.body_text()),
    )
}

/// `axum::extract::Path` whose rejection uses the failure envelope.
pub(crate) struct PathParam<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(PathParam(value)),
            Err(rejection) => Err(ApiError::new(
                "invalid path parameter",
                ServiceError::BadRequest(rejection.body_text()),
            )),
        }
    }
}

/// `axum::extract::Query` whose rejection uses the failure envelope.
pub(crate) struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => Err(ApiError::new(
                "invalid query parameter",
                ServiceError::BadRequest(rejection.body_text()),
            )),
        }
    }
}
