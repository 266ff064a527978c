//! Outbound integrations: the payment gateway charge API and the
//! sentiment-analysis API.
//!
//! Both are reached over HTTPS with one shared [`reqwest::Client`]; usecases
//! only see the [`PaymentGateway`] and [`SentimentAnalyzer`] traits.

mod midtrans;
mod sentiment;

pub use midtrans::{
    BankTransfer, ChargeRequest, CustomerDetails, MidtransClient, TransactionDetails,
};
pub use sentiment::GoogleSentimentClient;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure or undecodable body.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    /// The remote API answered with a non-2xx status.
    #[error("Unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Opens bank-transfer charges for accepted orders.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: &ChargeRequest) -> Result<(), GatewayError>;
}

/// Scores the polarity of a text in `[-1, 1]`.
#[async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<f32, GatewayError>;
}

/// Builds the HTTP client shared by every outbound integration.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, GatewayError> {
    let client = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Turns a non-2xx response into [`GatewayError::Status`].
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Status { status, body })
}
