use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use tracing::{info, instrument};

use crate::{GatewayError, PaymentGateway, ensure_success};

const PAYMENT_TYPE_BANK_TRANSFER: &str = "bank_transfer";

/// Body of `POST /v2/charge` for a bank-transfer virtual account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeRequest {
    pub payment_type: &'static str,
    pub transaction_details: TransactionDetails,
    pub bank_transfer: BankTransfer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_details: Option<CustomerDetails>,
}

impl ChargeRequest {
    pub fn bank_transfer(
        transaction_details: TransactionDetails,
        bank_transfer: BankTransfer,
        customer_details: Option<CustomerDetails>,
    ) -> Self {
        Self {
            payment_type: PAYMENT_TYPE_BANK_TRANSFER,
            transaction_details,
            bank_transfer,
            customer_details,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDetails {
    /// Order reference as the gateway knows it, e.g. `EOP-7`.
    pub order_id: String,
    pub gross_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankTransfer {
    pub bank: String,
    pub va_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerDetails {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub first_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub phone: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub address: String,
}

/// Midtrans core API client.
#[derive(Clone)]
pub struct MidtransClient {
    http: reqwest::Client,
    base_url: String,
    server_key: String,
}

impl MidtransClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, server_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            server_key: server_key.into(),
        }
    }

    fn charge_url(&self) -> String {
        format!("{}/v2/charge", self.base_url)
    }
}

#[async_trait]
impl PaymentGateway for MidtransClient {
    #[instrument(skip_all, fields(order_ref = %request.transaction_details.order_id))]
    async fn charge(&self, request: &ChargeRequest) -> Result<(), GatewayError> {
        let response = self
            .http
            .post(self.charge_url())
            .header(AUTHORIZATION, &self.server_key)
            .json(request)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        info!(status = %response.status(), "charge requested");
        Ok(())
    }
}
