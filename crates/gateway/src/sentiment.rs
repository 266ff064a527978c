use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{GatewayError, SentimentAnalyzer, ensure_success};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeSentimentRequest<'a> {
    document: Document<'a>,
    encoding_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Document<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeSentimentResponse {
    document_sentiment: Option<DocumentSentiment>,
}

#[derive(Debug, Deserialize)]
struct DocumentSentiment {
    #[serde(default)]
    score: f32,
}

fn document_score(body: &str) -> Result<f32, GatewayError> {
    let response: AnalyzeSentimentResponse = serde_json::from_str(body)
        .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
    response
        .document_sentiment
        .map(|s| s.score)
        .ok_or_else(|| GatewayError::InvalidResponse("missing documentSentiment".into()))
}

/// Google Cloud Natural Language REST client.
#[derive(Clone)]
pub struct GoogleSentimentClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleSentimentClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl SentimentAnalyzer for GoogleSentimentClient {
    #[instrument(skip_all, fields(len = text.len()))]
    async fn analyze(&self, text: &str) -> Result<f32, GatewayError> {
        let body = AnalyzeSentimentRequest {
            document: Document {
                kind: "PLAIN_TEXT",
                content: text,
            },
            encoding_type: "UTF8",
        };
        let response = self
            .http
            .post(format!("{}/v1/documents:analyzeSentiment", self.base_url))
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;
        let body = ensure_success(response).await?.text().await?;
        let score = document_score(&body)?;
        debug!(score, "sentiment analyzed");
        Ok(score)
    }
}
