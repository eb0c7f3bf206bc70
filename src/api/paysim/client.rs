use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::models::{
    ApiError, CreateAuthorizationRequest, CreateWebhookEndpointRequest, HealthStatus, Metrics,
    Transaction, WebhookEndpoint, WebhookEvent,
};
use crate::config::Config;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const IDEMPOTENCY_HEADER: &str = "x-idempotency-key";

/// PaySim sandbox REST client
pub struct PaySimClient {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
}

/// Pull `error`/`message`/`detail` out of a JSON error body, else keep the raw text
fn error_message(body_text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body_text)
        .ok()
        .and_then(|json| {
            ["error", "message", "detail"]
                .iter()
                .find_map(|field| json.get(*field).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body_text.to_string())
}

impl PaySimClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http_client = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            base_url: config.api_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Headers sent with every request
    fn create_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let key_value = HeaderValue::from_str(&self.api_key)
            .map_err(|e| ApiError::InvalidHeader(format!("API key: {}", e)))?;
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key_value);

        Ok(headers)
    }

    /// Headers for a mutating request: the common set plus a fresh idempotency token
    fn create_mutation_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = self.create_headers()?;
        let token = Uuid::new_v4().to_string();
        let token_value = HeaderValue::from_str(&token)
            .map_err(|e| ApiError::InvalidHeader(format!("Idempotency key: {}", e)))?;
        headers.insert(HeaderName::from_static(IDEMPOTENCY_HEADER), token_value);
        Ok(headers)
    }

    /// Map a non-2xx response to an error, logging per status
    async fn handle_error_response(
        method: &str,
        path: &str,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ApiError {
        let status_code = status.as_u16();
        let body_text = error_message(&response.text().await.unwrap_or_default());

        match status_code {
            401 => {
                error!("{} {} unauthorized (401): check PAYSIM_API_KEY", method, path);
                ApiError::Unauthorized(body_text)
            }
            403 => {
                error!("{} {} forbidden (403): API key lacks access", method, path);
                ApiError::Forbidden(body_text)
            }
            429 => {
                warn!("{} {} rate limited (429): too many requests", method, path);
                ApiError::RateLimited(body_text)
            }
            500..=599 => {
                error!("{} {} server error ({}): {}", method, path, status_code, body_text);
                ApiError::Server(status_code, body_text)
            }
            _ => {
                warn!("{} {} failed with HTTP {}: {}", method, path, status_code, body_text);
                ApiError::Http(status_code, body_text)
            }
        }
    }

    async fn read_response<T: DeserializeOwned>(
        method: &str,
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        if !response.status().is_success() {
            let status = response.status();
            return Err(Self::handle_error_response(method, path, status, response).await);
        }

        response.json::<T>().await.map_err(|e| {
            error!("{} {} returned an unreadable body: {}", method, path, e);
            ApiError::Deserialization(e.to_string())
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let headers = self.create_headers()?;
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                error!("GET {} unreachable: {}", path, e);
                ApiError::Network(e.to_string())
            })?;

        Self::read_response("GET", path, response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let headers = self.create_mutation_headers()?;
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("POST {} unreachable: {}", path, e);
                ApiError::Network(e.to_string())
            })?;

        Self::read_response("POST", path, response).await
    }

    /// GET /transactions
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>, ApiError> {
        self.get("/transactions").await
    }

    /// GET /metrics
    pub async fn get_metrics(&self) -> Result<Metrics, ApiError> {
        self.get("/metrics").await
    }

    /// GET /webhooks/events
    pub async fn list_webhook_events(&self) -> Result<Vec<WebhookEvent>, ApiError> {
        self.get("/webhooks/events").await
    }

    /// GET /webhooks/endpoints
    pub async fn list_webhook_endpoints(&self) -> Result<Vec<WebhookEndpoint>, ApiError> {
        self.get("/webhooks/endpoints").await
    }

    /// GET /health
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.get("/health").await
    }

    /// POST /payments/authorize
    ///
    /// Each call carries a new idempotency key, so a resubmitted form is a new request.
    pub async fn create_authorization(
        &self,
        request: &CreateAuthorizationRequest,
    ) -> Result<Transaction, ApiError> {
        self.post("/payments/authorize", request).await
    }

    /// POST /webhooks/endpoints
    pub async fn create_webhook_endpoint(
        &self,
        request: &CreateWebhookEndpointRequest,
    ) -> Result<WebhookEndpoint, ApiError> {
        self.post("/webhooks/endpoints", request).await
    }
}
