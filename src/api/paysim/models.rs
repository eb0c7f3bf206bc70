use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of a sandbox transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[default]
    Authorization,
    Capture,
    Refund,
}

impl TransactionType {
    pub const ALL: [TransactionType; 3] = [
        TransactionType::Authorization,
        TransactionType::Capture,
        TransactionType::Refund,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Authorization => "authorization",
            TransactionType::Capture => "capture",
            TransactionType::Refund => "refund",
        }
    }

    /// Parse a type name, case-insensitive
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing status reported by the sandbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Approved,
    Declined,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Approved => "approved",
            TransactionStatus::Declined => "declined",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction row as returned by `GET /transactions` and `POST /payments/authorize`.
///
/// The authorize endpoint omits `type` and `merchant_id`, hence the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    #[serde(rename = "type", default)]
    pub kind: TransactionType,
    pub status: TransactionStatus,
    /// Minor currency units
    pub amount: i64,
    pub currency: String,
    pub created_at: String,
    #[serde(default)]
    pub merchant_id: String,
    #[serde(default)]
    pub auth_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionTypeCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub timestamp: String,
    #[serde(default)]
    pub time_ago: Option<String>,
}

/// Aggregate snapshot from `GET /metrics`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    pub total_transactions: u64,
    /// Minor currency units
    pub total_volume: i64,
    pub success_rate: f64,
    pub active_merchants: u64,
    pub transaction_growth_rate: f64,
    pub volume_growth_rate: f64,
    pub success_rate_change: f64,
    pub merchant_growth_rate: f64,
    pub daily_volume: Vec<i64>,
    pub transaction_types: Vec<TransactionTypeCount>,
    pub recent_activity: Vec<ActivityItem>,
    pub api_latency_p95: Option<f64>,
    pub error_rate: Option<f64>,
    pub tps: Option<f64>,
}

/// Delivery state of a webhook event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
    Failed,
    Pending,
}

impl DeliveryStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DeliveryStatus::Delivered => "Delivered",
            DeliveryStatus::Failed => "Failed",
            DeliveryStatus::Pending => "Pending",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event_id: String,
    pub event_type: String,
    pub status: DeliveryStatus,
    pub endpoint_url: String,
    /// Response latency in milliseconds
    #[serde(default)]
    pub response_time: Option<u64>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEndpoint {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: String,
}

/// Response from `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub service: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// Request body for `POST /payments/authorize`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAuthorizationRequest {
    pub amount: i64,
    pub currency: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub merchant_id: String,
    pub description: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Request body for `POST /webhooks/endpoints`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateWebhookEndpointRequest {
    pub url: String,
    pub events: Vec<String>,
    pub description: String,
}

/// Coarse classification of an [`ApiError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request never got a response
    Network,
    /// Server answered with a non-2xx status
    Status,
    Other,
}

/// Error type for sandbox API operations
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Server error ({0}): {1}")]
    Server(u16, String),
    #[error("HTTP error ({0}): {1}")]
    Http(u16, String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    #[error("Failed to parse response: {0}")]
    Deserialization(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Network(_) => ErrorKind::Network,
            ApiError::Unauthorized(_)
            | ApiError::Forbidden(_)
            | ApiError::RateLimited(_)
            | ApiError::Server(..)
            | ApiError::Http(..) => ErrorKind::Status,
            ApiError::InvalidHeader(_) | ApiError::Deserialization(_) => ErrorKind::Other,
        }
    }

    /// HTTP status carried by the error, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::RateLimited(_) => Some(429),
            ApiError::Server(code, _) | ApiError::Http(code, _) => Some(*code),
            _ => None,
        }
    }
}
