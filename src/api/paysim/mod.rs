pub mod client;
pub mod models;

pub use client::PaySimClient;
pub use models::{
    ApiError, CreateAuthorizationRequest, CreateWebhookEndpointRequest, DeliveryStatus, ErrorKind,
    HealthStatus, Metrics, Transaction, TransactionStatus, TransactionType, WebhookEndpoint,
    WebhookEvent,
};
