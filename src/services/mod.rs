pub mod docs_service;
pub mod metrics_service;
pub mod payment_service;
pub mod transaction_service;
pub mod webhook_service;
