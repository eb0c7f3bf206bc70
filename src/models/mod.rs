//! Local view state: the transaction filter and the create-forms

pub mod filter;
pub mod form;

pub use filter::TransactionFilter;
pub use form::{Currency, FormError, PaymentForm, WebhookEndpointForm};
