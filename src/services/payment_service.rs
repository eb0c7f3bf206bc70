use thiserror::Error;
use tracing::{error, info};

use crate::api::paysim::{ApiError, PaySimClient, Transaction};
use crate::models::form::{FormError, PAYMENT_FAILED_MESSAGE};
use crate::models::PaymentForm;
use crate::query::{QueryClient, QueryKey};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Submit the new-authorization form.
///
/// On success the transactions and metrics queries are invalidated and the form is
/// reset. On API failure the form keeps its values and shows a generic message.
pub async fn submit_payment(
    client: &PaySimClient,
    queries: &QueryClient,
    form: &mut PaymentForm,
) -> Result<Transaction, SubmitError> {
    let request = form.to_request()?;

    form.pending = true;
    form.error = None;
    let result = client.create_authorization(&request).await;
    form.pending = false;

    match result {
        Ok(transaction) => {
            info!(
                "Created {} {} for {} ({})",
                request.kind, transaction.transaction_id, request.merchant_id, transaction.status
            );
            queries.invalidate(QueryKey::Transactions);
            queries.invalidate(QueryKey::Metrics);
            form.reset();
            Ok(transaction)
        }
        Err(e) => {
            error!("Failed to create transaction: {}", e);
            form.error = Some(PAYMENT_FAILED_MESSAGE.to_string());
            Err(e.into())
        }
    }
}
