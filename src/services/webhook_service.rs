use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::api::paysim::{PaySimClient, WebhookEndpoint, WebhookEvent};
use crate::models::form::WEBHOOK_FAILED_MESSAGE;
use crate::models::WebhookEndpointForm;
use crate::query::{QueryClient, QueryKey, QueryState};
use crate::services::payment_service::SubmitError;
use crate::utils::errors::load_failed_message;
use crate::utils::format::{time_ago, url_host};
use crate::utils::Table;

/// Body of the `/webhooks` page
pub fn render_webhooks_page(
    endpoints: &QueryState<Vec<WebhookEndpoint>>,
    events: &QueryState<Vec<WebhookEvent>>,
    form: &WebhookEndpointForm,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::from("Webhooks\n\n");

    out.push_str("Webhook Endpoints\n");
    out.push_str(&render_endpoints(endpoints));
    out.push('\n');

    out.push_str("Recent Events\n");
    out.push_str(&render_events(events, now));
    out.push('\n');

    out.push_str(&form.render());
    out
}

fn render_endpoints(state: &QueryState<Vec<WebhookEndpoint>>) -> String {
    match state {
        QueryState::Loading => "  Loading endpoints...\n".to_string(),
        QueryState::Failed(_) => format!("  {}\n", load_failed_message("webhook endpoints")),
        QueryState::Ready(endpoints) if endpoints.is_empty() => {
            "  No endpoints configured. Use `set url <url>` then `submit`.\n".to_string()
        }
        QueryState::Ready(endpoints) => {
            let mut out = String::new();
            for endpoint in endpoints.iter() {
                let status = if endpoint.status.is_empty() { "active" } else { endpoint.status.as_str() };
                out.push_str(&format!("  {}  [{}]\n", endpoint.url, capitalize(status)));
                if !endpoint.events.is_empty() {
                    out.push_str(&format!("    {}\n", endpoint.events.join(", ")));
                }
            }
            out
        }
    }
}

fn render_events(state: &QueryState<Vec<WebhookEvent>>, now: DateTime<Utc>) -> String {
    match state {
        QueryState::Loading => "  Loading events...\n".to_string(),
        QueryState::Failed(_) => format!("  {}\n", load_failed_message("webhook events")),
        QueryState::Ready(events) if events.is_empty() => "  No webhook events yet.\n".to_string(),
        QueryState::Ready(events) => {
            let mut table = Table::new(&["Event", "Endpoint", "Status", "Latency", "Time"]);
            for event in events.iter() {
                table.add_row(vec![
                    event.event_type.clone(),
                    url_host(&event.endpoint_url).to_string(),
                    event.status.label().to_string(),
                    event
                        .response_time
                        .map(|ms| format!("{}ms", ms))
                        .unwrap_or_else(|| "-".to_string()),
                    time_ago(&event.created_at, now),
                ]);
            }
            table.render()
        }
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Submit the add-endpoint form; on success the webhook queries go stale
pub async fn submit_webhook_endpoint(
    client: &PaySimClient,
    queries: &QueryClient,
    form: &mut WebhookEndpointForm,
) -> Result<WebhookEndpoint, SubmitError> {
    let request = form.to_request()?;

    form.pending = true;
    form.error = None;
    let result = client.create_webhook_endpoint(&request).await;
    form.pending = false;

    match result {
        Ok(endpoint) => {
            info!("Registered webhook endpoint {} ({})", endpoint.id, endpoint.url);
            queries.invalidate(QueryKey::WebhookEvents);
            queries.invalidate(QueryKey::WebhookEndpoints);
            form.reset();
            Ok(endpoint)
        }
        Err(e) => {
            error!("Failed to add webhook endpoint: {}", e);
            form.error = Some(WEBHOOK_FAILED_MESSAGE.to_string());
            Err(e.into())
        }
    }
}
