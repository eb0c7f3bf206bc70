use crate::api::paysim::client::{API_KEY_HEADER, IDEMPOTENCY_HEADER};

struct EndpointDoc {
    method: &'static str,
    path: &'static str,
    title: &'static str,
    body: Option<&'static str>,
}

const ENDPOINTS: &[EndpointDoc] = &[
    EndpointDoc {
        method: "POST",
        path: "/payments/authorize",
        title: "Authorize Payment",
        body: Some(
            r#"{
  "amount": 5000,
  "currency": "USD",
  "card_number": "4242424242424242",
  "card_holder": "John Doe",
  "expiry_month": 12,
  "expiry_year": 2025,
  "cvv": "123",
  "merchant_id": "merchant_123"
}"#,
        ),
    },
    EndpointDoc {
        method: "POST",
        path: "/payments/capture",
        title: "Capture Payment",
        body: Some(
            r#"{
  "auth_id": "auth_xyz456...",
  "amount": 5000,
  "currency": "USD",
  "merchant_id": "merchant_123"
}"#,
        ),
    },
    EndpointDoc {
        method: "POST",
        path: "/payments/refund",
        title: "Refund Payment",
        body: Some(
            r#"{
  "transaction_id": "cap_abc123...",
  "amount": 5000,
  "currency": "USD",
  "reason": "Customer request"
}"#,
        ),
    },
    EndpointDoc {
        method: "POST",
        path: "/webhooks/endpoints",
        title: "Register Webhook Endpoint",
        body: Some(
            r#"{
  "url": "https://example.com/webhooks",
  "events": ["payment_authorized", "payment_captured"],
  "description": "Order service"
}"#,
        ),
    },
    EndpointDoc { method: "GET", path: "/transactions", title: "List Transactions", body: None },
    EndpointDoc { method: "GET", path: "/metrics", title: "Metrics Snapshot", body: None },
    EndpointDoc { method: "GET", path: "/webhooks/events", title: "Webhook Event Log", body: None },
    EndpointDoc { method: "GET", path: "/webhooks/endpoints", title: "List Webhook Endpoints", body: None },
    EndpointDoc { method: "GET", path: "/health", title: "Health Check", body: None },
];

/// Body of the `/api-docs` page
pub fn render_api_docs(base_url: &str) -> String {
    let mut out = String::from("API Documentation\n\n");

    out.push_str("Quick Start\n");
    out.push_str(&format!("  Base URL:        {}\n", base_url));
    out.push_str(&format!("  Authentication:  {}: YOUR_API_KEY\n", API_KEY_HEADER));
    out.push_str(&format!("  Idempotency:     {}: <unique token per POST>\n\n", IDEMPOTENCY_HEADER));

    for endpoint in ENDPOINTS {
        out.push_str(&format!("{}\n  {} {}\n", endpoint.title, endpoint.method, endpoint.path));
        if let Some(body) = endpoint.body {
            out.push_str("  Request Body:\n");
            for line in body.lines() {
                out.push_str(&format!("    {}\n", line));
            }
        }
        out.push('\n');
    }

    out
}
