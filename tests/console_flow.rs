use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use paysim_console::api::paysim::PaySimClient;
use paysim_console::commands::{handle_line, CommandError, Outcome};
use paysim_console::models::form::{FormError, PAYMENT_FAILED_MESSAGE};
use paysim_console::query::{Query, QueryClient, QueryKey, QueryOptions};
use paysim_console::{Config, Console};

const API_KEY: &str = "sk_test";

#[derive(Clone, Default)]
struct MockState {
    transactions: Arc<Mutex<Vec<Value>>>,
    endpoints: Arc<Mutex<Vec<Value>>>,
    transaction_gets: Arc<AtomicUsize>,
    metrics_gets: Arc<AtomicUsize>,
    event_gets: Arc<AtomicUsize>,
    posts: Arc<AtomicUsize>,
    api_keys: Arc<Mutex<Vec<String>>>,
    idempotency_keys: Arc<Mutex<Vec<String>>>,
}

impl MockState {
    fn seeded() -> Self {
        let state = MockState::default();
        *state.transactions.lock().unwrap() = vec![
            tx("txn_1abc", "authorization", "approved", "amazon", 10000),
            tx("txn_2def", "capture", "completed", "starbucks", 450),
            tx("txn_3ghi", "refund", "declined", "delta_airlines", 30000),
        ];
        state
    }

    fn record(&self, headers: &HeaderMap) -> Result<(), StatusCode> {
        let key = headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.api_keys.lock().unwrap().push(key.clone());
        if key == API_KEY {
            Ok(())
        } else {
            Err(StatusCode::UNAUTHORIZED)
        }
    }

    fn record_idempotency(&self, headers: &HeaderMap) -> Result<(), StatusCode> {
        let token = headers
            .get("x-idempotency-key")
            .and_then(|v| v.to_str().ok())
            .ok_or(StatusCode::BAD_REQUEST)?;
        self.idempotency_keys.lock().unwrap().push(token.to_string());
        Ok(())
    }
}

fn tx(id: &str, kind: &str, status: &str, merchant: &str, amount: i64) -> Value {
    json!({
        "transaction_id": id,
        "type": kind,
        "status": status,
        "amount": amount,
        "currency": "USD",
        "created_at": "2024-07-01T10:00:00.000000",
        "merchant_id": merchant,
    })
}

async fn list_transactions(State(state): State<MockState>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    state.transaction_gets.fetch_add(1, Ordering::SeqCst);
    state.record(&headers)?;
    let list = state.transactions.lock().unwrap().clone();
    Ok(Json(Value::Array(list)))
}

async fn metrics(State(state): State<MockState>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    state.metrics_gets.fetch_add(1, Ordering::SeqCst);
    state.record(&headers)?;
    let count = state.transactions.lock().unwrap().len();
    Ok(Json(json!({
        "total_transactions": count,
        "total_volume": 40450,
        "success_rate": 95.2,
        "active_merchants": 3,
        "daily_volume": [50000, 120000],
    })))
}

async fn webhook_events(State(state): State<MockState>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    state.event_gets.fetch_add(1, Ordering::SeqCst);
    state.record(&headers)?;
    Ok(Json(json!([{
        "event_id": "evt_1",
        "event_type": "payment.succeeded",
        "status": "delivered",
        "endpoint_url": "https://webhook.site/abc123",
        "response_time": 120,
        "created_at": "2024-07-01T10:00:00"
    }])))
}

async fn list_endpoints(State(state): State<MockState>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    state.record(&headers)?;
    let list = state.endpoints.lock().unwrap().clone();
    Ok(Json(Value::Array(list)))
}

async fn create_endpoint(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    state.posts.fetch_add(1, Ordering::SeqCst);
    state.record(&headers)?;
    state.record_idempotency(&headers)?;
    let endpoint = json!({
        "id": format!("webhook_{}", state.endpoints.lock().unwrap().len() + 1),
        "url": body["url"],
        "events": body["events"],
        "description": body["description"],
        "status": "active",
        "created_at": "2024-07-01T10:00:00"
    });
    state.endpoints.lock().unwrap().push(endpoint.clone());
    Ok(Json(endpoint))
}

async fn authorize(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    state.posts.fetch_add(1, Ordering::SeqCst);
    state.record(&headers)?;
    state.record_idempotency(&headers)?;

    if body["merchant_id"] == "fail_me" {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let amount = body["amount"].as_i64().ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
    let merchant = body["merchant_id"].as_str().unwrap_or_default();
    let kind = body["type"].as_str().unwrap_or("authorization");
    let id = format!("auth_{}", state.posts.load(Ordering::SeqCst));
    state
        .transactions
        .lock()
        .unwrap()
        .push(tx(&id, kind, "approved", merchant, amount));

    Ok(Json(json!({
        "transaction_id": id,
        "status": "approved",
        "amount": amount,
        "currency": body["currency"],
        "created_at": "2024-07-01T10:00:00",
        "auth_id": "auth_0123",
        "message": "Authorization successful"
    })))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "healthy", "timestamp": "2024-07-01T10:00:00", "service": "payments-mock-api"}))
}

async fn spawn_mock(state: MockState) -> Result<String> {
    let app = Router::new()
        .route("/transactions", get(list_transactions))
        .route("/metrics", get(metrics))
        .route("/webhooks/events", get(webhook_events))
        .route("/webhooks/endpoints", get(list_endpoints).post(create_endpoint))
        .route("/payments/authorize", axum::routing::post(authorize))
        .route("/health", get(health))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{}", addr))
}

fn console_for(base_url: String, api_key: &str) -> Result<Console> {
    let config = Config {
        api_url: base_url,
        api_key: api_key.to_string(),
        timeout: Duration::from_secs(5),
    };
    let (console, _updates) = console_with(config, QueryClient::new())?;
    Ok(console)
}

fn console_with(config: Config, queries: QueryClient) -> Result<(Console, UnboundedReceiver<String>)> {
    let client = PaySimClient::new(&config)?;
    let (tx, rx) = mpsc::unbounded_channel();
    Ok((Console::new(Arc::new(client), Arc::new(queries), tx), rx))
}

fn config_for(base_url: String) -> Config {
    Config {
        api_url: base_url,
        api_key: API_KEY.to_string(),
        timeout: Duration::from_secs(5),
    }
}

async fn run(console: &mut Console, line: &str) -> String {
    match handle_line(console, line).await {
        Ok(Outcome::Output(text)) => text,
        other => panic!("unexpected outcome for {:?}: {:?}", line, other),
    }
}

#[tokio::test]
async fn test_transactions_page_lists_and_filters() -> Result<()> {
    let state = MockState::seeded();
    let mut console = console_for(spawn_mock(state.clone()).await?, API_KEY)?;

    let page = run(&mut console, "go /transactions").await;
    assert!(page.contains("[Transactions]"));
    assert!(page.contains("txn_1abc"));
    assert!(page.contains("$4.50"));

    let page = run(&mut console, "search STARBUCKS").await;
    assert!(page.contains("txn_2def"));
    assert!(!page.contains("txn_1abc"));

    let page = run(&mut console, "search").await;
    let page_typed = run(&mut console, "type refund").await;
    assert!(page.contains("txn_1abc"));
    assert!(page_typed.contains("txn_3ghi"));
    assert!(!page_typed.contains("txn_2def"));

    let page = run(&mut console, "search zzz").await;
    assert!(page.contains("No transactions match your filters."));

    // filter changes reuse the cached list
    assert_eq!(state.transaction_gets.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_successful_payment_refetches_transactions_and_metrics() -> Result<()> {
    let state = MockState::seeded();
    let mut console = console_for(spawn_mock(state.clone()).await?, API_KEY)?;

    let dashboard = run(&mut console, "go /").await;
    assert!(dashboard.contains("Dashboard Overview"));
    assert_eq!(state.metrics_gets.load(Ordering::SeqCst), 1);

    run(&mut console, "go /transactions").await;
    run(&mut console, "set amount 12.34").await;
    run(&mut console, "set merchant merchant_123").await;
    assert_eq!(state.transaction_gets.load(Ordering::SeqCst), 1);

    let page = run(&mut console, "submit").await;
    assert!(page.contains("Created transaction auth_1 (approved)"));
    assert!(page.contains("auth_1"));
    assert!(page.contains("$12.34"));
    assert_eq!(state.transaction_gets.load(Ordering::SeqCst), 2);
    assert!(console.payment_form.amount.is_empty());

    assert!(console.queries().is_stale(QueryKey::Metrics).await);
    run(&mut console, "go /").await;
    assert_eq!(state.metrics_gets.load(Ordering::SeqCst), 2);

    let stored = state.transactions.lock().unwrap().clone();
    assert_eq!(stored.last().unwrap()["amount"], 1234);
    Ok(())
}

#[tokio::test]
async fn test_every_request_is_keyed_and_posts_are_idempotent() -> Result<()> {
    let state = MockState::seeded();
    let mut console = console_for(spawn_mock(state.clone()).await?, API_KEY)?;

    run(&mut console, "go /transactions").await;
    for _ in 0..2 {
        run(&mut console, "set amount 5").await;
        run(&mut console, "set merchant merchant_123").await;
        run(&mut console, "submit").await;
    }

    let keys = state.api_keys.lock().unwrap().clone();
    assert!(!keys.is_empty());
    assert!(keys.iter().all(|k| k == API_KEY));

    let tokens = state.idempotency_keys.lock().unwrap().clone();
    assert_eq!(tokens.len(), 2);
    assert_ne!(tokens[0], tokens[1]);
    Ok(())
}

#[tokio::test]
async fn test_incomplete_form_is_not_submitted() -> Result<()> {
    let state = MockState::seeded();
    let mut console = console_for(spawn_mock(state.clone()).await?, API_KEY)?;

    run(&mut console, "go /transactions").await;
    run(&mut console, "set amount 10").await;

    let result = handle_line(&mut console, "submit").await;
    assert_eq!(result, Err(CommandError::Form(FormError::Incomplete("amount, merchant"))));
    assert_eq!(state.posts.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_failed_payment_shows_inline_error() -> Result<()> {
    let state = MockState::seeded();
    let mut console = console_for(spawn_mock(state.clone()).await?, API_KEY)?;

    run(&mut console, "go /transactions").await;
    run(&mut console, "set amount 20").await;
    run(&mut console, "set merchant fail_me").await;

    let page = run(&mut console, "submit").await;
    assert!(page.contains(PAYMENT_FAILED_MESSAGE));
    assert_eq!(console.payment_form.merchant_id, "fail_me");
    assert!(!console.queries().is_stale(QueryKey::Transactions).await);
    // mutations are not retried
    assert_eq!(state.posts.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_bad_api_key_renders_failed_state_after_one_retry() -> Result<()> {
    let state = MockState::seeded();
    let mut console = console_for(spawn_mock(state.clone()).await?, "sk_wrong")?;

    let page = run(&mut console, "go /transactions").await;
    assert!(page.contains("Failed to load transactions. Please try again later."));
    assert_eq!(state.transaction_gets.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_webhook_endpoint_creation() -> Result<()> {
    let state = MockState::seeded();
    let mut console = console_for(spawn_mock(state.clone()).await?, API_KEY)?;

    let page = run(&mut console, "go /webhooks").await;
    assert!(page.contains("payment.succeeded"));
    assert!(page.contains("No endpoints configured"));
    assert_eq!(state.event_gets.load(Ordering::SeqCst), 1);

    run(&mut console, "set url https://example.com/webhooks").await;
    run(&mut console, "set events payment_authorized, payment_captured").await;
    let page = run(&mut console, "submit").await;

    assert!(page.contains("Added webhook endpoint https://example.com/webhooks"));
    assert!(page.contains("payment_authorized, payment_captured"));
    assert_eq!(state.event_gets.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_unknown_paths_and_commands() -> Result<()> {
    let state = MockState::seeded();
    let mut console = console_for(spawn_mock(state).await?, API_KEY)?;

    let page = run(&mut console, "/does-not-exist").await;
    assert!(page.contains("404"));
    assert!(page.contains("/does-not-exist"));

    let docs = run(&mut console, "go /api-docs").await;
    assert!(docs.contains("POST /payments/authorize"));

    assert_eq!(
        handle_line(&mut console, "set amount 5").await,
        Err(CommandError::NoForm("/api-docs".to_string()))
    );
    assert_eq!(
        handle_line(&mut console, "dance").await,
        Err(CommandError::Unknown("dance".to_string()))
    );
    assert_eq!(handle_line(&mut console, "quit").await, Ok(Outcome::Quit));
    Ok(())
}

#[tokio::test]
async fn test_first_visit_emits_loading_screen() -> Result<()> {
    let state = MockState::seeded();
    let (mut console, mut updates) = console_with(config_for(spawn_mock(state).await?), QueryClient::new())?;

    assert!(console.is_loading());
    let page = run(&mut console, "go /transactions").await;
    assert!(page.contains("txn_1abc"));

    let loading = updates.try_recv()?;
    assert!(loading.contains("Loading transactions..."));
    assert!(loading.contains("API Status: Unknown"));
    assert!(loading.contains("[Transactions]"));

    // cached now, so filtering renders straight away
    assert!(!console.is_loading());
    run(&mut console, "search amazon").await;
    assert!(updates.try_recv().is_err());

    run(&mut console, "go /webhooks").await;
    let loading = updates.try_recv()?;
    assert!(loading.contains("Loading endpoints..."));
    assert!(loading.contains("Loading events..."));
    assert!(loading.contains("API Status: Healthy"));
    Ok(())
}

#[tokio::test]
async fn test_metrics_poller_runs_only_on_dashboard() -> Result<()> {
    let state = MockState::seeded();
    let queries = QueryClient {
        metrics: Query::with_options(
            QueryKey::Metrics,
            QueryOptions {
                refetch_interval: Some(Duration::from_millis(50)),
                ..QueryKey::Metrics.options()
            },
        ),
        ..QueryClient::new()
    };
    let (mut console, mut updates) = console_with(config_for(spawn_mock(state.clone()).await?), queries)?;

    run(&mut console, "go /transactions").await;
    assert!(!console.is_polling_metrics());

    run(&mut console, "go /").await;
    assert!(console.is_polling_metrics());
    while updates.try_recv().is_ok() {}
    let before = state.metrics_gets.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(state.metrics_gets.load(Ordering::SeqCst) > before);

    let screen = updates.try_recv()?;
    assert!(screen.contains("[Dashboard]"));
    assert!(screen.contains("API Status: Healthy"));
    assert!(screen.contains("Dashboard Overview"));
    assert!(screen.contains("PaySim Sandbox\n"));

    run(&mut console, "go /transactions").await;
    assert!(!console.is_polling_metrics());
    tokio::time::sleep(Duration::from_millis(20)).await;
    let stopped_at = state.metrics_gets.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(state.metrics_gets.load(Ordering::SeqCst), stopped_at);
    Ok(())
}
