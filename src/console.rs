//! Console session state: current page, filters, forms and background pollers

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::paysim::{
    HealthStatus, Metrics, PaySimClient, Transaction, WebhookEndpoint, WebhookEvent,
};
use crate::commands::router::{self, Route};
use crate::models::{PaymentForm, TransactionFilter, WebhookEndpointForm};
use crate::query::{spawn_refetch, QueryClient, QueryKey, QueryState};
use crate::services::payment_service::{self, SubmitError};
use crate::services::{docs_service, metrics_service, transaction_service, webhook_service};

pub struct Console {
    client: Arc<PaySimClient>,
    queries: Arc<QueryClient>,
    updates: UnboundedSender<String>,
    route: Route,
    pub filter: TransactionFilter,
    pub payment_form: PaymentForm,
    pub webhook_form: WebhookEndpointForm,
    metrics_poller: Option<JoinHandle<()>>,
    health_poller: Option<JoinHandle<()>>,
}

impl Console {
    /// `updates` receives full screens rendered outside a command: loading screens
    /// and interval refetches
    pub fn new(client: Arc<PaySimClient>, queries: Arc<QueryClient>, updates: UnboundedSender<String>) -> Self {
        Console {
            client,
            queries,
            updates,
            route: Route::Dashboard,
            filter: TransactionFilter::default(),
            payment_form: PaymentForm::new(),
            webhook_form: WebhookEndpointForm::new(),
            metrics_poller: None,
            health_poller: None,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    /// Start the API health poller and open the dashboard
    pub fn start(&mut self) {
        if self.health_poller.is_none() {
            if let Some(every) = self.queries.health.options().refetch_interval {
                let client = Arc::clone(&self.client);
                let queries = Arc::clone(&self.queries);
                self.health_poller = Some(spawn_refetch(self.queries.health.key(), every, move || {
                    let client = Arc::clone(&client);
                    let queries = Arc::clone(&queries);
                    async move {
                        queries.health.refetch(|| client.health()).await;
                    }
                }));
            }
        }
        self.sync_pollers();
    }

    pub fn navigate(&mut self, path: &str) -> &Route {
        self.route = Route::resolve(path);
        info!("Navigated to {} ({})", self.route.path(), self.route.label());
        self.sync_pollers();
        &self.route
    }

    /// Metrics auto-refetch runs only while the dashboard is shown
    fn sync_pollers(&mut self) {
        if self.route != Route::Dashboard {
            if let Some(handle) = self.metrics_poller.take() {
                handle.abort();
                debug!("metrics poller stopped");
            }
            return;
        }

        if self.metrics_poller.is_some() {
            return;
        }
        let Some(every) = self.queries.metrics.options().refetch_interval else {
            return;
        };

        let client = Arc::clone(&self.client);
        let queries = Arc::clone(&self.queries);
        let updates = self.updates.clone();
        self.metrics_poller = Some(spawn_refetch(self.queries.metrics.key(), every, move || {
            let client = Arc::clone(&client);
            let queries = Arc::clone(&queries);
            let updates = updates.clone();
            async move {
                let state = queries.metrics.refetch(|| client.get_metrics()).await;
                let body = metrics_service::render_dashboard(&state);
                let _ = updates.send(render_screen(&Route::Dashboard, &queries.health.peek(), &body));
            }
        }));
        debug!("metrics poller started");
    }

    pub fn is_polling_metrics(&self) -> bool {
        self.metrics_poller.is_some()
    }

    pub fn stop(&mut self) {
        for handle in [self.metrics_poller.take(), self.health_poller.take()].into_iter().flatten() {
            handle.abort();
        }
    }

    pub async fn transactions(&self) -> QueryState<Vec<Transaction>> {
        let client = &self.client;
        self.queries.transactions.fetch(move || client.list_transactions()).await
    }

    pub async fn metrics(&self) -> QueryState<Metrics> {
        let client = &self.client;
        self.queries.metrics.fetch(move || client.get_metrics()).await
    }

    pub async fn webhook_events(&self) -> QueryState<Vec<WebhookEvent>> {
        let client = &self.client;
        self.queries.webhook_events.fetch(move || client.list_webhook_events()).await
    }

    pub async fn webhook_endpoints(&self) -> QueryState<Vec<WebhookEndpoint>> {
        let client = &self.client;
        self.queries.webhook_endpoints.fetch(move || client.list_webhook_endpoints()).await
    }

    pub async fn health(&self) -> QueryState<HealthStatus> {
        let client = &self.client;
        self.queries.health.fetch(move || client.health()).await
    }

    /// Queries the current page reads
    pub fn route_queries(&self) -> &'static [QueryKey] {
        match self.route {
            Route::Dashboard => &[QueryKey::Metrics],
            Route::Transactions => &[QueryKey::Transactions],
            Route::Webhooks => &[QueryKey::WebhookEndpoints, QueryKey::WebhookEvents],
            Route::ApiDocs | Route::NotFound(_) => &[],
        }
    }

    /// Mark the current page's data stale (and the API status)
    pub fn refresh(&self) {
        for key in self.route_queries() {
            self.queries.invalidate(*key);
        }
        self.queries.invalidate(QueryKey::Health);
    }

    /// Whether the current page or the API status has nothing to show yet
    pub fn is_loading(&self) -> bool {
        self.route_queries()
            .iter()
            .chain(&[QueryKey::Health])
            .any(|key| self.queries.is_loading(*key))
    }

    /// Fetch what the current page reads, plus the API status
    async fn load(&self) {
        self.health().await;
        for key in self.route_queries() {
            match key {
                QueryKey::Transactions => {
                    self.transactions().await;
                }
                QueryKey::Metrics => {
                    self.metrics().await;
                }
                QueryKey::WebhookEvents => {
                    self.webhook_events().await;
                }
                QueryKey::WebhookEndpoints => {
                    self.webhook_endpoints().await;
                }
                QueryKey::Health => {}
            }
        }
    }

    /// Full screen from the cache as it stands, without fetching
    pub fn render_cached(&self) -> String {
        let queries = &self.queries;
        let body = match &self.route {
            Route::Dashboard => metrics_service::render_dashboard(&queries.metrics.peek()),
            Route::Transactions => transaction_service::render_transactions_page(
                &queries.transactions.peek(),
                &self.filter,
                &self.payment_form,
            ),
            Route::Webhooks => webhook_service::render_webhooks_page(
                &queries.webhook_endpoints.peek(),
                &queries.webhook_events.peek(),
                &self.webhook_form,
                Utc::now(),
            ),
            Route::ApiDocs => docs_service::render_api_docs(self.client.base_url()),
            Route::NotFound(path) => router::render_not_found(path),
        };

        render_screen(&self.route, &queries.health.peek(), &body)
    }

    /// Full screen: navigation, page body, footer.
    ///
    /// When the page has nothing cached yet, its loading screen goes out on the
    /// updates channel before the fetch starts.
    pub async fn render(&self) -> String {
        if self.is_loading() {
            let _ = self.updates.send(self.render_cached());
        }
        self.load().await;
        self.render_cached()
    }

    /// Submit the form on the current page
    pub async fn submit(&mut self) -> Result<String, SubmitError> {
        match self.route {
            Route::Transactions => {
                let tx = payment_service::submit_payment(&self.client, &self.queries, &mut self.payment_form).await?;
                Ok(format!("Created transaction {} ({})", tx.transaction_id, tx.status))
            }
            Route::Webhooks => {
                let endpoint =
                    webhook_service::submit_webhook_endpoint(&self.client, &self.queries, &mut self.webhook_form)
                        .await?;
                Ok(format!("Added webhook endpoint {}", endpoint.url))
            }
            _ => Ok("This page has no form.".to_string()),
        }
    }
}

fn render_screen(route: &Route, health: &QueryState<HealthStatus>, body: &str) -> String {
    format!("{}\n{}\n{}", router::render_nav(route, health), body, router::render_footer())
}

impl Drop for Console {
    fn drop(&mut self) {
        self.stop();
    }
}
