use chrono::{Datelike, Utc};

use crate::api::paysim::HealthStatus;
use crate::query::QueryState;

/// Console pages, addressed by URL-style path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    Transactions,
    Webhooks,
    ApiDocs,
    NotFound(String),
}

/// Pages reachable from the navigation bar
pub const NAV_ROUTES: [Route; 4] = [Route::Dashboard, Route::Transactions, Route::Webhooks, Route::ApiDocs];

impl Route {
    /// Map a path to a page. Query strings, fragments and a trailing slash are ignored.
    pub fn resolve(path: &str) -> Route {
        let raw = path.trim();
        let without_extras = raw.split(['?', '#']).next().unwrap_or("");
        let normalized = match without_extras.trim_end_matches('/') {
            "" if without_extras.starts_with('/') => "/",
            other => other,
        };

        match normalized {
            "/" => Route::Dashboard,
            "/transactions" => Route::Transactions,
            "/webhooks" => Route::Webhooks,
            "/api-docs" => Route::ApiDocs,
            _ => Route::NotFound(raw.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Dashboard => "/",
            Route::Transactions => "/transactions",
            Route::Webhooks => "/webhooks",
            Route::ApiDocs => "/api-docs",
            Route::NotFound(path) => path,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Route::Dashboard => "Dashboard",
            Route::Transactions => "Transactions",
            Route::Webhooks => "Webhooks",
            Route::ApiDocs => "API Docs",
            Route::NotFound(_) => "Not Found",
        }
    }
}

pub fn api_status_label(health: &QueryState<HealthStatus>) -> &'static str {
    match health {
        QueryState::Ready(status) if status.is_healthy() => "Healthy",
        QueryState::Ready(_) | QueryState::Failed(_) => "Degraded",
        QueryState::Loading => "Unknown",
    }
}

/// Brand line, links (active one bracketed) and API status
pub fn render_nav(active: &Route, health: &QueryState<HealthStatus>) -> String {
    let links: Vec<String> = NAV_ROUTES
        .iter()
        .map(|route| {
            if route == active {
                format!("[{}]", route.label())
            } else {
                format!(" {} ", route.label())
            }
        })
        .collect();

    let mut out = String::from("PaySim Sandbox - Serverless Payments\n");
    out.push_str(&format!(
        "{}    API Status: {}\n",
        links.join(" "),
        api_status_label(health)
    ));
    out.push_str(&"=".repeat(72));
    out.push('\n');
    out
}

pub fn render_footer() -> String {
    format!("(c) {} PaySim Sandbox\n", Utc::now().year())
}

/// Body of the fallback page
pub fn render_not_found(path: &str) -> String {
    format!(
        "404\n\nSorry, the page you're looking for doesn't exist: {}\n\nBack to Dashboard: go /\n",
        path
    )
}
