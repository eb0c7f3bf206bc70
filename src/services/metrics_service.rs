use crate::api::paysim::Metrics;
use crate::query::QueryState;
use crate::utils::errors::load_failed_message;
use crate::utils::format::{format_change, format_money};
use crate::utils::Table;

const CHART_WIDTH: usize = 40;
const WEEKDAY_LABELS: [&str; 7] = ["D-6", "D-5", "D-4", "D-3", "D-2", "D-1", "Today"];

/// Body of the `/` page
pub fn render_dashboard(state: &QueryState<Metrics>) -> String {
    let mut out = String::from("Dashboard Overview\n\n");

    let metrics = match state {
        QueryState::Loading => {
            out.push_str("Loading metrics...\n");
            return out;
        }
        QueryState::Failed(_) => {
            out.push_str(&load_failed_message("metrics"));
            out.push('\n');
            return out;
        }
        QueryState::Ready(metrics) => metrics,
    };

    out.push_str(&render_cards(metrics));
    out.push('\n');

    if let Some(line) = render_api_health(metrics) {
        out.push_str(&line);
        out.push_str("\n\n");
    }

    out.push_str("Payments Volume (last 7 days)\n");
    out.push_str(&render_volume_chart(&metrics.daily_volume));
    out.push('\n');

    let mut table = Table::new(&["Type", "Count"]);
    for entry in &metrics.transaction_types {
        table.add_row(vec![entry.kind.clone(), entry.count.to_string()]);
    }
    if !table.is_empty() {
        out.push_str("Transactions by Type\n");
        out.push_str(&table.render());
        out.push('\n');
    }

    out.push_str("Recent Activity\n");
    if metrics.recent_activity.is_empty() {
        out.push_str("  No recent activity\n");
    }
    for item in &metrics.recent_activity {
        let when = item.time_ago.as_deref().unwrap_or(&item.timestamp);
        out.push_str(&format!("  - [{}] {} ({})\n", item.kind, item.description, when));
    }

    out
}

fn render_cards(metrics: &Metrics) -> String {
    let cards = [
        (
            "Total Volume",
            format_money(metrics.total_volume, "USD"),
            format_change(metrics.volume_growth_rate),
        ),
        (
            "Total Transactions",
            metrics.total_transactions.to_string(),
            format_change(metrics.transaction_growth_rate),
        ),
        (
            "Success Rate",
            format!("{:.1}%", metrics.success_rate),
            format_change(metrics.success_rate_change),
        ),
        (
            "Active Merchants",
            metrics.active_merchants.to_string(),
            format_change(metrics.merchant_growth_rate),
        ),
    ];

    let mut table = Table::new(&["Metric", "Value", "Change"]);
    for (label, value, change) in cards {
        table.add_row(vec![label.to_string(), value, format!("{} this week", change)]);
    }
    table.render()
}

fn render_api_health(metrics: &Metrics) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(p95) = metrics.api_latency_p95 {
        parts.push(format!("API Latency (P95): {:.0}ms", p95));
    }
    if let Some(rate) = metrics.error_rate {
        parts.push(format!("Error Rate: {:.1}%", rate));
    }
    if let Some(tps) = metrics.tps {
        parts.push(format!("TPS: {:.1}", tps));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("  |  "))
    }
}

/// Horizontal bar per day, scaled to the busiest day
pub fn render_volume_chart(daily_volume: &[i64]) -> String {
    if daily_volume.is_empty() {
        return "  No volume data\n".to_string();
    }

    let max = daily_volume.iter().copied().max().unwrap_or(0).max(1);
    let offset = WEEKDAY_LABELS.len().saturating_sub(daily_volume.len());
    let mut out = String::new();

    for (i, &volume) in daily_volume.iter().enumerate() {
        let label = WEEKDAY_LABELS
            .get(i + offset)
            .map(|l| l.to_string())
            .unwrap_or_else(|| format!("#{}", i + 1));
        let bar_len = (volume.max(0) as u128 * CHART_WIDTH as u128 / max as u128) as usize;
        out.push_str(&format!(
            "  {:>5} {:<width$} {}\n",
            label,
            "#".repeat(bar_len),
            format_money(volume, "USD"),
            width = CHART_WIDTH
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::paysim::models::{ActivityItem, TransactionTypeCount};
    use crate::api::paysim::ApiError;
    use std::sync::Arc;

    fn metrics() -> Metrics {
        Metrics {
            total_transactions: 50,
            total_volume: 1234000,
            success_rate: 95.2,
            active_merchants: 10,
            transaction_growth_rate: 12.5,
            volume_growth_rate: 8.3,
            success_rate_change: -2.1,
            merchant_growth_rate: 15.0,
            daily_volume: vec![50000, 100000, 200000],
            transaction_types: vec![TransactionTypeCount { kind: "capture".into(), count: 20 }],
            recent_activity: vec![ActivityItem {
                kind: "webhook".into(),
                description: "Webhook delivered successfully".into(),
                timestamp: "2024-07-01T10:00:00".into(),
                time_ago: Some("5 minutes ago".into()),
            }],
            api_latency_p95: Some(42.0),
            error_rate: None,
            tps: None,
        }
    }

    #[test]
    fn test_dashboard_cards_and_feed() {
        let page = render_dashboard(&QueryState::Ready(Arc::new(metrics())));
        assert!(page.contains("$12,340.00"));
        assert!(page.contains("+8.3% this week"));
        assert!(page.contains("-2.1% this week"));
        assert!(page.contains("95.2%"));
        assert!(page.contains("API Latency (P95): 42ms"));
        assert!(!page.contains("Error Rate"));
        assert!(page.contains("Webhook delivered successfully (5 minutes ago)"));
        assert!(page.contains("capture"));
    }

    #[test]
    fn test_volume_chart_scales_to_max() {
        let chart = render_volume_chart(&[50000, 100000, 200000]);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("D-2"));
        assert!(lines[2].contains("Today"));
        assert_eq!(lines[2].matches('#').count(), CHART_WIDTH);
        assert_eq!(lines[0].matches('#').count(), CHART_WIDTH / 4);
        assert_eq!(render_volume_chart(&[]), "  No volume data\n");
    }

    #[test]
    fn test_dashboard_states() {
        assert!(render_dashboard(&QueryState::Loading).contains("Loading metrics..."));
        let failed = QueryState::Failed(ApiError::Forbidden("nope".into()));
        let page = render_dashboard(&failed);
        assert!(page.contains("Failed to load metrics. Please try again later."));
        assert!(!page.contains("nope"));
    }
}
