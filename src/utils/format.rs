use chrono::{DateTime, NaiveDateTime, Utc};

/// Format minor units as a major-unit amount, e.g. 123456 USD -> "$1,234.56"
pub fn format_money(minor_units: i64, currency: &str) -> String {
    let sign = if minor_units < 0 { "-" } else { "" };
    let abs = minor_units.unsigned_abs();
    let major = group_thousands(abs / 100);
    let cents = abs % 100;

    match currency_symbol(currency) {
        Some(symbol) => format!("{}{}{}.{:02}", sign, symbol, major, cents),
        None => format!("{}{}.{:02} {}", sign, major, cents, currency),
    }
}

fn currency_symbol(currency: &str) -> Option<&'static str> {
    match currency.to_uppercase().as_str() {
        "USD" => Some("$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        "CAD" => Some("CA$"),
        _ => None,
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Signed percentage with one decimal, e.g. "+8.3%"
pub fn format_change(rate: f64) -> String {
    if rate >= 0.0 {
        format!("+{:.1}%", rate)
    } else {
        format!("{:.1}%", rate)
    }
}

/// Parse an API timestamp. Accepts RFC 3339 and naive ISO-8601 (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Calendar date of a timestamp, or the raw text when unparseable
pub fn format_date(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// "2 minutes ago" style age of `raw` relative to `now`
pub fn time_ago(raw: &str, now: DateTime<Utc>) -> String {
    let Some(then) = parse_timestamp(raw) else {
        return raw.to_string();
    };

    let secs = (now - then).num_seconds();
    if secs < 60 {
        return "just now".to_string();
    }

    let (value, unit) = if secs < 3_600 {
        (secs / 60, "minute")
    } else if secs < 86_400 {
        (secs / 3_600, "hour")
    } else {
        (secs / 86_400, "day")
    };
    let plural = if value == 1 { "" } else { "s" };
    format!("{} {}{} ago", value, unit, plural)
}

/// Host part of a URL, for compact tables
pub fn url_host(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    rest.split(['/', '?', '#']).next().unwrap_or(rest)
}
