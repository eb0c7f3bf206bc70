use crate::api::paysim::{ApiError, ErrorKind};

/// Generic failed-state text for a data view. Details stay in the log.
pub fn load_failed_message(what: &str) -> String {
    format!("Failed to load {}. Please try again later.", what)
}

/// One-line hint for the status line after a failed request
pub fn status_hint(error: &ApiError) -> &'static str {
    match error.kind() {
        ErrorKind::Network => "API unreachable",
        ErrorKind::Status => "API returned an error",
        ErrorKind::Other => "Unexpected API response",
    }
}
