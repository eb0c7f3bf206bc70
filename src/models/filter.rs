use crate::api::paysim::{Transaction, TransactionType};

/// Search box and type selector of the transactions page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub search: String,
    pub kind: Option<TransactionType>,
}

impl TransactionFilter {
    pub fn is_active(&self) -> bool {
        self.is_active_search() || self.kind.is_some()
    }

    fn is_active_search(&self) -> bool {
        !self.search.trim().is_empty()
    }

    /// Whether a transaction passes both the search term and the type selector
    pub fn matches(&self, tx: &Transaction) -> bool {
        if let Some(kind) = self.kind {
            if tx.kind != kind {
                return false;
            }
        }

        // matched as typed; only a blank box counts as no search
        if !self.is_active_search() {
            return true;
        }
        let term = self.search.to_lowercase();

        tx.transaction_id.to_lowercase().contains(&term)
            || tx.merchant_id.to_lowercase().contains(&term)
            || tx.status.as_str().contains(&term)
    }

    pub fn describe(&self) -> String {
        let search = if self.search.trim().is_empty() {
            "(none)".to_string()
        } else {
            format!("\"{}\"", self.search)
        };
        let kind = self.kind.map(|k| k.as_str()).unwrap_or("All Types");
        format!("Search: {}  Type: {}", search, kind)
    }
}
