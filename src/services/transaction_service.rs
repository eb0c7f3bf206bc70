use crate::api::paysim::Transaction;
use crate::models::{PaymentForm, TransactionFilter};
use crate::query::QueryState;
use crate::utils::errors::load_failed_message;
use crate::utils::format::{format_date, format_money};
use crate::utils::Table;

pub const NO_MATCH_MESSAGE: &str = "No transactions match your filters.";
pub const NO_TRANSACTIONS_MESSAGE: &str = "No transactions found.";

/// Rows of an already-fetched list that pass the filter, in their original order
pub fn filter_transactions<'a>(
    transactions: &'a [Transaction],
    filter: &TransactionFilter,
) -> Vec<&'a Transaction> {
    transactions.iter().filter(|tx| filter.matches(tx)).collect()
}

pub fn render_transaction_table(transactions: &[&Transaction]) -> String {
    let mut table = Table::new(&["ID", "Type", "Amount", "Status", "Date", "Merchant"]);
    for tx in transactions {
        table.add_row(vec![
            tx.transaction_id.clone(),
            tx.kind.to_string(),
            format_money(tx.amount, &tx.currency),
            tx.status.to_string(),
            format_date(&tx.created_at),
            tx.merchant_id.clone(),
        ]);
    }
    table.render()
}

/// Body of the `/transactions` page
pub fn render_transactions_page(
    state: &QueryState<Vec<Transaction>>,
    filter: &TransactionFilter,
    form: &PaymentForm,
) -> String {
    let mut out = String::from("Transactions\n");
    out.push_str(&format!("{}\n\n", filter.describe()));

    match state {
        QueryState::Loading => out.push_str("Loading transactions...\n"),
        QueryState::Failed(_) => {
            out.push_str(&load_failed_message("transactions"));
            out.push('\n');
        }
        QueryState::Ready(transactions) => {
            let visible = filter_transactions(transactions, filter);
            if visible.is_empty() {
                let message = if filter.is_active() {
                    NO_MATCH_MESSAGE
                } else {
                    NO_TRANSACTIONS_MESSAGE
                };
                out.push_str(message);
                out.push('\n');
            } else {
                out.push_str(&render_transaction_table(&visible));
                out.push_str(&format!(
                    "Showing {} of {} transactions\n",
                    visible.len(),
                    transactions.len()
                ));
            }
            out.push_str("Pagination coming soon...\n");
        }
    }

    out.push('\n');
    out.push_str(&form.render());
    out
}
