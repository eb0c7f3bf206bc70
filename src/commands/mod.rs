pub mod router;

use thiserror::Error;
use tracing::debug;

use crate::api::paysim::TransactionType;
use crate::commands::router::Route;
use crate::console::Console;
use crate::models::form::FormError;
use crate::models::{PaymentForm, WebhookEndpointForm};
use crate::services::payment_service::SubmitError;

pub const HELP: &str = "\
Commands
  go <path>              open a page: /, /transactions, /webhooks, /api-docs
  /<path>                same as go
  refresh                re-fetch the data on this page
  search [term]          filter transactions by id, merchant or status (empty clears)
  type <type|all>        filter transactions by authorization, capture or refund
  set <field> <value>    edit the form on this page
  submit                 submit the form on this page
  reset                  clear the form on this page
  help                   show this help
  quit                   leave the console";

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Unknown command '{0}'. Type `help` for a list of commands.")]
    Unknown(String),
    #[error("There is no form on {0}. Forms live on /transactions and /webhooks.")]
    NoForm(String),
    #[error("{0}")]
    Form(#[from] FormError),
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Output(String),
    Quit,
}

/// Run one line of console input
pub async fn handle_line(console: &mut Console, line: &str) -> Result<Outcome, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Outcome::Output(String::new()));
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    debug!("command {:?} args {:?}", command, rest);

    if command.starts_with('/') {
        console.navigate(line);
        return Ok(Outcome::Output(console.render().await));
    }

    let output = match command.to_lowercase().as_str() {
        "go" | "open" => {
            if rest.is_empty() {
                return Err(CommandError::Usage("go <path>"));
            }
            console.navigate(rest);
            console.render().await
        }
        "refresh" | "r" => {
            console.refresh();
            console.render().await
        }
        "search" => {
            console.filter.search = rest.to_string();
            show_transactions(console).await
        }
        "type" => {
            console.filter.kind = match rest.to_lowercase().as_str() {
                "" => return Err(CommandError::Usage("type <authorization|capture|refund|all>")),
                "all" => None,
                other => Some(TransactionType::parse(other).ok_or(FormError::InvalidValue {
                    field: "type",
                    value: other.to_string(),
                })?),
            };
            show_transactions(console).await
        }
        "set" => {
            let (field, value) = rest
                .split_once(char::is_whitespace)
                .map(|(f, v)| (f, v.trim()))
                .unwrap_or((rest, ""));
            if field.is_empty() {
                return Err(CommandError::Usage("set <field> <value>"));
            }
            match console.route() {
                Route::Transactions => console.payment_form.set(field, value)?,
                Route::Webhooks => console.webhook_form.set(field, value)?,
                other => return Err(CommandError::NoForm(other.path().to_string())),
            }
            console.render().await
        }
        "submit" => {
            ensure_form(console.route())?;
            let message = match console.submit().await {
                Ok(message) => message,
                Err(SubmitError::Form(e)) => return Err(e.into()),
                // inline form error is rendered with the page
                Err(SubmitError::Api(_)) => String::new(),
            };
            let page = console.render().await;
            if message.is_empty() {
                page
            } else {
                format!("{}\n\n{}", message, page)
            }
        }
        "reset" => {
            match ensure_form(console.route())? {
                FormPage::Payment => console.payment_form = PaymentForm::new(),
                FormPage::Webhook => console.webhook_form = WebhookEndpointForm::new(),
            }
            console.render().await
        }
        "help" | "?" => HELP.to_string(),
        "quit" | "exit" | "q" => return Ok(Outcome::Quit),
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(Outcome::Output(output))
}

enum FormPage {
    Payment,
    Webhook,
}

fn ensure_form(route: &Route) -> Result<FormPage, CommandError> {
    match route {
        Route::Transactions => Ok(FormPage::Payment),
        Route::Webhooks => Ok(FormPage::Webhook),
        other => Err(CommandError::NoForm(other.path().to_string())),
    }
}

async fn show_transactions(console: &mut Console) -> String {
    if *console.route() != Route::Transactions {
        console.navigate(Route::Transactions.path());
    }
    console.render().await
}
