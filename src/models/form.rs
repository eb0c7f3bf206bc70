//! Create-form state for the console pages

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::api::paysim::{CreateAuthorizationRequest, CreateWebhookEndpointRequest, TransactionType};

pub const PAYMENT_FAILED_MESSAGE: &str = "Failed to create transaction. Please try again.";
pub const WEBHOOK_FAILED_MESSAGE: &str = "Failed to add webhook endpoint. Please try again.";

#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("Fill in the required fields: {0}")]
    Incomplete(&'static str),
    #[error("A submission is already in progress")]
    Pending,
    #[error("'{0}' is not a valid amount")]
    InvalidAmount(String),
    #[error("Amount must be at least 0.01")]
    AmountNotPositive,
    #[error("Unknown field '{0}'")]
    UnknownField(String),
    #[error("'{value}' is not a valid {field}")]
    InvalidValue { field: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Cad,
}

impl Currency {
    pub const ALL: [Currency; 4] = [Currency::Usd, Currency::Eur, Currency::Gbp, Currency::Cad];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Cad => "CAD",
        }
    }
}

impl FromStr for Currency {
    type Err = FormError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Currency::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(value.trim()))
            .ok_or(FormError::InvalidValue {
                field: "currency",
                value: value.to_string(),
            })
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Convert a decimal major-unit amount ("12.34") to minor units (1234).
///
/// Rounds half away from zero at the cent, so "0.005" becomes 1.
pub fn parse_minor_units(raw: &str) -> Result<i64, FormError> {
    let trimmed = raw.trim();
    let value =
        Decimal::from_str(trimmed).map_err(|_| FormError::InvalidAmount(trimmed.to_string()))?;

    let cents = value
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|v| v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|v| v.to_i64())
        .ok_or_else(|| FormError::InvalidAmount(trimmed.to_string()))?;

    if cents <= 0 {
        return Err(FormError::AmountNotPositive);
    }
    Ok(cents)
}

/// New authorization form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentForm {
    pub amount: String,
    pub currency: Currency,
    pub kind: TransactionType,
    pub merchant_id: String,
    pub description: String,
    pub pending: bool,
    pub error: Option<String>,
}

impl PaymentForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_submit(&self) -> bool {
        !self.pending && !self.amount.trim().is_empty() && !self.merchant_id.trim().is_empty()
    }

    pub fn set(&mut self, field: &str, value: &str) -> Result<(), FormError> {
        match field.to_lowercase().as_str() {
            "amount" => self.amount = value.trim().to_string(),
            "currency" => self.currency = value.parse()?,
            "type" => {
                self.kind = TransactionType::parse(value).ok_or(FormError::InvalidValue {
                    field: "type",
                    value: value.to_string(),
                })?
            }
            "merchant" | "merchant_id" => self.merchant_id = value.trim().to_string(),
            "description" | "desc" => self.description = value.trim().to_string(),
            other => return Err(FormError::UnknownField(other.to_string())),
        }
        Ok(())
    }

    pub fn amount_minor_units(&self) -> Result<i64, FormError> {
        parse_minor_units(&self.amount)
    }

    pub fn to_request(&self) -> Result<CreateAuthorizationRequest, FormError> {
        if self.pending {
            return Err(FormError::Pending);
        }
        if !self.can_submit() {
            return Err(FormError::Incomplete("amount, merchant"));
        }

        Ok(CreateAuthorizationRequest {
            amount: self.amount_minor_units()?,
            currency: self.currency.code().to_string(),
            kind: self.kind,
            merchant_id: self.merchant_id.trim().to_string(),
            description: self.description.clone(),
            metadata: Default::default(),
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn render(&self) -> String {
        let mut out = String::from("Create New Transaction\n");
        out.push_str(&format!("  Amount *       ${}\n", display_or(&self.amount, "0.00")));
        out.push_str(&format!("  Currency       {}\n", self.currency));
        out.push_str(&format!("  Type           {}\n", self.kind));
        out.push_str(&format!("  Merchant ID *  {}\n", display_or(&self.merchant_id, "merchant_123")));
        out.push_str(&format!("  Description    {}\n", display_or(&self.description, "Payment for services")));
        out.push_str(&format!("  {}\n", submit_button("Create Transaction", "Creating...", self.pending, self.can_submit())));
        if let Some(error) = &self.error {
            out.push_str(&format!("  ! {}\n", error));
        }
        out
    }
}

/// New webhook endpoint form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebhookEndpointForm {
    pub url: String,
    pub events: Vec<String>,
    pub description: String,
    pub pending: bool,
    pub error: Option<String>,
}

impl WebhookEndpointForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_submit(&self) -> bool {
        !self.pending && !self.url.trim().is_empty()
    }

    pub fn set(&mut self, field: &str, value: &str) -> Result<(), FormError> {
        match field.to_lowercase().as_str() {
            "url" => self.url = value.trim().to_string(),
            "events" => {
                self.events = value
                    .split(',')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(str::to_string)
                    .collect()
            }
            "description" | "desc" => self.description = value.trim().to_string(),
            other => return Err(FormError::UnknownField(other.to_string())),
        }
        Ok(())
    }

    pub fn to_request(&self) -> Result<CreateWebhookEndpointRequest, FormError> {
        if self.pending {
            return Err(FormError::Pending);
        }
        if !self.can_submit() {
            return Err(FormError::Incomplete("url"));
        }

        Ok(CreateWebhookEndpointRequest {
            url: self.url.trim().to_string(),
            events: self.events.clone(),
            description: self.description.clone(),
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn render(&self) -> String {
        let mut out = String::from("Add Endpoint\n");
        out.push_str(&format!("  URL *          {}\n", display_or(&self.url, "https://example.com/webhooks")));
        let events = if self.events.is_empty() {
            "(none)".to_string()
        } else {
            self.events.join(", ")
        };
        out.push_str(&format!("  Events         {}\n", events));
        out.push_str(&format!("  Description    {}\n", display_or(&self.description, "")));
        out.push_str(&format!("  {}\n", submit_button("Add Endpoint", "Adding...", self.pending, self.can_submit())));
        if let Some(error) = &self.error {
            out.push_str(&format!("  ! {}\n", error));
        }
        out
    }
}

fn display_or<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() {
        placeholder
    } else {
        value
    }
}

fn submit_button(label: &str, pending_label: &str, pending: bool, enabled: bool) -> String {
    if pending {
        format!("[{}]", pending_label)
    } else if enabled {
        format!("[{}]  (submit)", label)
    } else {
        format!("[{}]  (disabled)", label)
    }
}
