//! Payment reference text.
//!
//! The storefront encodes a pipe-delimited reference into the QR code shown at
//! checkout: `PROMPTPAY|ORDER:<id>|AMOUNT:<total>|CURRENCY:<code>`. It is
//! display text only and carries no interbank semantics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SCHEME: &str = "PROMPTPAY";

/// Errors that can occur when parsing a payment reference.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaymentReferenceError {
	#[error("Invalid payment reference scheme: {0}")]
	Scheme(String),
	#[error("Missing field in payment reference: {0}")]
	MissingField(&'static str),
	#[error("Invalid amount in payment reference: {0}")]
	Amount(String),
}

/// A parsed payment reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReference {
	pub order_id: String,
	pub amount: u64,
	pub currency: String,
}

impl PaymentReference {
	pub fn new(order_id: impl Into<String>, amount: u64, currency: impl Into<String>) -> Self {
		Self {
			order_id: order_id.into(),
			amount,
			currency: currency.into(),
		}
	}
}

impl fmt::Display for PaymentReference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}|ORDER:{}|AMOUNT:{}|CURRENCY:{}",
			SCHEME, self.order_id, self.amount, self.currency
		)
	}
}

impl FromStr for PaymentReference {
	type Err = PaymentReferenceError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut parts = s.split('|');

		let scheme = parts.next().unwrap_or_default();
		if scheme != SCHEME {
			return Err(PaymentReferenceError::Scheme(scheme.to_string()));
		}

		let mut order_id = None;
		let mut amount = None;
		let mut currency = None;
		for part in parts {
			if let Some(value) = part.strip_prefix("ORDER:") {
				order_id = Some(value.to_string());
			} else if let Some(value) = part.strip_prefix("AMOUNT:") {
				amount = Some(
					value
						.parse::<u64>()
						.map_err(|_| PaymentReferenceError::Amount(value.to_string()))?,
				);
			} else if let Some(value) = part.strip_prefix("CURRENCY:") {
				currency = Some(value.to_string());
			}
		}

		Ok(Self {
			order_id: order_id.ok_or(PaymentReferenceError::MissingField("ORDER"))?,
			amount: amount.ok_or(PaymentReferenceError::MissingField("AMOUNT"))?,
			currency: currency.ok_or(PaymentReferenceError::MissingField("CURRENCY"))?,
		})
	}
}
