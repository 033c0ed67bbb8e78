//! Order confirmation emails for the crepe shop.
//!
//! The core never depends on a particular email provider. It hands an order
//! and an address to [`NotificationService`] and only looks at whether the
//! send succeeded and which message id the provider assigned.

use async_trait::async_trait;
use crepe_types::{truncate_id, ConfigSchema, ImplementationRegistry, Order};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod brevo;
	pub mod log;
}

pub const MAX_SUBJECT_LENGTH: usize = 100;
pub const MAX_CONTENT_LENGTH: usize = 10_000;

static EMAIL_REGEX: Lazy<Option<Regex>> =
	Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// Errors that can occur while sending a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
	/// The message failed validation before being sent.
	#[error("Invalid message: {0}")]
	InvalidMessage(String),
	/// The provider could not be reached.
	#[error("Network error: {0}")]
	Network(String),
	/// The provider refused the message.
	#[error("Provider rejected message: {0}")]
	Rejected(String),
	/// The backend configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// A rendered email ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
	pub to: String,
	pub subject: String,
	pub html: String,
	pub text: String,
}

impl EmailMessage {
	/// Checks the recipient address and the subject and body lengths.
	pub fn validate(&self) -> Result<(), NotifyError> {
		if !is_valid_email(&self.to) {
			return Err(NotifyError::InvalidMessage(format!(
				"invalid recipient address '{}'",
				self.to
			)));
		}
		if self.subject.trim().is_empty() {
			return Err(NotifyError::InvalidMessage("subject is empty".into()));
		}
		if self.subject.chars().count() > MAX_SUBJECT_LENGTH {
			return Err(NotifyError::InvalidMessage(format!(
				"subject exceeds {} characters",
				MAX_SUBJECT_LENGTH
			)));
		}
		if self.html.chars().count() > MAX_CONTENT_LENGTH
			|| self.text.chars().count() > MAX_CONTENT_LENGTH
		{
			return Err(NotifyError::InvalidMessage(format!(
				"content exceeds {} characters",
				MAX_CONTENT_LENGTH
			)));
		}
		Ok(())
	}
}

/// Returns true for addresses of the form `local@domain.tld`.
pub fn is_valid_email(address: &str) -> bool {
	EMAIL_REGEX
		.as_ref()
		.is_some_and(|re| re.is_match(address))
}

/// What the provider returned for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationReceipt {
	pub message_id: Option<String>,
}

/// Result of a notification attempt as seen by the rest of the shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOutcome {
	pub success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message_id: Option<String>,
}

/// Interface for email providers.
#[async_trait]
pub trait NotificationInterface: Send + Sync {
	/// Sends a validated message.
	async fn send(&self, message: &EmailMessage) -> Result<NotificationReceipt, NotifyError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for notification factory functions.
pub type NotifyFactory = fn(&toml::Value) -> Result<Box<dyn NotificationInterface>, NotifyError>;

/// Registry trait for notification implementations.
pub trait NotifyRegistry: ImplementationRegistry<Factory = NotifyFactory> {}

/// Returns all built-in notification implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, NotifyFactory)> {
	use implementations::{brevo, log};

	vec![
		(brevo::Registry::NAME, brevo::Registry::factory()),
		(log::Registry::NAME, log::Registry::factory()),
	]
}

/// Renders the order confirmation email for `order`.
pub fn order_confirmation(to: &str, order: &Order, shop_name: &str) -> EmailMessage {
	let subject = format!("Order Confirmation #{} - {}", order.id, shop_name);
	let date = order.created_at.format("%Y-%m-%d");

	let mut rows = String::new();
	let mut lines = String::new();
	for (index, item) in order.items.iter().enumerate() {
		let mut extras: Vec<&str> = item.toppings.iter().map(String::as_str).collect();
		extras.extend(item.sauces.iter().map(String::as_str));
		if item.whipped {
			extras.push("whipped cream");
		}
		let description = if extras.is_empty() {
			"plain".to_string()
		} else {
			extras.join(", ")
		};
		rows.push_str(&format!(
			"<tr><td>Crepe {}</td><td>{}</td><td>{} THB</td></tr>",
			index + 1,
			html_escape(&description),
			item.total
		));
		lines.push_str(&format!(
			"- Crepe {}: {} ({} THB)\n",
			index + 1,
			description,
			item.total
		));
	}

	let html = format!(
		"<!DOCTYPE html><html><body>\
		<h1>{shop}</h1>\
		<p>Thank you for your order! We've received your order and will prepare it with care.</p>\
		<p><strong>Order #{id}</strong><br>Status: {status}<br>Total: {total} THB<br>Order Date: {date}</p>\
		<table>{rows}</table>\
		</body></html>",
		shop = html_escape(shop_name),
		id = html_escape(&order.id),
		status = order.status,
		total = order.total_amount,
		date = date,
		rows = rows,
	);

	let text = format!(
		"Order Confirmation - {shop}\n\n\
		Thank you for your order! We've received your order and will prepare it with care.\n\n\
		Order #{id}\nStatus: {status}\nTotal: {total} THB\nOrder Date: {date}\n\n{lines}",
		shop = shop_name,
		id = order.id,
		status = order.status,
		total = order.total_amount,
		date = date,
		lines = lines,
	);

	EmailMessage {
		to: to.to_string(),
		subject,
		html,
		text,
	}
}

fn html_escape(value: &str) -> String {
	value
		.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
		.replace('"', "&quot;")
}

/// Sends shop emails through the configured provider.
pub struct NotificationService {
	backend: Box<dyn NotificationInterface>,
	shop_name: String,
}

impl NotificationService {
	pub fn new(backend: Box<dyn NotificationInterface>, shop_name: impl Into<String>) -> Self {
		Self {
			backend,
			shop_name: shop_name.into(),
		}
	}

	/// Sends an order confirmation. Failures are logged and reported as
	/// `success: false`.
	pub async fn send_order_confirmation(&self, to: &str, order: &Order) -> NotificationOutcome {
		let message = order_confirmation(to, order, &self.shop_name);

		let result = match message.validate() {
			Ok(()) => self.backend.send(&message).await,
			Err(e) => Err(e),
		};

		match result {
			Ok(receipt) => {
				tracing::info!(
					order_id = %truncate_id(&order.id),
					message_id = ?receipt.message_id,
					"Sent order confirmation"
				);
				NotificationOutcome {
					success: true,
					message_id: receipt.message_id,
				}
			}
			Err(e) => {
				tracing::warn!(
					order_id = %truncate_id(&order.id),
					error = %e,
					"Failed to send order confirmation"
				);
				NotificationOutcome {
					success: false,
					message_id: None,
				}
			}
		}
	}
}
