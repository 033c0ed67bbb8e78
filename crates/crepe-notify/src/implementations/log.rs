//! Notifier that writes emails to the log instead of sending them.
//!
//! Used in development and tests. Every message is accepted and given a
//! fabricated `log-` message id.

use crate::{
	EmailMessage, NotificationInterface, NotificationReceipt, NotifyError, NotifyFactory,
	NotifyRegistry,
};
use async_trait::async_trait;
use crepe_types::{
	non_empty_validator, ConfigSchema, Field, FieldType, ImplementationRegistry, Schema,
	ValidationError,
};

pub struct LogNotifier {
	from: Option<String>,
}

impl LogNotifier {
	pub fn new(from: Option<String>) -> Self {
		Self { from }
	}
}

#[async_trait]
impl NotificationInterface for LogNotifier {
	async fn send(&self, message: &EmailMessage) -> Result<NotificationReceipt, NotifyError> {
		let message_id = format!("log-{}", uuid::Uuid::new_v4().simple());
		tracing::info!(
			from = self.from.as_deref().unwrap_or("-"),
			to = %message.to,
			subject = %message.subject,
			message_id = %message_id,
			"Email not sent, logged instead"
		);
		tracing::debug!(body = %message.text);
		Ok(NotificationReceipt {
			message_id: Some(message_id),
		})
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LogNotifierSchema)
	}
}

/// Configuration schema for LogNotifier.
pub struct LogNotifierSchema;

impl ConfigSchema for LogNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![Field::new("from", FieldType::String).with_validator(non_empty_validator)],
		)
		.validate(config)
	}
}

/// Factory function to create a log notifier from configuration.
pub fn create_notifier(
	config: &toml::Value,
) -> Result<Box<dyn NotificationInterface>, NotifyError> {
	LogNotifierSchema
		.validate(config)
		.map_err(|e| NotifyError::Configuration(e.to_string()))?;

	let from = config
		.get("from")
		.and_then(|v| v.as_str())
		.map(str::to_string);
	Ok(Box::new(LogNotifier::new(from)))
}

/// Registry for the log notifier.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "log";
	type Factory = NotifyFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl NotifyRegistry for Registry {}
