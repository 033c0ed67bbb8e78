//! Brevo transactional email provider.
//!
//! Posts to the `/v3/smtp/email` endpoint with the API key in the `api-key`
//! header. The provider answers with the id of the queued message.

use crate::{
	EmailMessage, NotificationInterface, NotificationReceipt, NotifyError, NotifyFactory,
	NotifyRegistry,
};
use async_trait::async_trait;
use crepe_types::{
	http_url_validator, non_empty_validator, ConfigSchema, Field, FieldType,
	ImplementationRegistry, Schema, SecretString, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://api.brevo.com/v3/smtp/email";
const DEFAULT_FROM_NAME: &str = "Crepe Shop";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct BrevoNotifier {
	client: reqwest::Client,
	api_url: String,
	api_key: SecretString,
	from: String,
	from_name: String,
}

#[derive(Debug, Serialize)]
struct Contact<'a> {
	email: &'a str,
	name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailPayload<'a> {
	sender: Contact<'a>,
	to: Vec<Contact<'a>>,
	reply_to: Contact<'a>,
	subject: &'a str,
	html_content: &'a str,
	text_content: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailResponse {
	message_id: Option<String>,
}

impl BrevoNotifier {
	pub fn new(
		api_url: &str,
		api_key: SecretString,
		from: String,
		from_name: String,
	) -> Result<Self, NotifyError> {
		let client = reqwest::Client::builder()
			.timeout(REQUEST_TIMEOUT)
			.build()
			.map_err(|e| NotifyError::Configuration(format!("HTTP client error: {}", e)))?;

		Ok(Self {
			client,
			api_url: api_url.to_string(),
			api_key,
			from,
			from_name,
		})
	}
}

#[async_trait]
impl NotificationInterface for BrevoNotifier {
	async fn send(&self, message: &EmailMessage) -> Result<NotificationReceipt, NotifyError> {
		let sender = || Contact {
			email: &self.from,
			name: &self.from_name,
		};
		let payload = SendEmailPayload {
			sender: sender(),
			to: vec![Contact {
				email: &message.to,
				name: &message.to,
			}],
			reply_to: sender(),
			subject: &message.subject,
			html_content: &message.html,
			text_content: &message.text,
		};

		let response = self
			.client
			.post(&self.api_url)
			.header("api-key", self.api_key.expose_secret())
			.header("Accept", "application/json")
			.json(&payload)
			.send()
			.await
			.map_err(|e| NotifyError::Network(e.to_string()))?;

		if !response.status().is_success() {
			let status = response.status();
			let body = response.text().await.unwrap_or_default();
			return Err(NotifyError::Rejected(format!("{}: {}", status, body)));
		}

		// a 2xx without a parseable body still means the message was queued
		let message_id = response
			.json::<SendEmailResponse>()
			.await
			.ok()
			.and_then(|r| r.message_id);

		Ok(NotificationReceipt { message_id })
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(BrevoNotifierSchema)
	}
}

/// Configuration schema for BrevoNotifier.
pub struct BrevoNotifierSchema;

impl ConfigSchema for BrevoNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("api_key", FieldType::String).with_validator(non_empty_validator),
				Field::new("from", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(address) if crate::is_valid_email(address) => Ok(()),
						_ => Err("must be an email address".to_string()),
					}
				}),
			],
			vec![
				Field::new("from_name", FieldType::String).with_validator(non_empty_validator),
				Field::new("api_url", FieldType::String).with_validator(http_url_validator),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a Brevo notifier from configuration.
///
/// Configuration parameters:
/// - `api_key`: Brevo API key
/// - `from`: sender address
/// - `from_name`: sender display name (default: "Crepe Shop")
/// - `api_url`: endpoint override (default: Brevo production endpoint)
pub fn create_notifier(
	config: &toml::Value,
) -> Result<Box<dyn NotificationInterface>, NotifyError> {
	BrevoNotifierSchema
		.validate(config)
		.map_err(|e| NotifyError::Configuration(e.to_string()))?;

	let get = |key: &str| config.get(key).and_then(|v| v.as_str());
	let api_key = get("api_key")
		.ok_or_else(|| NotifyError::Configuration("api_key is required".into()))?;
	let from = get("from").ok_or_else(|| NotifyError::Configuration("from is required".into()))?;

	let notifier = BrevoNotifier::new(
		get("api_url").unwrap_or(DEFAULT_API_URL),
		SecretString::from(api_key),
		from.to_string(),
		get("from_name").unwrap_or(DEFAULT_FROM_NAME).to_string(),
	)?;
	Ok(Box::new(notifier))
}

/// Registry for the Brevo notifier.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "brevo";
	type Factory = NotifyFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl NotifyRegistry for Registry {}
