//! PostgREST-compatible remote order store.
//!
//! Inserts rows with `POST {base_url}/rest/v1/{table}` and updates them with
//! `PATCH {base_url}/rest/v1/{table}?id=eq.{id}`. Requests carry the API key in
//! both the `apikey` header and a bearer `Authorization` header.

use crate::{NewOrderRecord, RemoteError, RemoteFactory, RemoteOrderStore, RemoteRegistry};
use async_trait::async_trait;
use crepe_types::{
	http_url_validator, non_empty_validator, ConfigSchema, Field, FieldType,
	ImplementationRegistry, OrderStatus, Schema, SecretString, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TABLE: &str = "orders";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Remote store speaking the PostgREST dialect over HTTP.
pub struct RestRemoteStore {
	client: reqwest::Client,
	base_url: String,
	table: String,
	api_key: SecretString,
}

#[derive(Debug, Deserialize)]
struct InsertedRow {
	id: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct StatusUpdate<'a> {
	status: OrderStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	qr_code: Option<&'a str>,
}

impl RestRemoteStore {
	pub fn new(
		base_url: &str,
		table: &str,
		api_key: SecretString,
		timeout: Duration,
	) -> Result<Self, RemoteError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| RemoteError::Configuration(format!("HTTP client error: {}", e)))?;

		Ok(Self {
			client,
			base_url: base_url.trim_end_matches('/').to_string(),
			table: table.to_string(),
			api_key,
		})
	}

	fn table_url(&self) -> String {
		format!("{}/rest/v1/{}", self.base_url, self.table)
	}

	fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
		let key = self.api_key.expose_secret();
		request
			.header("apikey", key)
			.header("Authorization", format!("Bearer {}", key))
	}

	async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
		if response.status().is_success() {
			return Ok(response);
		}
		let status = response.status();
		let body = response.text().await.unwrap_or_default();
		Err(RemoteError::Rejected(format!("{}: {}", status, body)))
	}
}

#[async_trait]
impl RemoteOrderStore for RestRemoteStore {
	async fn insert_order(&self, record: &NewOrderRecord) -> Result<String, RemoteError> {
		let request = self
			.client
			.post(self.table_url())
			.query(&[("select", "id")])
			.header("Prefer", "return=representation")
			.json(record);

		let response = self
			.authorized(request)
			.send()
			.await
			.map_err(|e| RemoteError::Network(e.to_string()))?;
		let response = Self::check_response(response).await?;

		let rows: Vec<InsertedRow> = response
			.json()
			.await
			.map_err(|e| RemoteError::Rejected(format!("unexpected insert response: {}", e)))?;

		let row = rows
			.into_iter()
			.next()
			.ok_or_else(|| RemoteError::Rejected("insert returned no rows".into()))?;

		let id = match row.id {
			serde_json::Value::String(id) => id,
			serde_json::Value::Number(id) => id.to_string(),
			other => {
				return Err(RemoteError::Rejected(format!(
					"unexpected id type in insert response: {}",
					other
				)))
			}
		};
		tracing::debug!(table = %self.table, remote_id = %id, "Inserted remote order");
		Ok(id)
	}

	async fn update_order(
		&self,
		remote_id: &str,
		status: OrderStatus,
		qr_code: Option<String>,
	) -> Result<(), RemoteError> {
		let filter = format!("eq.{}", remote_id);
		let request = self
			.client
			.patch(self.table_url())
			.query(&[("id", filter.as_str())])
			.json(&StatusUpdate {
				status,
				qr_code: qr_code.as_deref(),
			});

		let response = self
			.authorized(request)
			.send()
			.await
			.map_err(|e| RemoteError::Network(e.to_string()))?;
		Self::check_response(response).await?;
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(RestRemoteSchema)
	}
}

/// Configuration schema for RestRemoteStore.
pub struct RestRemoteSchema;

impl ConfigSchema for RestRemoteSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("base_url", FieldType::String).with_validator(http_url_validator),
				Field::new("api_key", FieldType::String).with_validator(non_empty_validator),
			],
			vec![
				Field::new("table", FieldType::String).with_validator(non_empty_validator),
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a REST remote store from configuration.
///
/// Configuration parameters:
/// - `base_url`: project URL, e.g. "https://xyz.supabase.co"
/// - `api_key`: project API key
/// - `table`: table name (default: "orders")
/// - `timeout_seconds`: request timeout (default: 10)
pub fn create_remote(config: &toml::Value) -> Result<Box<dyn RemoteOrderStore>, RemoteError> {
	RestRemoteSchema
		.validate(config)
		.map_err(|e| RemoteError::Configuration(e.to_string()))?;

	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| RemoteError::Configuration("base_url is required".into()))?;
	let api_key = config
		.get("api_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| RemoteError::Configuration("api_key is required".into()))?;
	let table = config
		.get("table")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_TABLE);
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	let store = RestRemoteStore::new(
		base_url,
		table,
		SecretString::from(api_key),
		Duration::from_secs(timeout),
	)?;
	Ok(Box::new(store))
}

/// Registry for the REST remote store.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "rest";
	type Factory = RemoteFactory;

	fn factory() -> Self::Factory {
		create_remote
	}
}

impl RemoteRegistry for Registry {}
