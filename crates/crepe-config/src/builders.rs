//! Configuration builder for tests and local development.

use crate::{
	ApiConfig, Config, NotifyConfig, PersistenceConfig, RemoteConfig, ShopConfig, StorageConfig,
};
use crepe_types::Pricing;
use std::collections::HashMap;

/// Builds a `Config` backed by in-memory implementations unless told otherwise.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	shop_id: String,
	user_id: Option<String>,
	pricing: Pricing,
	persistence: PersistenceConfig,
	storage_primary: String,
	storage_config: toml::Value,
	remote_primary: String,
	remote_config: toml::Value,
	notify: Option<NotifyConfig>,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

fn empty_table() -> toml::Value {
	toml::Value::Table(toml::Table::new())
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			shop_id: "test-shop".to_string(),
			user_id: Some("test-user".to_string()),
			pricing: Pricing::default(),
			persistence: PersistenceConfig::default(),
			storage_primary: "memory".to_string(),
			storage_config: empty_table(),
			remote_primary: "memory".to_string(),
			remote_config: empty_table(),
			notify: None,
			api: None,
		}
	}

	pub fn shop_id(mut self, id: impl Into<String>) -> Self {
		self.shop_id = id.into();
		self
	}

	/// Sets the user remote orders are attributed to; `None` leaves the shop unauthenticated.
	pub fn user_id(mut self, user_id: Option<String>) -> Self {
		self.user_id = user_id;
		self
	}

	pub fn pricing(mut self, pricing: Pricing) -> Self {
		self.pricing = pricing;
		self
	}

	pub fn persistence(mut self, persistence: PersistenceConfig) -> Self {
		self.persistence = persistence;
		self
	}

	/// Sets the primary storage implementation and its configuration table.
	pub fn storage(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		self.storage_primary = primary.into();
		self.storage_config = config;
		self
	}

	/// Sets the primary remote implementation and its configuration table.
	pub fn remote(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		self.remote_primary = primary.into();
		self.remote_config = config;
		self
	}

	/// Enables notifications through the `log` implementation.
	pub fn with_log_notifier(mut self) -> Self {
		self.notify = Some(NotifyConfig {
			primary: "log".to_string(),
			implementations: HashMap::from([("log".to_string(), empty_table())]),
		});
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	pub fn build(self) -> Config {
		Config {
			shop: ShopConfig {
				id: self.shop_id,
				name: "Test Crepes".to_string(),
				currency: "THB".to_string(),
				user_id: self.user_id,
			},
			pricing: self.pricing,
			persistence: self.persistence,
			storage: StorageConfig {
				implementations: HashMap::from([(
					self.storage_primary.clone(),
					self.storage_config,
				)]),
				primary: self.storage_primary,
			},
			remote: RemoteConfig {
				implementations: HashMap::from([(
					self.remote_primary.clone(),
					self.remote_config,
				)]),
				primary: self.remote_primary,
			},
			notify: self.notify,
			api: self.api,
		}
	}
}
