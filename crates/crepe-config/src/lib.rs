//! Configuration for the crepe shop service.
//!
//! Configuration is a TOML document with one section per concern: shop
//! identity, pricing, persistence thresholds, and the storage, remote and
//! notification backends. `${VAR}` and `${VAR:-default}` references are
//! replaced with environment values before parsing.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

#[cfg(any(test, feature = "testing"))]
pub mod builders;
mod loader;

use crepe_types::Pricing;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Longest interval or duration accepted anywhere in the configuration.
const MAX_MINUTES: u64 = 24 * 60;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the crepe shop.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Shop identity.
	pub shop: ShopConfig,
	/// Crepe prices. Every field falls back to the standard menu price.
	#[serde(default)]
	pub pricing: Pricing,
	/// Thresholds for abandonment, retention and the expiry monitor.
	#[serde(default)]
	pub persistence: PersistenceConfig,
	/// Local storage backend.
	pub storage: StorageConfig,
	/// Remote order store backend.
	pub remote: RemoteConfig,
	/// Email notifications. Disabled when absent.
	pub notify: Option<NotifyConfig>,
	/// HTTP API server. Disabled when absent.
	pub api: Option<ApiConfig>,
}

/// Shop identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShopConfig {
	/// Unique identifier for this shop instance.
	pub id: String,
	/// Display name used in customer emails.
	#[serde(default = "default_shop_name")]
	pub name: String,
	/// Currency code written into payment references.
	#[serde(default = "default_currency")]
	pub currency: String,
	/// User the remote orders are attributed to. Blank means unauthenticated.
	#[serde(default)]
	pub user_id: Option<String>,
}

impl ShopConfig {
	/// Returns the configured user id, treating blank values as absent.
	pub fn user_id(&self) -> Option<&str> {
		self.user_id.as_deref().filter(|u| !u.trim().is_empty())
	}
}

fn default_shop_name() -> String {
	"Crepe Shop".to_string()
}

fn default_currency() -> String {
	"THB".to_string()
}

/// Timing thresholds for the order lifecycle.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersistenceConfig {
	/// A `qr_issued` order at least this old is considered abandoned.
	#[serde(default = "default_abandon_after_minutes")]
	pub abandon_after_minutes: u64,
	/// Local entries at least this old are removed regardless of status.
	#[serde(default = "default_retention_minutes")]
	pub retention_minutes: u64,
	/// How often the expiry monitor runs.
	#[serde(default = "default_check_interval_seconds")]
	pub check_interval_seconds: u64,
	/// How long an issued payment reference is shown as valid.
	#[serde(default = "default_payment_window_minutes")]
	pub payment_window_minutes: u64,
}

impl Default for PersistenceConfig {
	fn default() -> Self {
		Self {
			abandon_after_minutes: default_abandon_after_minutes(),
			retention_minutes: default_retention_minutes(),
			check_interval_seconds: default_check_interval_seconds(),
			payment_window_minutes: default_payment_window_minutes(),
		}
	}
}

fn default_abandon_after_minutes() -> u64 {
	15
}

fn default_retention_minutes() -> u64 {
	60
}

fn default_check_interval_seconds() -> u64 {
	60
}

fn default_payment_window_minutes() -> u64 {
	15
}

/// Configuration for the local storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the remote order store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of remote store implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for email notifications.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifyConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of notifier implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default = "default_api_enabled")]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_enabled() -> bool {
	true
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match (std::env::var(var_name.as_str()), default_value) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name.as_str()
				)))
			}
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	///
	/// Each top-level section must be unique across all configuration files.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Builds a configuration from an already resolved TOML document.
	pub(crate) fn from_value(value: toml::Value) -> Result<Self, ConfigError> {
		let config: Config = value.try_into()?;
		config.validate()?;
		Ok(config)
	}

	/// Validates cross-field constraints that serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.shop.id.trim().is_empty() {
			return Err(ConfigError::Validation("Shop ID cannot be empty".into()));
		}
		if self.shop.currency.trim().is_empty() {
			return Err(ConfigError::Validation("Shop currency cannot be empty".into()));
		}

		if self.pricing.base == 0 {
			return Err(ConfigError::Validation(
				"Pricing base must be greater than zero".into(),
			));
		}

		self.validate_persistence()?;

		validate_implementations("storage", &self.storage.primary, &self.storage.implementations)?;
		validate_implementations("remote", &self.remote.primary, &self.remote.implementations)?;
		if let Some(notify) = &self.notify {
			validate_implementations("notify", &notify.primary, &notify.implementations)?;
		}

		if let Some(api) = &self.api {
			if api.enabled && api.host.trim().is_empty() {
				return Err(ConfigError::Validation("API host cannot be empty".into()));
			}
		}

		Ok(())
	}

	fn validate_persistence(&self) -> Result<(), ConfigError> {
		let p = &self.persistence;

		for (name, minutes) in [
			("abandon_after_minutes", p.abandon_after_minutes),
			("retention_minutes", p.retention_minutes),
			("payment_window_minutes", p.payment_window_minutes),
		] {
			if minutes == 0 || minutes > MAX_MINUTES {
				return Err(ConfigError::Validation(format!(
					"persistence.{} must be between 1 and {}",
					name, MAX_MINUTES
				)));
			}
		}

		if p.check_interval_seconds == 0 || p.check_interval_seconds > MAX_MINUTES * 60 {
			return Err(ConfigError::Validation(format!(
				"persistence.check_interval_seconds must be between 1 and {}",
				MAX_MINUTES * 60
			)));
		}

		if p.abandon_after_minutes >= p.retention_minutes {
			return Err(ConfigError::Validation(format!(
				"persistence.abandon_after_minutes ({}) must be less than retention_minutes ({})",
				p.abandon_after_minutes, p.retention_minutes
			)));
		}

		Ok(())
	}
}

fn validate_implementations(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
