//! Builder pattern for constructing shop engines.
//!
//! Composes a ShopEngine from storage, remote store and notification
//! implementations using factory functions keyed by implementation name.

use crate::engine::{event_bus::EventBus, ShopEngine};
use crepe_config::Config;
use crepe_notify::{NotificationInterface, NotificationService, NotifyError};
use crepe_remote::{RemoteError, RemoteOrderStore, RemoteService};
use crepe_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Capacity of the engine's event bus.
const EVENT_BUS_CAPACITY: usize = 1000;

/// Errors that can occur during shop engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Container for all factory functions needed to build a ShopEngine.
pub struct ShopFactories<SF, RF, NF> {
	pub storage_factories: HashMap<String, SF>,
	pub remote_factories: HashMap<String, RF>,
	pub notify_factories: HashMap<String, NF>,
}

/// Builder for constructing a ShopEngine with pluggable implementations.
pub struct ShopBuilder {
	config: Config,
}

impl ShopBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the ShopEngine using factories for each component type.
	pub fn build<SF, RF, NF>(
		self,
		factories: ShopFactories<SF, RF, NF>,
	) -> Result<ShopEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		RF: Fn(&toml::Value) -> Result<Box<dyn RemoteOrderStore>, RemoteError>,
		NF: Fn(&toml::Value) -> Result<Box<dyn NotificationInterface>, NotifyError>,
	{
		// Create storage implementations
		let mut storage_impls = HashMap::new();
		for (name, config) in &self.config.storage.implementations {
			let Some(factory) = factories.storage_factories.get(name) else {
				tracing::warn!(component = "storage", implementation = %name, "Unknown implementation, skipping");
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					storage_impls.insert(name.clone(), implementation);
					let is_primary = &self.config.storage.primary == name;
					tracing::info!(component = "storage", implementation = %name, enabled = %is_primary, "Loaded");
				}
				Err(e) => {
					tracing::error!(
						component = "storage",
						implementation = %name,
						error = %e,
						"Failed to create storage implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create storage implementation '{}': {}",
						name, e
					)));
				}
			}
		}

		let primary_storage = &self.config.storage.primary;
		let storage_backend = storage_impls.remove(primary_storage).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary storage '{}' failed to load or has invalid configuration",
				primary_storage
			))
		})?;
		let storage = Arc::new(StorageService::new(storage_backend));

		// Create remote store implementations
		let mut remote_impls = HashMap::new();
		for (name, config) in &self.config.remote.implementations {
			let Some(factory) = factories.remote_factories.get(name) else {
				tracing::warn!(component = "remote", implementation = %name, "Unknown implementation, skipping");
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					remote_impls.insert(name.clone(), implementation);
					let is_primary = &self.config.remote.primary == name;
					tracing::info!(component = "remote", implementation = %name, enabled = %is_primary, "Loaded");
				}
				Err(e) => {
					tracing::error!(
						component = "remote",
						implementation = %name,
						error = %e,
						"Failed to create remote implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create remote implementation '{}': {}",
						name, e
					)));
				}
			}
		}

		let primary_remote = &self.config.remote.primary;
		let remote_backend = remote_impls.remove(primary_remote).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary remote '{}' failed to load or has invalid configuration",
				primary_remote
			))
		})?;

		let user_id = self.config.shop.user_id().map(str::to_string);
		if user_id.is_none() {
			tracing::warn!(component = "remote", "No user id configured, remote writes will be refused");
		}
		let remote = Arc::new(RemoteService::new(remote_backend, user_id));

		// Notifications are optional
		let notifier = match &self.config.notify {
			Some(notify_config) => {
				let primary_notify = &notify_config.primary;
				let config = notify_config
					.implementations
					.get(primary_notify)
					.ok_or_else(|| {
						BuilderError::MissingComponent(format!("notify implementation '{}'", primary_notify))
					})?;
				let factory = factories.notify_factories.get(primary_notify).ok_or_else(|| {
					BuilderError::Config(format!("Unknown notify implementation '{}'", primary_notify))
				})?;
				let implementation = factory(config).map_err(|e| {
					tracing::error!(
						component = "notify",
						implementation = %primary_notify,
						error = %e,
						"Failed to create notify implementation"
					);
					BuilderError::Config(format!(
						"Failed to create notify implementation '{}': {}",
						primary_notify, e
					))
				})?;
				tracing::info!(component = "notify", implementation = %primary_notify, enabled = true, "Loaded");
				Some(Arc::new(NotificationService::new(
					implementation,
					self.config.shop.name.clone(),
				)))
			}
			None => None,
		};

		let event_bus = EventBus::new(EVENT_BUS_CAPACITY);

		Ok(ShopEngine::new(
			self.config,
			storage,
			remote,
			notifier,
			event_bus,
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crepe_config::builders::ConfigBuilder;

	fn factories() -> ShopFactories<
		crepe_storage::StorageFactory,
		crepe_remote::RemoteFactory,
		crepe_notify::NotifyFactory,
	> {
		ShopFactories {
			storage_factories: crepe_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			remote_factories: crepe_remote::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			notify_factories: crepe_notify::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}

	fn table(source: &str) -> toml::Value {
		toml::from_str(source).unwrap()
	}

	#[test]
	fn test_builds_from_memory_config() {
		let config = ConfigBuilder::new().with_log_notifier().build();
		let engine = ShopBuilder::new(config).build(factories()).unwrap();
		assert!(engine.notifier.is_some());
		assert_eq!(engine.config().shop.id, "test-shop");
	}

	#[test]
	fn test_factory_failure_is_reported() {
		let config = ConfigBuilder::new()
			.storage("file", table(r#"storage_path = """#))
			.build();
		let err = ShopBuilder::new(config)
			.build(factories())
			.err()
			.unwrap();
		assert!(err
			.to_string()
			.contains("Failed to create storage implementation 'file'"));
	}

	#[test]
	fn test_unknown_primary_is_rejected() {
		let config = ConfigBuilder::new()
			.remote("carrier-pigeon", table(""))
			.build();
		let err = ShopBuilder::new(config)
			.build(factories())
			.err()
			.unwrap();
		assert_eq!(
			err.to_string(),
			"Configuration error: Primary remote 'carrier-pigeon' failed to load or has invalid configuration"
		);
	}

	#[tokio::test]
	async fn test_engine_without_user_keeps_orders_locally() {
		let config = ConfigBuilder::new().user_id(None).build();
		let engine = ShopBuilder::new(config).build(factories()).unwrap();

		let mut cart = engine.new_cart();
		cart.add_item(vec![], vec![], false, chrono::Utc::now());
		let receipt = engine
			.checkout(&mut cart, None, chrono::Utc::now())
			.await
			.unwrap();

		assert_eq!(
			receipt.payment.remote,
			crate::reconciler::RemoteOutcome::Failed {
				reason: "User not authenticated".into()
			}
		);
		assert_eq!(engine.reconciler().get_pending().await.len(), 1);
	}
}
