//! Dynamic factory registry for shop implementations.
//!
//! This module provides a centralized registry for all factory functions,
//! allowing dynamic instantiation of implementations based on configuration.

use crepe_config::Config;
use crepe_core::{ShopBuilder, ShopEngine, ShopFactories};
use crepe_notify::NotifyFactory;
use crepe_remote::RemoteFactory;
use crepe_storage::StorageFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Global registry for all implementation factories
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub remote: HashMap<String, RemoteFactory>,
	pub notify: HashMap<String, NotifyFactory>,
}

impl FactoryRegistry {
	/// Create a new empty registry
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
			remote: HashMap::new(),
			notify: HashMap::new(),
		}
	}

	/// Register a storage implementation
	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}

	/// Register a remote store implementation
	pub fn register_remote(&mut self, name: impl Into<String>, factory: RemoteFactory) {
		self.remote.insert(name.into(), factory);
	}

	/// Register a notification implementation
	pub fn register_notify(&mut self, name: impl Into<String>, factory: NotifyFactory) {
		self.notify.insert(name.into(), factory);
	}
}

// Global registry instance
static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Initialize the global registry with all available implementations
pub fn initialize_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in crepe_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}

		for (name, factory) in crepe_remote::get_all_implementations() {
			tracing::debug!("Registering remote implementation: {}", name);
			registry.register_remote(name, factory);
		}

		for (name, factory) in crepe_notify::get_all_implementations() {
			tracing::debug!("Registering notify implementation: {}", name);
			registry.register_notify(name, factory);
		}

		registry
	})
}

/// Get the global factory registry
pub fn get_registry() -> &'static FactoryRegistry {
	initialize_registry()
}

/// Macro to build factories from config implementations
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				let available_str = available.join(", ");
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name, name, available_str
				)
				.into());
			}
		}
		factories
	}};
}

/// Build the shop engine using the registry and config
pub fn build_shop_from_config(config: Config) -> Result<ShopEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();
	let builder = ShopBuilder::new(config.clone());

	let storage_factories =
		build_factories!(registry, config.storage.implementations, storage, "storage");
	let remote_factories =
		build_factories!(registry, config.remote.implementations, remote, "remote");
	let notify_factories = match &config.notify {
		Some(notify) => build_factories!(registry, notify.implementations, notify, "notify"),
		None => HashMap::new(),
	};

	let factories = ShopFactories {
		storage_factories,
		remote_factories,
		notify_factories,
	};

	Ok(builder.build(factories)?)
}
