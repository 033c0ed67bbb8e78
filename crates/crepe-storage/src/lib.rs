//! Local storage for the crepe shop.
//!
//! This crate provides the key-value abstraction behind the draft slot and the
//! pending order list. Backends only move bytes; [`StorageService`] layers
//! typed JSON access on top of them.

use async_trait::async_trait;
use crepe_types::{ConfigSchema, ImplementationRegistry, LocalKey};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// The key holds no value.
	#[error("Not found")]
	NotFound,
	/// The stored value could not be decoded, or a value could not be encoded.
	#[error("Malformed stored data: {0}")]
	Malformed(String),
	/// The backend could not be reached or failed to read or write.
	#[error("Local storage unavailable: {0}")]
	Unavailable(String),
	/// The backend configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Low-level interface for local key-value storage backends.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value for the given key. Deleting a missing key succeeds.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Returns all built-in storage implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Typed JSON access to a storage backend.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Serializes `data` to JSON and stores it under `key`.
	pub async fn store<T: Serialize>(&self, key: LocalKey, data: &T) -> Result<(), StorageError> {
		let bytes = serde_json::to_vec(data).map_err(|e| StorageError::Malformed(e.to_string()))?;
		self.backend.set_bytes(key.as_str(), bytes).await
	}

	/// Retrieves and deserializes the value under `key`.
	///
	/// Returns `Ok(None)` when the key is empty and `Err(Malformed)` when the
	/// stored bytes are not valid JSON for `T`.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		key: LocalKey,
	) -> Result<Option<T>, StorageError> {
		let bytes = match self.backend.get_bytes(key.as_str()).await {
			Ok(bytes) => bytes,
			Err(StorageError::NotFound) => return Ok(None),
			Err(e) => return Err(e),
		};
		serde_json::from_slice(&bytes)
			.map(Some)
			.map_err(|e| StorageError::Malformed(e.to_string()))
	}

	/// Removes the value under `key`.
	pub async fn remove(&self, key: LocalKey) -> Result<(), StorageError> {
		self.backend.delete(key.as_str()).await
	}

	/// Checks whether `key` holds a value.
	pub async fn exists(&self, key: LocalKey) -> Result<bool, StorageError> {
		self.backend.exists(key.as_str()).await
	}
}
