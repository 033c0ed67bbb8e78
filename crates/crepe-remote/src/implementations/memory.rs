//! In-memory remote order store.
//!
//! Keeps inserted rows in a map and hands out sequential identifiers. Used for
//! local development and tests; `fail_writes` makes every call fail so the
//! offline path of the reconciler can be exercised.

use crate::{NewOrderRecord, RemoteError, RemoteFactory, RemoteOrderStore, RemoteRegistry};
use async_trait::async_trait;
use crepe_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, OrderStatus, Schema, ValidationError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory remote store. Clones share the same rows.
#[derive(Clone)]
pub struct MemoryRemoteStore {
	rows: Arc<RwLock<HashMap<String, NewOrderRecord>>>,
	next_id: Arc<AtomicU64>,
	fail_writes: Arc<AtomicBool>,
}

impl MemoryRemoteStore {
	pub fn new() -> Self {
		Self {
			rows: Arc::new(RwLock::new(HashMap::new())),
			next_id: Arc::new(AtomicU64::new(1)),
			fail_writes: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Makes every subsequent call fail with a network error (or succeed again).
	pub fn set_fail_writes(&self, fail: bool) {
		self.fail_writes.store(fail, Ordering::SeqCst);
	}

	/// Returns the stored row for `remote_id`.
	pub async fn get(&self, remote_id: &str) -> Option<NewOrderRecord> {
		self.rows.read().await.get(remote_id).cloned()
	}

	/// Number of stored rows.
	pub async fn len(&self) -> usize {
		self.rows.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}

	fn check_writable(&self) -> Result<(), RemoteError> {
		if self.fail_writes.load(Ordering::SeqCst) {
			Err(RemoteError::Network("remote store offline".into()))
		} else {
			Ok(())
		}
	}
}

impl Default for MemoryRemoteStore {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl RemoteOrderStore for MemoryRemoteStore {
	async fn insert_order(&self, record: &NewOrderRecord) -> Result<String, RemoteError> {
		self.check_writable()?;
		let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
		self.rows.write().await.insert(id.clone(), record.clone());
		Ok(id)
	}

	async fn update_order(
		&self,
		remote_id: &str,
		status: OrderStatus,
		qr_code: Option<String>,
	) -> Result<(), RemoteError> {
		self.check_writable()?;
		let mut rows = self.rows.write().await;
		let row = rows
			.get_mut(remote_id)
			.ok_or_else(|| RemoteError::Rejected(format!("no order with id {}", remote_id)))?;
		row.status = status;
		if qr_code.is_some() {
			row.qr_code = qr_code;
		}
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryRemoteSchema)
	}
}

/// Configuration schema for MemoryRemoteStore.
pub struct MemoryRemoteSchema;

impl ConfigSchema for MemoryRemoteSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![Field::new("fail_writes", FieldType::Boolean)]).validate(config)
	}
}

/// Factory function to create a memory remote store from configuration.
///
/// Configuration parameters:
/// - `fail_writes`: start in the failing state (default: false)
pub fn create_remote(config: &toml::Value) -> Result<Box<dyn RemoteOrderStore>, RemoteError> {
	MemoryRemoteSchema
		.validate(config)
		.map_err(|e| RemoteError::Configuration(e.to_string()))?;

	let store = MemoryRemoteStore::new();
	let fail_writes = config
		.get("fail_writes")
		.and_then(|v| v.as_bool())
		.unwrap_or(false);
	store.set_fail_writes(fail_writes);
	Ok(Box::new(store))
}

/// Registry for the memory remote store.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = RemoteFactory;

	fn factory() -> Self::Factory {
		create_remote
	}
}

impl RemoteRegistry for Registry {}
