//! Remote order store for the crepe shop.
//!
//! Orders that reach local storage are mirrored into a remote `orders` table
//! so the shop back office can see them. This crate defines the interface for
//! that table, the record shape it accepts and the built-in backends.

use async_trait::async_trait;
use crepe_types::{ConfigSchema, ImplementationRegistry, Order, OrderItem, OrderStatus};
use serde::Serialize;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
	pub mod rest;
}

/// Errors that can occur while talking to the remote order store.
#[derive(Debug, Error)]
pub enum RemoteError {
	/// No user identity is available to attribute the order to.
	#[error("User not authenticated")]
	NotAuthenticated,
	/// The store could not be reached.
	#[error("Network error: {0}")]
	Network(String),
	/// The store answered but refused the request.
	#[error("Remote store rejected the request: {0}")]
	Rejected(String),
	/// The backend configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// A row to insert into the remote orders table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrderRecord {
	pub user_id: String,
	pub items: Vec<OrderItem>,
	pub total_amount: u64,
	pub status: OrderStatus,
	pub qr_code: Option<String>,
	pub notes: String,
}

impl NewOrderRecord {
	/// Builds the remote row for a local order.
	///
	/// Orders without notes get a generated note mentioning the item count.
	pub fn from_order(order: &Order, user_id: impl Into<String>) -> Self {
		let notes = order.notes.clone().unwrap_or_else(|| {
			format!(
				"Order created from localStorage - {} items",
				order.items.len()
			)
		});
		Self {
			user_id: user_id.into(),
			items: order.items.clone(),
			total_amount: order.total_amount,
			status: order.status,
			qr_code: order.qr_code.clone(),
			notes,
		}
	}
}

/// Interface for remote order store backends.
#[async_trait]
pub trait RemoteOrderStore: Send + Sync {
	/// Inserts a new order row and returns the identifier the store assigned.
	async fn insert_order(&self, record: &NewOrderRecord) -> Result<String, RemoteError>;

	/// Updates the status (and optionally the payment reference) of an existing row.
	async fn update_order(
		&self,
		remote_id: &str,
		status: OrderStatus,
		qr_code: Option<String>,
	) -> Result<(), RemoteError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for remote store factory functions.
pub type RemoteFactory = fn(&toml::Value) -> Result<Box<dyn RemoteOrderStore>, RemoteError>;

/// Registry trait for remote store implementations.
pub trait RemoteRegistry: ImplementationRegistry<Factory = RemoteFactory> {}

/// Returns all built-in remote store implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, RemoteFactory)> {
	use implementations::{memory, rest};

	vec![
		(memory::Registry::NAME, memory::Registry::factory()),
		(rest::Registry::NAME, rest::Registry::factory()),
	]
}

/// Attributes orders to the shop user and forwards them to a backend.
pub struct RemoteService {
	backend: Box<dyn RemoteOrderStore>,
	user_id: Option<String>,
}

impl RemoteService {
	pub fn new(backend: Box<dyn RemoteOrderStore>, user_id: Option<String>) -> Self {
		let user_id = user_id.filter(|u| !u.trim().is_empty());
		Self { backend, user_id }
	}

	/// Returns true when orders can be attributed to a user.
	pub fn is_authenticated(&self) -> bool {
		self.user_id.is_some()
	}

	/// Creates a remote row for `order` and returns its remote identifier.
	pub async fn create_order(&self, order: &Order) -> Result<String, RemoteError> {
		let user_id = self.user_id.as_deref().ok_or(RemoteError::NotAuthenticated)?;
		let record = NewOrderRecord::from_order(order, user_id);
		self.backend.insert_order(&record).await
	}

	/// Updates the status of a previously created remote row.
	pub async fn update_status(
		&self,
		remote_id: &str,
		status: OrderStatus,
		qr_code: Option<String>,
	) -> Result<(), RemoteError> {
		self.backend.update_order(remote_id, status, qr_code).await
	}
}
