//! Lifecycle management for the shop engine.

use super::{EngineError, ShopEngine};
use chrono::Utc;

impl ShopEngine {
	/// Start-up pass over local state, then a sync of orders the remote store
	/// has not seen yet.
	pub async fn initialize(&self) -> Result<(), EngineError> {
		tracing::info!(shop_id = %self.config.shop.id, "Initializing shop engine");

		let abandoned = self.reconciler.initialize(Utc::now()).await;
		if !abandoned.is_empty() {
			let expired = self.reconciler.expire_abandoned(Utc::now()).await;
			tracing::info!(expired = expired.len(), "Expired orders abandoned while offline");
		}

		let report = self.reconciler.sync_pending().await;
		for error in &report.errors {
			tracing::warn!(error = %error, "Pending order not synced");
		}

		Ok(())
	}

	/// Performs cleanup operations
	pub async fn shutdown(&self) -> Result<(), EngineError> {
		tracing::info!("Shutting down shop engine");

		let stats = self.reconciler.stats().await;
		tracing::info!(
			draft_orders = stats.draft_orders,
			pending_orders = stats.pending_orders,
			expired_orders = stats.expired_orders,
			total_value = stats.total_value,
			"Local orders at shutdown"
		);

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::event_bus::EventBus;
	use crepe_config::builders::ConfigBuilder;
	use crepe_remote::implementations::memory::MemoryRemoteStore;
	use crepe_remote::RemoteService;
	use crepe_storage::implementations::memory::MemoryStorage;
	use crepe_storage::StorageService;
	use crepe_types::{Order, OrderItem, OrderStatus, Pricing};
	use std::sync::Arc;

	#[tokio::test]
	async fn test_initialize_expires_and_syncs() {
		let remote = MemoryRemoteStore::new();
		let engine = ShopEngine::new(
			ConfigBuilder::new().build(),
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
			Arc::new(RemoteService::new(
				Box::new(remote.clone()),
				Some("test-user".into()),
			)),
			None,
			EventBus::new(16),
		);

		let created_at = Utc::now() - chrono::Duration::minutes(30);
		let item = OrderItem::new(vec![], vec![], false, &Pricing::default(), created_at);
		let order = Order::new("order-offline", vec![item], OrderStatus::QrIssued, created_at);
		engine.reconciler().save_pending(&order).await;

		engine.initialize().await.unwrap();

		assert!(engine.reconciler().get_pending().await.is_empty());
		assert_eq!(remote.get("1").await.unwrap().status, OrderStatus::Expired);

		engine.shutdown().await.unwrap();
	}
}
