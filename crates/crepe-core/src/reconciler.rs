//! Order persistence reconciler.
//!
//! Keeps the single draft order and the list of pending orders in local
//! storage, mirrors orders into the remote store, and detects orders whose
//! payment window has lapsed. Local storage is best-effort: failures are logged
//! and the operation degrades to a no-op or an empty result. Remote failures
//! are returned to the caller and never remove the local copy.

use crate::engine::event_bus::EventBus;
use crate::state::{LifecycleError, OrderLifecycle};
use chrono::{DateTime, Duration, Utc};
use crepe_config::Config;
use crepe_remote::RemoteService;
use crepe_storage::{StorageError, StorageService};
use crepe_types::{
	truncate_id, LocalKey, Order, OrderItem, OrderStats, OrderStatus, PaymentReference,
	ShopEvent, SyncReport,
};
use serde::Serialize;
use std::borrow::Cow;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

/// Errors returned by reconciler operations.
#[derive(Debug, Error)]
pub enum ReconcilerError {
	/// The remote store did not accept the write. The local copy is kept.
	#[error("Remote write failed: {reason}")]
	RemoteWriteFailed { reason: String },
	#[error("Cannot check out an order without items")]
	EmptyOrder,
	#[error(transparent)]
	Lifecycle(#[from] LifecycleError),
}

impl ReconcilerError {
	/// The bare failure reason, without the variant prefix.
	pub fn reason(&self) -> String {
		match self {
			ReconcilerError::RemoteWriteFailed { reason } => reason.clone(),
			other => other.to_string(),
		}
	}
}

/// Time thresholds and currency used by the reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
	/// A `qr_issued` order at least this old is abandoned.
	pub abandon_after: Duration,
	/// Entries at least this old are dropped from local storage.
	pub retention: Duration,
	/// Validity of an issued payment reference.
	pub payment_window: Duration,
	/// Currency code written into payment references.
	pub currency: String,
}

impl Default for ReconcilerSettings {
	fn default() -> Self {
		Self {
			abandon_after: Duration::minutes(15),
			retention: Duration::minutes(60),
			payment_window: Duration::minutes(15),
			currency: "THB".to_string(),
		}
	}
}

impl ReconcilerSettings {
	pub fn from_config(config: &Config) -> Self {
		let persistence = &config.persistence;
		Self {
			abandon_after: Duration::minutes(persistence.abandon_after_minutes as i64),
			retention: Duration::minutes(persistence.retention_minutes as i64),
			payment_window: Duration::minutes(persistence.payment_window_minutes as i64),
			currency: config.shop.currency.clone(),
		}
	}
}

/// What happened to the remote copy during checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoteOutcome {
	Synced {
		#[serde(rename = "remoteId")]
		remote_id: String,
	},
	Failed {
		reason: String,
	},
}

/// Result of a checkout: the pending order and the reference to show the customer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
	pub order: Order,
	pub qr_text: String,
	pub expires_at: DateTime<Utc>,
	pub remote: RemoteOutcome,
}

/// Reconciles orders between local storage and the remote store.
pub struct OrderReconciler {
	storage: Arc<StorageService>,
	remote: Arc<RemoteService>,
	event_bus: EventBus,
	settings: ReconcilerSettings,
	/// Serializes read-modify-write cycles on the pending list.
	pending_lock: Mutex<()>,
}

impl OrderReconciler {
	pub fn new(
		storage: Arc<StorageService>,
		remote: Arc<RemoteService>,
		event_bus: EventBus,
		settings: ReconcilerSettings,
	) -> Self {
		Self {
			storage,
			remote,
			event_bus,
			settings,
			pending_lock: Mutex::new(()),
		}
	}

	pub fn settings(&self) -> &ReconcilerSettings {
		&self.settings
	}

	/// Overwrites the draft slot.
	#[instrument(skip_all, fields(order_id = %truncate_id(&order.id)))]
	pub async fn save_draft(&self, order: &Order) {
		let order = with_consistent_total(order);
		match self.storage.store(LocalKey::DraftOrder, &*order).await {
			Ok(()) => {
				tracing::debug!(total_amount = order.total_amount, "Saved draft");
				self.event_bus.publish(ShopEvent::DraftSaved {
					order_id: order.id.clone(),
					total_amount: order.total_amount,
				});
			}
			Err(e) => {
				tracing::error!(error = %e, "Failed to save draft order");
			}
		}
	}

	/// Returns the saved draft, if any.
	pub async fn load_draft(&self) -> Option<Order> {
		match self.storage.retrieve::<Order>(LocalKey::DraftOrder).await {
			Ok(draft) => draft,
			Err(StorageError::Malformed(e)) => {
				tracing::warn!(key = LocalKey::DraftOrder.as_str(), error = %e, "Ignoring malformed draft");
				None
			}
			Err(e) => {
				tracing::error!(error = %e, "Failed to load draft order");
				None
			}
		}
	}

	/// Empties the draft slot.
	pub async fn clear_draft(&self) {
		match self.storage.remove(LocalKey::DraftOrder).await {
			Ok(()) => {
				self.event_bus.publish(ShopEvent::DraftCleared);
			}
			Err(e) => {
				tracing::error!(error = %e, "Failed to clear draft order");
			}
		}
	}

	/// Inserts or replaces a pending order. A replaced entry moves to the end.
	#[instrument(skip_all, fields(order_id = %truncate_id(&order.id)))]
	pub async fn save_pending(&self, order: &Order) {
		let _guard = self.pending_lock.lock().await;

		let status = order.status;
		let mut orders = self.load_pending().await;
		orders.retain(|o| o.id != order.id);
		orders.push(with_consistent_total(order).into_owned());

		if self.store_pending(&orders).await {
			tracing::debug!(status = %status, "Saved pending order");
		}
	}

	/// Returns every locally known pending order.
	pub async fn get_pending(&self) -> Vec<Order> {
		self.load_pending().await
	}

	/// Removes a pending order. Returns true when an entry was removed.
	pub async fn remove_pending(&self, order_id: &str) -> bool {
		let _guard = self.pending_lock.lock().await;

		let mut orders = self.load_pending().await;
		let before = orders.len();
		orders.retain(|o| o.id != order_id);
		if orders.len() == before {
			return false;
		}

		if !self.store_pending(&orders).await {
			return false;
		}
		tracing::info!(order_id = %truncate_id(order_id), "Removed pending order");
		self.event_bus.publish(ShopEvent::OrderRemoved {
			order_id: order_id.to_string(),
		});
		true
	}

	/// Marks a pending order as expired.
	///
	/// Returns true when the status changed. Orders that are missing, already
	/// expired, or in a state that cannot expire (paid, cancelled) are left as
	/// they are.
	pub async fn mark_expired(&self, order_id: &str) -> bool {
		let _guard = self.pending_lock.lock().await;

		let mut orders = self.load_pending().await;
		let Some(order) = orders.iter_mut().find(|o| o.id == order_id) else {
			tracing::debug!(order_id = %truncate_id(order_id), "No pending order to expire");
			return false;
		};

		let from = order.status;
		match OrderLifecycle::transition(order, OrderStatus::Expired) {
			Ok(true) => {}
			Ok(false) => return false,
			Err(e) => {
				tracing::warn!(order_id = %truncate_id(order_id), error = %e, "Refusing to expire order");
				return false;
			}
		}

		if !self.store_pending(&orders).await {
			return false;
		}
		tracing::info!(order_id = %truncate_id(order_id), "Order expired");
		self.event_bus.publish(ShopEvent::StatusChanged {
			order_id: order_id.to_string(),
			from,
			to: OrderStatus::Expired,
		});
		true
	}

	/// Writes the order to the remote store and returns its remote id.
	///
	/// Never retries and never touches the local copy.
	#[instrument(skip_all, fields(order_id = %truncate_id(&order.id)))]
	pub async fn create_remote(&self, order: &Order) -> Result<String, ReconcilerError> {
		match self.remote.create_order(order).await {
			Ok(remote_id) => {
				tracing::info!(remote_id = %remote_id, "Order stored remotely");
				self.event_bus.publish(ShopEvent::RemoteSynced {
					order_id: order.id.clone(),
					remote_id: remote_id.clone(),
				});
				Ok(remote_id)
			}
			Err(e) => {
				let reason = e.to_string();
				tracing::warn!(error = %reason, "Failed to store order remotely");
				self.event_bus.publish(ShopEvent::RemoteSyncFailed {
					order_id: order.id.clone(),
					reason: reason.clone(),
				});
				Err(ReconcilerError::RemoteWriteFailed { reason })
			}
		}
	}

	/// Updates the status of an order in the remote store.
	pub async fn update_remote_status(
		&self,
		remote_id: &str,
		status: OrderStatus,
		qr_code: Option<String>,
	) -> Result<(), ReconcilerError> {
		self.remote
			.update_status(remote_id, status, qr_code)
			.await
			.map_err(|e| {
				tracing::warn!(remote_id = %remote_id, status = %status, error = %e, "Failed to update remote order");
				ReconcilerError::RemoteWriteFailed {
					reason: e.to_string(),
				}
			})
	}

	/// Pending orders still waiting for payment after the abandon threshold.
	pub async fn check_abandoned(&self, now: DateTime<Utc>) -> Vec<Order> {
		let threshold = self.settings.abandon_after;
		self.load_pending()
			.await
			.into_iter()
			.filter(|o| o.status == OrderStatus::QrIssued && now - o.created_at >= threshold)
			.collect()
	}

	/// Drops entries older than the retention period, whatever their status.
	///
	/// Returns how many entries were removed. Storage is only rewritten when
	/// something was removed.
	pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> usize {
		let _guard = self.pending_lock.lock().await;

		let cutoff = now - self.settings.retention;
		let (kept, removed): (Vec<Order>, Vec<Order>) = self
			.load_pending()
			.await
			.into_iter()
			.partition(|o| o.created_at > cutoff);

		if removed.is_empty() || !self.store_pending(&kept).await {
			return 0;
		}

		tracing::info!(removed = removed.len(), remaining = kept.len(), "Cleaned up old orders");
		for order in &removed {
			self.event_bus.publish(ShopEvent::OrderRemoved {
				order_id: order.id.clone(),
			});
		}
		removed.len()
	}

	/// Summary counts over the draft slot and the pending list.
	pub async fn stats(&self) -> OrderStats {
		let pending = self.load_pending().await;
		let count = |status: OrderStatus| pending.iter().filter(|o| o.status == status).count() as u32;

		OrderStats {
			draft_orders: u32::from(self.load_draft().await.is_some()),
			pending_orders: count(OrderStatus::QrIssued),
			expired_orders: count(OrderStatus::Expired),
			total_value: pending.iter().map(|o| o.total_amount).sum(),
		}
	}

	/// Pushes every pending order that has no remote id yet. Orders the
	/// remote store accepted are removed from the local list.
	pub async fn sync_pending(&self) -> SyncReport {
		let mut report = SyncReport::default();

		for order in self.load_pending().await {
			if order.remote_id.is_some() {
				continue;
			}
			match self.create_remote(&order).await {
				Ok(_) => {
					self.remove_pending(&order.id).await;
					report.synced += 1;
				}
				Err(e) => report
					.errors
					.push(format!("Order {}: {}", order.id, e.reason())),
			}
		}

		tracing::info!(synced = report.synced, failed = report.errors.len(), "Synced pending orders");
		report
	}

	/// Start-up pass: drops old entries and reports abandoned orders.
	pub async fn initialize(&self, now: DateTime<Utc>) -> Vec<Order> {
		self.cleanup_expired(now).await;
		let abandoned = self.check_abandoned(now).await;
		if !abandoned.is_empty() {
			tracing::info!(count = abandoned.len(), "Found abandoned orders");
		}
		abandoned
	}

	/// Expires every abandoned order and returns their ids.
	///
	/// Only the local copy changes. The remote row may already have been
	/// paid, so its status is left to the payment side.
	pub async fn expire_abandoned(&self, now: DateTime<Utc>) -> Vec<String> {
		let mut expired = Vec::new();

		for order in self.check_abandoned(now).await {
			if !self.mark_expired(&order.id).await {
				continue;
			}
			tracing::debug!(
				order_id = %truncate_id(&order.id),
				age_minutes = order.age_minutes(now),
				"Expired abandoned order"
			);
			expired.push(order.id);
		}

		expired
	}

	/// Turns `items` into a pending order with a payment reference.
	///
	/// The order is saved locally before the remote write is attempted; a
	/// remote failure is reported in the result and the local copy stays.
	pub async fn checkout(
		&self,
		items: Vec<OrderItem>,
		notes: Option<String>,
		now: DateTime<Utc>,
	) -> Result<PaymentRequest, ReconcilerError> {
		if items.is_empty() {
			return Err(ReconcilerError::EmptyOrder);
		}

		let order_id = format!("order-{}", uuid::Uuid::new_v4().simple());
		let mut order = Order::new(order_id, items, OrderStatus::Draft, now).with_notes(notes);
		OrderLifecycle::transition(&mut order, OrderStatus::QrIssued)?;

		let qr_text =
			PaymentReference::new(&order.id, order.total_amount, &self.settings.currency).to_string();
		order.qr_code = Some(qr_text.clone());

		self.save_pending(&order).await;

		let remote = match self.create_remote(&order).await {
			Ok(remote_id) => {
				self.record_remote_id(&order.id, &remote_id).await;
				order.remote_id = Some(remote_id.clone());
				RemoteOutcome::Synced { remote_id }
			}
			Err(e) => RemoteOutcome::Failed { reason: e.reason() },
		};

		self.clear_draft().await;

		let expires_at = now + self.settings.payment_window;
		self.event_bus.publish(ShopEvent::PaymentRequested {
			order_id: order.id.clone(),
			qr_text: qr_text.clone(),
			expires_at,
		});
		tracing::info!(
			order_id = %truncate_id(&order.id),
			total_amount = order.total_amount,
			items = order.items.len(),
			"Checked out order"
		);

		Ok(PaymentRequest {
			order,
			qr_text,
			expires_at,
			remote,
		})
	}

	async fn record_remote_id(&self, order_id: &str, remote_id: &str) {
		let _guard = self.pending_lock.lock().await;

		let mut orders = self.load_pending().await;
		let Some(order) = orders.iter_mut().find(|o| o.id == order_id) else {
			return;
		};
		order.remote_id = Some(remote_id.to_string());
		self.store_pending(&orders).await;
	}

	async fn load_pending(&self) -> Vec<Order> {
		match self
			.storage
			.retrieve::<Vec<Order>>(LocalKey::PendingOrders)
			.await
		{
			Ok(orders) => orders.unwrap_or_default(),
			Err(StorageError::Malformed(e)) => {
				tracing::warn!(key = LocalKey::PendingOrders.as_str(), error = %e, "Ignoring malformed pending orders");
				Vec::new()
			}
			Err(e) => {
				tracing::error!(error = %e, "Failed to load pending orders");
				Vec::new()
			}
		}
	}

	async fn store_pending(&self, orders: &[Order]) -> bool {
		match self.storage.store(LocalKey::PendingOrders, &orders).await {
			Ok(()) => true,
			Err(e) => {
				tracing::error!(error = %e, "Failed to save pending orders");
				false
			}
		}
	}
}

/// Returns the order with `total_amount` matching its items, recomputing it
/// when the caller changed the items without updating the total.
fn with_consistent_total(order: &Order) -> Cow<'_, Order> {
	if order.is_consistent() {
		return Cow::Borrowed(order);
	}

	tracing::warn!(
		order_id = %truncate_id(&order.id),
		total_amount = order.total_amount,
		"Order total does not match its items, recomputing"
	);
	let mut fixed = order.clone();
	fixed.recompute_total();
	Cow::Owned(fixed)
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use chrono::TimeZone;
	use crepe_remote::implementations::memory::MemoryRemoteStore;
	use crepe_remote::{NewOrderRecord, RemoteError, RemoteOrderStore};
	use crepe_storage::implementations::memory::MemoryStorage;
	use crepe_storage::StorageInterface;
	use crepe_types::{ConfigSchema, Pricing};
	use mockall::mock;
	use mockall::predicate::eq;

	mock! {
		pub Remote {}

		#[async_trait]
		impl RemoteOrderStore for Remote {
			async fn insert_order(&self, record: &NewOrderRecord) -> Result<String, RemoteError>;
			async fn update_order(
				&self,
				remote_id: &str,
				status: OrderStatus,
				qr_code: Option<String>,
			) -> Result<(), RemoteError>;
			fn config_schema(&self) -> Box<dyn ConfigSchema>;
		}
	}

	fn now() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2026, 5, 2, 18, 30, 0).unwrap()
	}

	fn reconciler(
		storage: &MemoryStorage,
		remote: Box<dyn RemoteOrderStore>,
		user_id: Option<&str>,
	) -> OrderReconciler {
		OrderReconciler::new(
			Arc::new(StorageService::new(Box::new(storage.clone()))),
			Arc::new(RemoteService::new(remote, user_id.map(str::to_string))),
			EventBus::new(64),
			ReconcilerSettings::default(),
		)
	}

	fn with_memory_remote(storage: &MemoryStorage) -> (OrderReconciler, MemoryRemoteStore) {
		let remote = MemoryRemoteStore::new();
		let reconciler = reconciler(storage, Box::new(remote.clone()), Some("user-1"));
		(reconciler, remote)
	}

	fn item(toppings: usize) -> OrderItem {
		let names = (0..toppings).map(|i| format!("topping-{}", i)).collect();
		OrderItem::new(names, vec![], false, &Pricing::default(), now())
	}

	fn order(id: &str, status: OrderStatus, minutes_ago: i64) -> Order {
		Order::new(
			id,
			vec![item(2)],
			status,
			now() - Duration::minutes(minutes_ago),
		)
	}

	fn ids(orders: &[Order]) -> Vec<&str> {
		orders.iter().map(|o| o.id.as_str()).collect()
	}

	#[tokio::test]
	async fn test_draft_round_trip() {
		let storage = MemoryStorage::new();
		let (reconciler, _) = with_memory_remote(&storage);
		let draft = Order::draft(vec![item(2), item(3)], now()).with_notes(Some("no sugar".into()));

		assert!(reconciler.load_draft().await.is_none());
		reconciler.save_draft(&draft).await;
		assert_eq!(reconciler.load_draft().await, Some(draft));

		reconciler.clear_draft().await;
		assert!(reconciler.load_draft().await.is_none());
	}

	#[tokio::test]
	async fn test_total_matches_items_at_save_time() {
		let storage = MemoryStorage::new();
		let (reconciler, _) = with_memory_remote(&storage);
		let draft = Order::draft(vec![item(1), item(3)], now());
		reconciler.save_draft(&draft).await;

		let loaded = reconciler.load_draft().await.unwrap();
		assert_eq!(loaded.total_amount, 27 + 40);
		assert!(loaded.is_consistent());
	}

	#[tokio::test]
	async fn test_stale_total_is_recomputed_before_storing() {
		let storage = MemoryStorage::new();
		let (reconciler, _) = with_memory_remote(&storage);

		let mut draft = Order::draft(vec![item(1)], now());
		draft.items.push(item(3));
		assert!(!draft.is_consistent());
		reconciler.save_draft(&draft).await;
		assert_eq!(reconciler.load_draft().await.unwrap().total_amount, 27 + 40);

		let mut pending = order("order-1", OrderStatus::QrIssued, 2);
		pending.total_amount = 1;
		reconciler.save_pending(&pending).await;
		let stored = reconciler.get_pending().await;
		assert_eq!(stored[0].total_amount, 34);
		assert!(stored[0].is_consistent());
	}

	#[tokio::test]
	async fn test_malformed_data_is_treated_as_absent() {
		let storage = MemoryStorage::new();
		storage
			.set_bytes(LocalKey::DraftOrder.as_str(), b"{\"id\":".to_vec())
			.await
			.unwrap();
		storage
			.set_bytes(LocalKey::PendingOrders.as_str(), b"not json".to_vec())
			.await
			.unwrap();
		let (reconciler, _) = with_memory_remote(&storage);

		assert!(reconciler.load_draft().await.is_none());
		assert!(reconciler.get_pending().await.is_empty());
		assert_eq!(reconciler.stats().await, OrderStats::default());

		// writing replaces the malformed list
		reconciler
			.save_pending(&order("order-1", OrderStatus::QrIssued, 0))
			.await;
		assert_eq!(ids(&reconciler.get_pending().await), vec!["order-1"]);
	}

	#[tokio::test]
	async fn test_unavailable_storage_degrades_to_defaults() {
		let storage = MemoryStorage::new();
		let (reconciler, _) = with_memory_remote(&storage);
		storage.set_available(false);

		reconciler.save_draft(&Order::draft(vec![item(1)], now())).await;
		reconciler
			.save_pending(&order("order-1", OrderStatus::QrIssued, 20))
			.await;

		assert!(reconciler.load_draft().await.is_none());
		assert!(reconciler.get_pending().await.is_empty());
		assert!(!reconciler.remove_pending("order-1").await);
		assert!(!reconciler.mark_expired("order-1").await);
		assert_eq!(reconciler.cleanup_expired(now()).await, 0);
		assert_eq!(reconciler.stats().await, OrderStats::default());
	}

	#[tokio::test]
	async fn test_save_pending_upserts_by_id() {
		let storage = MemoryStorage::new();
		let (reconciler, _) = with_memory_remote(&storage);

		reconciler
			.save_pending(&order("order-1", OrderStatus::QrIssued, 5))
			.await;
		reconciler
			.save_pending(&order("order-2", OrderStatus::QrIssued, 4))
			.await;
		let mut updated = order("order-1", OrderStatus::QrIssued, 5);
		updated.notes = Some("changed".into());
		reconciler.save_pending(&updated).await;

		let pending = reconciler.get_pending().await;
		assert_eq!(ids(&pending), vec!["order-2", "order-1"]);
		assert_eq!(pending[1].notes.as_deref(), Some("changed"));
	}

	#[tokio::test]
	async fn test_remove_pending() {
		let storage = MemoryStorage::new();
		let (reconciler, _) = with_memory_remote(&storage);
		let o = order("order-1", OrderStatus::QrIssued, 0);

		reconciler.save_pending(&o).await;
		assert!(reconciler.remove_pending(&o.id).await);
		assert!(!ids(&reconciler.get_pending().await).contains(&"order-1"));
		assert!(!reconciler.remove_pending(&o.id).await);
	}

	#[tokio::test]
	async fn test_check_abandoned_threshold() {
		let storage = MemoryStorage::new();
		let (reconciler, _) = with_memory_remote(&storage);

		reconciler
			.save_pending(&order("fresh", OrderStatus::QrIssued, 14))
			.await;
		reconciler
			.save_pending(&order("boundary", OrderStatus::QrIssued, 15))
			.await;
		reconciler
			.save_pending(&order("stale", OrderStatus::QrIssued, 16))
			.await;
		reconciler
			.save_pending(&order("paid", OrderStatus::Paid, 30))
			.await;
		reconciler
			.save_pending(&order("draft", OrderStatus::Draft, 30))
			.await;

		let abandoned = reconciler.check_abandoned(now()).await;
		assert_eq!(ids(&abandoned), vec!["boundary", "stale"]);

		// pure over `now`: nothing was changed
		assert_eq!(reconciler.get_pending().await.len(), 5);
	}

	#[tokio::test]
	async fn test_cleanup_removes_old_entries_regardless_of_status() {
		let storage = MemoryStorage::new();
		let (reconciler, _) = with_memory_remote(&storage);

		reconciler
			.save_pending(&order("recent", OrderStatus::QrIssued, 59))
			.await;
		reconciler
			.save_pending(&order("old-paid", OrderStatus::Paid, 61))
			.await;
		reconciler
			.save_pending(&order("exactly-an-hour", OrderStatus::Expired, 60))
			.await;

		assert_eq!(reconciler.cleanup_expired(now()).await, 2);
		assert_eq!(ids(&reconciler.get_pending().await), vec!["recent"]);
		assert_eq!(reconciler.cleanup_expired(now()).await, 0);
	}

	#[tokio::test]
	async fn test_cleanup_with_nothing_to_remove() {
		let storage = MemoryStorage::new();
		let (reconciler, _) = with_memory_remote(&storage);
		reconciler
			.save_pending(&order("recent", OrderStatus::QrIssued, 1))
			.await;
		let mut events = reconciler.event_bus.subscribe();

		assert_eq!(reconciler.cleanup_expired(now()).await, 0);
		assert_eq!(ids(&reconciler.get_pending().await), vec!["recent"]);
		assert!(events.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_stats() {
		let storage = MemoryStorage::new();
		let (reconciler, _) = with_memory_remote(&storage);
		assert_eq!(
			reconciler.stats().await,
			OrderStats {
				draft_orders: 0,
				pending_orders: 0,
				expired_orders: 0,
				total_value: 0
			}
		);

		reconciler.save_draft(&Order::draft(vec![item(0)], now())).await;
		reconciler
			.save_pending(&order("a", OrderStatus::QrIssued, 1))
			.await;
		reconciler
			.save_pending(&order("b", OrderStatus::QrIssued, 2))
			.await;
		reconciler
			.save_pending(&order("c", OrderStatus::Expired, 20))
			.await;
		reconciler
			.save_pending(&order("d", OrderStatus::Paid, 20))
			.await;

		assert_eq!(
			reconciler.stats().await,
			OrderStats {
				draft_orders: 1,
				pending_orders: 2,
				expired_orders: 1,
				total_value: 4 * 34
			}
		);
	}

	#[tokio::test]
	async fn test_mark_expired() {
		let storage = MemoryStorage::new();
		let (reconciler, _) = with_memory_remote(&storage);
		reconciler
			.save_pending(&order("issued", OrderStatus::QrIssued, 20))
			.await;
		reconciler
			.save_pending(&order("paid", OrderStatus::Paid, 20))
			.await;
		let mut events = reconciler.event_bus.subscribe();

		assert!(reconciler.mark_expired("issued").await);
		assert!(!reconciler.mark_expired("issued").await);
		assert!(!reconciler.mark_expired("paid").await);
		assert!(!reconciler.mark_expired("missing").await);

		let pending = reconciler.get_pending().await;
		assert_eq!(pending[0].status, OrderStatus::Expired);
		assert_eq!(pending[1].status, OrderStatus::Paid);

		assert_eq!(
			events.recv().await.unwrap(),
			ShopEvent::StatusChanged {
				order_id: "issued".into(),
				from: OrderStatus::QrIssued,
				to: OrderStatus::Expired,
			}
		);
	}

	#[tokio::test]
	async fn test_remote_failure_keeps_local_copy() {
		let storage = MemoryStorage::new();
		let mut remote = MockRemote::new();
		remote
			.expect_insert_order()
			.times(1)
			.returning(|_| Err(RemoteError::Network("connection refused".into())));
		let reconciler = reconciler(&storage, Box::new(remote), Some("user-1"));

		let o = order("order-1", OrderStatus::QrIssued, 0);
		reconciler.save_pending(&o).await;

		let err = reconciler.create_remote(&o).await.unwrap_err();
		assert!(matches!(err, ReconcilerError::RemoteWriteFailed { .. }));
		assert_eq!(err.reason(), "Network error: connection refused");
		assert_eq!(ids(&reconciler.get_pending().await), vec!["order-1"]);
	}

	#[tokio::test]
	async fn test_create_remote_sends_default_notes() {
		let storage = MemoryStorage::new();
		let mut remote = MockRemote::new();
		remote
			.expect_insert_order()
			.withf(|record: &NewOrderRecord| {
				record.user_id == "user-1"
					&& record.total_amount == 34
					&& record.status == OrderStatus::QrIssued
					&& record.notes == "Order created from localStorage - 1 items"
			})
			.times(1)
			.returning(|_| Ok("42".into()));
		let reconciler = reconciler(&storage, Box::new(remote), Some("user-1"));

		let remote_id = reconciler
			.create_remote(&order("order-1", OrderStatus::QrIssued, 0))
			.await
			.unwrap();
		assert_eq!(remote_id, "42");
	}

	#[tokio::test]
	async fn test_create_remote_requires_user() {
		let storage = MemoryStorage::new();
		let mut remote = MockRemote::new();
		remote.expect_insert_order().never();
		let reconciler = reconciler(&storage, Box::new(remote), None);

		let err = reconciler
			.create_remote(&order("order-1", OrderStatus::QrIssued, 0))
			.await
			.unwrap_err();
		assert_eq!(err.reason(), "User not authenticated");
	}

	#[tokio::test]
	async fn test_update_remote_status() {
		let storage = MemoryStorage::new();
		let mut remote = MockRemote::new();
		remote
			.expect_update_order()
			.with(eq("7"), eq(OrderStatus::Paid), eq(None::<String>))
			.times(1)
			.returning(|_, _, _| Ok(()));
		remote
			.expect_update_order()
			.with(eq("8"), eq(OrderStatus::Paid), eq(None::<String>))
			.returning(|_, _, _| Err(RemoteError::Rejected("404".into())));
		let reconciler = reconciler(&storage, Box::new(remote), Some("user-1"));

		assert!(reconciler
			.update_remote_status("7", OrderStatus::Paid, None)
			.await
			.is_ok());
		assert!(reconciler
			.update_remote_status("8", OrderStatus::Paid, None)
			.await
			.is_err());
	}

	#[tokio::test]
	async fn test_sync_pending_removes_synced_orders() {
		let storage = MemoryStorage::new();
		let (reconciler, remote) = with_memory_remote(&storage);
		let mut events = reconciler.event_bus.subscribe();

		let mut already_synced = order("synced", OrderStatus::QrIssued, 3);
		already_synced.remote_id = Some("99".into());
		reconciler.save_pending(&already_synced).await;
		reconciler
			.save_pending(&order("local-only", OrderStatus::QrIssued, 2))
			.await;

		let report = reconciler.sync_pending().await;
		assert_eq!(report, SyncReport { synced: 1, errors: vec![] });
		assert_eq!(remote.len().await, 1);

		assert_eq!(remote.get("1").await.unwrap().status, OrderStatus::QrIssued);
		assert_eq!(ids(&reconciler.get_pending().await), vec!["synced"]);

		let mut removed = Vec::new();
		while let Ok(event) = events.try_recv() {
			if let ShopEvent::OrderRemoved { order_id } = event {
				removed.push(order_id);
			}
		}
		assert_eq!(removed, vec!["local-only".to_string()]);

		// nothing left to push
		assert_eq!(reconciler.sync_pending().await.synced, 0);
	}

	#[tokio::test]
	async fn test_sync_pending_reports_failures() {
		let storage = MemoryStorage::new();
		let (reconciler, remote) = with_memory_remote(&storage);
		remote.set_fail_writes(true);

		reconciler
			.save_pending(&order("order-1", OrderStatus::QrIssued, 2))
			.await;

		let report = reconciler.sync_pending().await;
		assert_eq!(report.synced, 0);
		assert_eq!(
			report.errors,
			vec!["Order order-1: Network error: remote store offline".to_string()]
		);
		assert!(reconciler.get_pending().await[0].remote_id.is_none());
	}

	#[tokio::test]
	async fn test_checkout() {
		let storage = MemoryStorage::new();
		let (reconciler, remote) = with_memory_remote(&storage);
		reconciler.save_draft(&Order::draft(vec![item(2)], now())).await;
		let mut events = reconciler.event_bus.subscribe();

		let request = reconciler
			.checkout(vec![item(2), item(3)], Some("table 4".into()), now())
			.await
			.unwrap();

		let order = &request.order;
		assert!(order.id.starts_with("order-"));
		assert_eq!(order.status, OrderStatus::QrIssued);
		assert_eq!(order.total_amount, 74);
		assert_eq!(
			request.qr_text,
			format!("PROMPTPAY|ORDER:{}|AMOUNT:74|CURRENCY:THB", order.id)
		);
		assert_eq!(order.qr_code.as_deref(), Some(request.qr_text.as_str()));
		assert_eq!(request.expires_at, now() + Duration::minutes(15));
		assert_eq!(
			request.remote,
			RemoteOutcome::Synced {
				remote_id: "1".into()
			}
		);

		let pending = reconciler.get_pending().await;
		assert_eq!(pending, vec![order.clone()]);
		assert!(reconciler.load_draft().await.is_none());
		assert_eq!(remote.get("1").await.unwrap().notes, "table 4");

		let mut saw_payment_request = false;
		while let Ok(event) = events.try_recv() {
			if let ShopEvent::PaymentRequested { order_id, .. } = event {
				assert_eq!(order_id, order.id);
				saw_payment_request = true;
			}
		}
		assert!(saw_payment_request);
	}

	#[tokio::test]
	async fn test_checkout_with_remote_down_keeps_order() {
		let storage = MemoryStorage::new();
		let (reconciler, remote) = with_memory_remote(&storage);
		remote.set_fail_writes(true);

		let request = reconciler
			.checkout(vec![item(1)], None, now())
			.await
			.unwrap();

		assert_eq!(
			request.remote,
			RemoteOutcome::Failed {
				reason: "Network error: remote store offline".into()
			}
		);
		let pending = reconciler.get_pending().await;
		assert_eq!(pending.len(), 1);
		assert_eq!(pending[0].id, request.order.id);
		assert!(pending[0].remote_id.is_none());
	}

	#[tokio::test]
	async fn test_checkout_rejects_empty_order() {
		let storage = MemoryStorage::new();
		let (reconciler, _) = with_memory_remote(&storage);
		assert!(matches!(
			reconciler.checkout(vec![], None, now()).await,
			Err(ReconcilerError::EmptyOrder)
		));
		assert!(reconciler.get_pending().await.is_empty());
	}

	#[tokio::test]
	async fn test_expire_abandoned_only_changes_local_copy() {
		let storage = MemoryStorage::new();
		let (reconciler, remote) = with_memory_remote(&storage);

		let request = reconciler
			.checkout(vec![item(2)], None, now() - Duration::minutes(20))
			.await
			.unwrap();
		reconciler
			.save_pending(&order("recent", OrderStatus::QrIssued, 5))
			.await;

		// paid through the payment side, never seen locally
		let remote_id = request.order.remote_id.unwrap();
		reconciler
			.update_remote_status(&remote_id, OrderStatus::Paid, None)
			.await
			.unwrap();

		let expired = reconciler.expire_abandoned(now()).await;
		assert_eq!(expired, vec![request.order.id.clone()]);

		assert_eq!(
			remote.get(&remote_id).await.unwrap().status,
			OrderStatus::Paid
		);
		assert_eq!(reconciler.stats().await.expired_orders, 1);
		assert!(reconciler.expire_abandoned(now()).await.is_empty());
	}

	#[tokio::test]
	async fn test_initialize_cleans_up_then_reports_abandoned() {
		let storage = MemoryStorage::new();
		let (reconciler, _) = with_memory_remote(&storage);
		reconciler
			.save_pending(&order("ancient", OrderStatus::QrIssued, 90))
			.await;
		reconciler
			.save_pending(&order("abandoned", OrderStatus::QrIssued, 30))
			.await;
		reconciler
			.save_pending(&order("waiting", OrderStatus::QrIssued, 5))
			.await;

		let abandoned = reconciler.initialize(now()).await;
		assert_eq!(ids(&abandoned), vec!["abandoned"]);
		assert_eq!(
			ids(&reconciler.get_pending().await),
			vec!["abandoned", "waiting"]
		);
	}

	#[tokio::test]
	async fn test_pending_orders_survive_restart_with_file_storage() {
		use crepe_storage::implementations::file::FileStorage;

		let dir = tempfile::tempdir().unwrap();
		let open = || {
			OrderReconciler::new(
				Arc::new(StorageService::new(Box::new(FileStorage::new(
					dir.path().to_path_buf(),
				)))),
				Arc::new(RemoteService::new(
					Box::new(MemoryRemoteStore::new()),
					None,
				)),
				EventBus::new(16),
				ReconcilerSettings::default(),
			)
		};

		let request = open()
			.checkout(vec![item(1)], None, now())
			.await
			.unwrap();
		assert!(matches!(request.remote, RemoteOutcome::Failed { .. }));

		let restarted = open();
		assert_eq!(restarted.get_pending().await, vec![request.order.clone()]);
		assert_eq!(
			restarted.sync_pending().await.errors,
			vec![format!("Order {}: User not authenticated", request.order.id)]
		);
	}
}
