//! Event types published by the order reconciler.
//!
//! Events flow through the engine's event bus so that other components (the
//! API, notifications, logging) can react to order changes without polling
//! local storage.

use crate::OrderStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events describing changes to locally held orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShopEvent {
	/// The draft slot was overwritten.
	DraftSaved { order_id: String, total_amount: u64 },
	/// The draft slot was cleared.
	DraftCleared,
	/// A payment reference was issued and the order moved to pending.
	PaymentRequested {
		order_id: String,
		qr_text: String,
		expires_at: DateTime<Utc>,
	},
	/// The remote store accepted an order.
	RemoteSynced { order_id: String, remote_id: String },
	/// The remote store rejected an order; the local copy is kept.
	RemoteSyncFailed { order_id: String, reason: String },
	/// A pending order changed status locally.
	StatusChanged {
		order_id: String,
		from: OrderStatus,
		to: OrderStatus,
	},
	/// A pending order was removed from local storage.
	OrderRemoved { order_id: String },
}
