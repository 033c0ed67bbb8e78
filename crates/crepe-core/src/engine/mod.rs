//! Shop engine that owns the order reconciler and its background tasks.
//!
//! The engine wires the reconciler, the expiry monitor, the event bus and the
//! optional notifier together, and runs until Ctrl-C is received.

pub mod event_bus;
pub mod lifecycle;

use crate::cart::Cart;
use crate::monitoring::ExpiryMonitor;
use crate::reconciler::{OrderReconciler, PaymentRequest, ReconcilerError, ReconcilerSettings};
use chrono::{DateTime, Utc};
use crepe_config::Config;
use crepe_notify::{NotificationOutcome, NotificationService};
use crepe_remote::RemoteService;
use crepe_storage::StorageService;
use crepe_types::{truncate_id, ShopEvent};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Service error: {0}")]
	Service(String),
	#[error(transparent)]
	Reconciler(#[from] ReconcilerError),
}

/// Checkout result including the confirmation email attempt, if any.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
	#[serde(flatten)]
	pub payment: PaymentRequest,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notification: Option<NotificationOutcome>,
}

/// Main shop engine.
#[derive(Clone)]
pub struct ShopEngine {
	/// Shop configuration.
	pub(crate) config: Config,
	/// Reconciler for local and remote order state.
	pub(crate) reconciler: Arc<OrderReconciler>,
	/// Email notifier, when configured.
	pub(crate) notifier: Option<Arc<NotificationService>>,
	/// Event bus shared with the reconciler.
	pub(crate) event_bus: event_bus::EventBus,
}

impl ShopEngine {
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		remote: Arc<RemoteService>,
		notifier: Option<Arc<NotificationService>>,
		event_bus: event_bus::EventBus,
	) -> Self {
		let reconciler = Arc::new(OrderReconciler::new(
			storage,
			remote,
			event_bus.clone(),
			ReconcilerSettings::from_config(&config),
		));

		Self {
			config,
			reconciler,
			notifier,
			event_bus,
		}
	}

	/// Main loop: logs order events and runs the expiry monitor until Ctrl-C.
	pub async fn run(&self) -> Result<(), EngineError> {
		let mut event_receiver = self.event_bus.subscribe();

		let monitor_handle = ExpiryMonitor::new(
			self.reconciler.clone(),
			Duration::from_secs(self.config.persistence.check_interval_seconds),
		)
		.spawn();

		loop {
			tokio::select! {
				Ok(event) = event_receiver.recv() => {
					log_event(&event);
				}

				_ = tokio::signal::ctrl_c() => {
					break;
				}
			}
		}

		monitor_handle.abort();
		Ok(())
	}

	/// An empty cart priced with the configured rules.
	pub fn new_cart(&self) -> Cart {
		Cart::new(self.config.pricing)
	}

	/// A cart restored from the saved draft, or an empty one.
	pub async fn resume_cart(&self) -> Cart {
		match self.reconciler.load_draft().await {
			Some(draft) => Cart::from_draft(draft, self.config.pricing),
			None => self.new_cart(),
		}
	}

	/// Saves the cart as the draft, or clears the draft when the cart is empty.
	pub async fn save_cart(&self, cart: &Cart, now: DateTime<Utc>) -> Option<crepe_types::Order> {
		match cart.to_draft(now) {
			Some(draft) => {
				self.reconciler.save_draft(&draft).await;
				Some(draft)
			}
			None => {
				self.reconciler.clear_draft().await;
				None
			}
		}
	}

	/// Checks the cart out and, when an address is given, sends a confirmation.
	///
	/// An empty cart is rejected; otherwise the cart is emptied.
	pub async fn checkout(
		&self,
		cart: &mut Cart,
		email: Option<&str>,
		now: DateTime<Utc>,
	) -> Result<CheckoutReceipt, EngineError> {
		if cart.is_empty() {
			return Err(ReconcilerError::EmptyOrder.into());
		}

		let (items, notes) = cart.take_items();
		let payment = self.reconciler.checkout(items, notes, now).await?;

		let notification = match (email, &self.notifier) {
			(Some(to), Some(notifier)) => {
				Some(notifier.send_order_confirmation(to, &payment.order).await)
			}
			(Some(_), None) => {
				tracing::debug!("No notifier configured, skipping confirmation email");
				None
			}
			_ => None,
		};

		Ok(CheckoutReceipt {
			payment,
			notification,
		})
	}

	/// Returns a reference to the reconciler.
	pub fn reconciler(&self) -> &Arc<OrderReconciler> {
		&self.reconciler
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}
}

fn log_event(event: &ShopEvent) {
	match event {
		ShopEvent::DraftSaved {
			order_id,
			total_amount,
		} => {
			tracing::debug!(order_id = %truncate_id(order_id), total_amount, "Draft saved");
		}
		ShopEvent::DraftCleared => {
			tracing::debug!("Draft cleared");
		}
		ShopEvent::PaymentRequested {
			order_id,
			expires_at,
			..
		} => {
			tracing::info!(order_id = %truncate_id(order_id), expires_at = %expires_at, "Payment requested");
		}
		ShopEvent::RemoteSynced {
			order_id,
			remote_id,
		} => {
			tracing::info!(order_id = %truncate_id(order_id), remote_id = %remote_id, "Order synced");
		}
		ShopEvent::RemoteSyncFailed { order_id, reason } => {
			tracing::warn!(order_id = %truncate_id(order_id), reason = %reason, "Order kept locally only");
		}
		ShopEvent::StatusChanged { order_id, from, to } => {
			tracing::info!(order_id = %truncate_id(order_id), from = %from, to = %to, "Order status changed");
		}
		ShopEvent::OrderRemoved { order_id } => {
			tracing::debug!(order_id = %truncate_id(order_id), "Order removed");
		}
	}
}
