//! Periodic expiry of abandoned orders.
//!
//! Every tick expires pending orders whose payment window has lapsed and drops
//! entries older than the retention period. Each tick re-reads local storage,
//! so stopping the task between ticks loses nothing.

use crate::reconciler::OrderReconciler;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Outcome of one monitor tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpirySweep {
	/// Ids of orders marked expired during this tick.
	pub expired: Vec<String>,
	/// Number of entries removed by retention cleanup.
	pub removed: usize,
}

pub struct ExpiryMonitor {
	reconciler: Arc<OrderReconciler>,
	interval: Duration,
}

impl ExpiryMonitor {
	pub fn new(reconciler: Arc<OrderReconciler>, interval: Duration) -> Self {
		Self {
			reconciler,
			interval,
		}
	}

	/// Runs one expiry and cleanup pass.
	pub async fn sweep(&self, now: DateTime<Utc>) -> ExpirySweep {
		let expired = self.reconciler.expire_abandoned(now).await;
		let removed = self.reconciler.cleanup_expired(now).await;

		if !expired.is_empty() || removed > 0 {
			tracing::info!(
				expired = expired.len(),
				removed = removed,
				"Expiry sweep changed local orders"
			);
		} else {
			tracing::trace!("Expiry sweep found nothing to do");
		}

		ExpirySweep { expired, removed }
	}

	/// Spawns the periodic task. Abort the returned handle to stop it.
	pub fn spawn(self) -> JoinHandle<()> {
		tokio::spawn(async move {
			let mut interval = tokio::time::interval(self.interval);
			interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
			// the first tick completes immediately; start-up already ran a pass
			interval.tick().await;

			loop {
				interval.tick().await;
				self.sweep(Utc::now()).await;
			}
		})
	}
}
