//! Order lifecycle rules.
//!
//! Orders move forward only: draft -> qr_issued -> paid or expired. Drafts and
//! issued orders may also be cancelled. Paid, expired and cancelled orders are
//! terminal.

use crepe_types::{Order, OrderStatus};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors that can occur when changing an order's status.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
}

/// Validates and applies order status transitions.
pub struct OrderLifecycle;

// Static transition table - each state maps to allowed next states
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		OrderStatus::Draft,
		HashSet::from([OrderStatus::QrIssued, OrderStatus::Cancelled]),
	);
	m.insert(
		OrderStatus::QrIssued,
		HashSet::from([
			OrderStatus::Paid,
			OrderStatus::Expired,
			OrderStatus::Cancelled,
		]),
	);
	m.insert(OrderStatus::Paid, HashSet::new()); // terminal
	m.insert(OrderStatus::Expired, HashSet::new()); // terminal
	m.insert(OrderStatus::Cancelled, HashSet::new()); // terminal
	m
});

impl OrderLifecycle {
	/// Checks if a state transition is valid. Staying in the same state is
	/// always allowed.
	pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
		from == to || TRANSITIONS.get(&from).is_some_and(|set| set.contains(&to))
	}

	/// Moves `order` to `to`.
	///
	/// Returns `Ok(true)` when the status changed and `Ok(false)` when the
	/// order was already in `to`.
	pub fn transition(order: &mut Order, to: OrderStatus) -> Result<bool, LifecycleError> {
		let from = order.status;
		if from == to {
			return Ok(false);
		}
		if !Self::is_valid_transition(from, to) {
			return Err(LifecycleError::InvalidTransition { from, to });
		}
		order.status = to;
		Ok(true)
	}
}
