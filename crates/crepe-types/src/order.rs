//! Order types for the crepe shop.
//!
//! An order is a list of crepes (line items) together with its lifecycle
//! status. Orders are stored as JSON in local storage using camelCase field
//! names, so the serialized form stays readable by the storefront front end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Pricing;

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	/// Being assembled by the customer.
	Draft,
	/// A payment reference has been generated and shown to the customer.
	QrIssued,
	/// Payment confirmed.
	Paid,
	/// Payment window elapsed without confirmation.
	Expired,
	/// Explicitly cancelled.
	Cancelled,
}

impl OrderStatus {
	/// Returns the wire representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Draft => "draft",
			OrderStatus::QrIssued => "qr_issued",
			OrderStatus::Paid => "paid",
			OrderStatus::Expired => "expired",
			OrderStatus::Cancelled => "cancelled",
		}
	}

	/// Returns true for statuses no order can leave.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			OrderStatus::Paid | OrderStatus::Expired | OrderStatus::Cancelled
		)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"draft" => Ok(Self::Draft),
			"qr_issued" => Ok(Self::QrIssued),
			"paid" => Ok(Self::Paid),
			"expired" => Ok(Self::Expired),
			"cancelled" => Ok(Self::Cancelled),
			other => Err(format!("Unknown order status: {}", other)),
		}
	}
}

/// A single crepe in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
	/// Unique identifier of the line item.
	pub id: String,
	/// Selected toppings, without duplicates.
	pub toppings: Vec<String>,
	/// Selected sauces, without duplicates.
	pub sauces: Vec<String>,
	/// Whether whipped cream was added.
	pub whipped: bool,
	/// Price of this crepe in whole baht.
	pub total: u64,
	/// When the item was added.
	pub created_at: DateTime<Utc>,
}

impl OrderItem {
	/// Creates a priced line item.
	///
	/// Duplicate toppings and sauces are dropped (first occurrence wins) before
	/// the price is computed, matching how the storefront lets each topping be
	/// picked at most once.
	pub fn new(
		toppings: Vec<String>,
		sauces: Vec<String>,
		whipped: bool,
		pricing: &Pricing,
		now: DateTime<Utc>,
	) -> Self {
		let toppings = dedup_preserving_order(toppings);
		let sauces = dedup_preserving_order(sauces);
		let total = pricing.item_total(toppings.len(), whipped);

		Self {
			id: format!("item-{}", uuid::Uuid::new_v4().simple()),
			toppings,
			sauces,
			whipped,
			total,
			created_at: now,
		}
	}
}

fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
	let mut seen = std::collections::HashSet::new();
	values
		.into_iter()
		.filter(|v| seen.insert(v.clone()))
		.collect()
}

/// An order as kept in local storage and sent to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Locally generated identifier.
	pub id: String,
	/// Line items in the order they were added.
	pub items: Vec<OrderItem>,
	/// Sum of the item totals.
	pub total_amount: u64,
	/// Current lifecycle status.
	pub status: OrderStatus,
	/// Payment reference text, once issued.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub qr_code: Option<String>,
	/// Free text from the customer.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	/// When the order was created.
	pub created_at: DateTime<Utc>,
	/// Identifier assigned by the remote store after a successful insert.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub remote_id: Option<String>,
}

impl Order {
	/// Creates an order whose total is the sum of its item totals.
	pub fn new(
		id: impl Into<String>,
		items: Vec<OrderItem>,
		status: OrderStatus,
		created_at: DateTime<Utc>,
	) -> Self {
		let total_amount = sum_totals(&items);
		Self {
			id: id.into(),
			items,
			total_amount,
			status,
			qr_code: None,
			notes: None,
			created_at,
			remote_id: None,
		}
	}

	/// Creates a draft with a fresh `draft-` identifier.
	pub fn draft(items: Vec<OrderItem>, created_at: DateTime<Utc>) -> Self {
		Self::new(
			format!("draft-{}", uuid::Uuid::new_v4().simple()),
			items,
			OrderStatus::Draft,
			created_at,
		)
	}

	/// Sets the notes, treating blank text as no notes.
	pub fn with_notes(mut self, notes: Option<String>) -> Self {
		self.notes = notes
			.map(|n| n.trim().to_string())
			.filter(|n| !n.is_empty());
		self
	}

	/// Recomputes `total_amount` from the items.
	pub fn recompute_total(&mut self) {
		self.total_amount = sum_totals(&self.items);
	}

	/// Returns true when `total_amount` matches the item totals.
	pub fn is_consistent(&self) -> bool {
		self.total_amount == sum_totals(&self.items)
	}

	/// Minutes elapsed between creation and `now` (negative if in the future).
	pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
		(now - self.created_at).num_minutes()
	}
}

fn sum_totals(items: &[OrderItem]) -> u64 {
	items.iter().map(|item| item.total).sum()
}

/// Summary counts over the locally stored orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
	/// 1 when a draft exists, 0 otherwise.
	pub draft_orders: u32,
	/// Pending orders still waiting for payment (`qr_issued`).
	pub pending_orders: u32,
	/// Pending orders marked `expired`.
	pub expired_orders: u32,
	/// Sum of `total_amount` over every pending order, whatever its status.
	pub total_value: u64,
}

/// Result of pushing locally held orders to the remote store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
	/// Number of orders the remote store accepted.
	pub synced: usize,
	/// One message per failed order, `"Order <id>: <reason>"`.
	pub errors: Vec<String>,
}
