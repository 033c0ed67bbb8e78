//! Order builder.
//!
//! Collects crepes before checkout. The cart prices each item as it is added
//! and converts to and from the draft order kept in local storage.

use chrono::{DateTime, Utc};
use crepe_types::{Order, OrderItem, Pricing};

/// Crepes selected by the customer but not yet checked out.
#[derive(Debug, Clone)]
pub struct Cart {
	pricing: Pricing,
	items: Vec<OrderItem>,
	/// Identifier of the draft this cart was restored from, reused on save.
	draft_id: Option<String>,
	notes: Option<String>,
}

impl Cart {
	pub fn new(pricing: Pricing) -> Self {
		Self {
			pricing,
			items: Vec::new(),
			draft_id: None,
			notes: None,
		}
	}

	/// Restores a cart from a saved draft, keeping its id and item prices.
	pub fn from_draft(order: Order, pricing: Pricing) -> Self {
		Self {
			pricing,
			items: order.items,
			draft_id: Some(order.id),
			notes: order.notes,
		}
	}

	/// Prices and appends a crepe. Duplicate toppings and sauces are dropped.
	pub fn add_item(
		&mut self,
		toppings: Vec<String>,
		sauces: Vec<String>,
		whipped: bool,
		now: DateTime<Utc>,
	) -> &OrderItem {
		let item = OrderItem::new(toppings, sauces, whipped, &self.pricing, now);
		self.items.push(item);
		&self.items[self.items.len() - 1]
	}

	/// Removes the item with `id`. Returns false when no such item exists.
	pub fn remove_item(&mut self, id: &str) -> bool {
		let before = self.items.len();
		self.items.retain(|item| item.id != id);
		self.items.len() != before
	}

	pub fn set_notes(&mut self, notes: Option<String>) {
		self.notes = notes;
	}

	pub fn items(&self) -> &[OrderItem] {
		&self.items
	}

	pub fn total(&self) -> u64 {
		self.items.iter().map(|item| item.total).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn clear(&mut self) {
		self.items.clear();
		self.draft_id = None;
		self.notes = None;
	}

	/// Builds the draft order for this cart, or `None` when it is empty.
	pub fn to_draft(&self, now: DateTime<Utc>) -> Option<Order> {
		if self.is_empty() {
			return None;
		}
		let order = match &self.draft_id {
			Some(id) => Order::new(
				id.clone(),
				self.items.clone(),
				crepe_types::OrderStatus::Draft,
				now,
			),
			None => Order::draft(self.items.clone(), now),
		};
		Some(order.with_notes(self.notes.clone()))
	}

	/// Takes the items out of the cart for checkout, leaving it empty.
	pub fn take_items(&mut self) -> (Vec<OrderItem>, Option<String>) {
		let items = std::mem::take(&mut self.items);
		let notes = self.notes.take();
		self.draft_id = None;
		(items, notes)
	}

	/// Price preview for a crepe with `toppings_count` toppings.
	pub fn quote(&self, toppings_count: usize, whipped: bool) -> u64 {
		self.pricing.item_total(toppings_count, whipped)
	}
}
