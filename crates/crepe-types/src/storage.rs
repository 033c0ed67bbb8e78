//! Storage-related types for the crepe shop.

use std::str::FromStr;

/// Keys of the local key-value store.
///
/// The store holds exactly two entries: the single draft order and the list
/// of pending orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalKey {
	/// JSON-encoded draft order
	DraftOrder,
	/// JSON-encoded array of pending orders
	PendingOrders,
}

impl LocalKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			LocalKey::DraftOrder => "crepe_shop_draft_order",
			LocalKey::PendingOrders => "crepe_shop_pending_orders",
		}
	}

	/// Returns an iterator over all LocalKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::DraftOrder, Self::PendingOrders].into_iter()
	}
}

impl FromStr for LocalKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"crepe_shop_draft_order" => Ok(Self::DraftOrder),
			"crepe_shop_pending_orders" => Ok(Self::PendingOrders),
			_ => Err(()),
		}
	}
}

impl From<LocalKey> for &'static str {
	fn from(key: LocalKey) -> Self {
		key.as_str()
	}
}
