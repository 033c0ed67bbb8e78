//! Crepe pricing rules.
//!
//! Every crepe has a base price. Toppings are charged individually until a
//! full group of three is reached, which is charged at the bundle price
//! instead. Whipped cream is a flat extra.

use serde::{Deserialize, Serialize};

/// Prices in whole baht.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
	/// Price of a plain crepe.
	#[serde(default = "default_base")]
	pub base: u64,
	/// Price of one topping outside a bundle.
	#[serde(default = "default_single_topping")]
	pub single_topping: u64,
	/// Price of each complete group of three toppings.
	#[serde(default = "default_bundle_of_three")]
	pub bundle_of_three: u64,
	/// Price of whipped cream.
	#[serde(default = "default_whipped_cream")]
	pub whipped_cream: u64,
}

fn default_base() -> u64 {
	20
}

fn default_single_topping() -> u64 {
	7
}

fn default_bundle_of_three() -> u64 {
	20
}

fn default_whipped_cream() -> u64 {
	20
}

impl Default for Pricing {
	fn default() -> Self {
		Self {
			base: default_base(),
			single_topping: default_single_topping(),
			bundle_of_three: default_bundle_of_three(),
			whipped_cream: default_whipped_cream(),
		}
	}
}

impl Pricing {
	/// Cost of `count` toppings with bundle pricing applied.
	pub fn toppings_cost(&self, count: usize) -> u64 {
		let bundles = (count / 3) as u64;
		let remainder = (count % 3) as u64;
		bundles * self.bundle_of_three + remainder * self.single_topping
	}

	/// Total price of one crepe.
	pub fn item_total(&self, toppings_count: usize, whipped: bool) -> u64 {
		let whipped_cost = if whipped { self.whipped_cream } else { 0 };
		self.base + self.toppings_cost(toppings_count) + whipped_cost
	}
}
