//! Price preview endpoint.

use super::ApiError;
use crepe_core::ShopEngine;
use serde::{Deserialize, Serialize};

/// Most toppings a single crepe can carry.
const MAX_TOPPINGS: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
	/// Number of toppings on the crepe.
	pub toppings: usize,
	#[serde(default)]
	pub whipped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
	pub base: u64,
	pub toppings_cost: u64,
	pub whipped_cream: u64,
	pub total: u64,
	pub currency: String,
}

/// Prices one crepe with the configured pricing rules.
pub fn process_quote_request(
	request: QuoteRequest,
	engine: &ShopEngine,
) -> Result<QuoteResponse, ApiError> {
	if request.toppings > MAX_TOPPINGS {
		return Err(ApiError::bad_request(
			"TOO_MANY_TOPPINGS",
			format!("A crepe can carry at most {} toppings", MAX_TOPPINGS),
		));
	}

	let pricing = engine.config().pricing;
	let whipped_cream = if request.whipped {
		pricing.whipped_cream
	} else {
		0
	};

	Ok(QuoteResponse {
		base: pricing.base,
		toppings_cost: pricing.toppings_cost(request.toppings),
		whipped_cream,
		total: engine.new_cart().quote(request.toppings, request.whipped),
		currency: engine.config().shop.currency.clone(),
	})
}
