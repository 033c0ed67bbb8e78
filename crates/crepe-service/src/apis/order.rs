//! Order endpoints.
//!
//! Thin wrappers that validate request bodies and hand them to the shop
//! engine. The draft endpoints drive the cart, the pending endpoints expose
//! the reconciler's local order list.

use super::ApiError;
use chrono::Utc;
use crepe_core::{Cart, CheckoutReceipt, ShopEngine};
use crepe_types::{truncate_id, Order, OrderStats, SyncReport};
use serde::Deserialize;
use tracing::{info, warn};

/// Longest accepted topping or sauce name.
const MAX_NAME_LENGTH: usize = 64;
/// Most crepes accepted in a single order.
const MAX_ITEMS: usize = 50;

/// One crepe in a request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
	#[serde(default)]
	pub toppings: Vec<String>,
	#[serde(default)]
	pub sauces: Vec<String>,
	#[serde(default)]
	pub whipped: bool,
}

/// Body of `PUT /orders/draft`.
#[derive(Debug, Clone, Deserialize)]
pub struct DraftRequest {
	pub items: Vec<ItemRequest>,
	#[serde(default)]
	pub notes: Option<String>,
}

/// Body of `POST /orders/checkout`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
	pub items: Vec<ItemRequest>,
	#[serde(default)]
	pub notes: Option<String>,
	/// Address for the confirmation email.
	#[serde(default)]
	pub email: Option<String>,
}

fn validate_items(items: &[ItemRequest]) -> Result<(), ApiError> {
	if items.len() > MAX_ITEMS {
		return Err(ApiError::bad_request(
			"TOO_MANY_ITEMS",
			format!("An order may contain at most {} crepes", MAX_ITEMS),
		));
	}

	let names = items
		.iter()
		.flat_map(|item| item.toppings.iter().chain(item.sauces.iter()));
	for name in names {
		if name.trim().is_empty() || name.len() > MAX_NAME_LENGTH {
			return Err(ApiError::bad_request(
				"INVALID_ITEM",
				format!(
					"Topping and sauce names must be 1 to {} characters",
					MAX_NAME_LENGTH
				),
			));
		}
	}

	Ok(())
}

fn fill_cart(cart: &mut Cart, items: Vec<ItemRequest>, notes: Option<String>) {
	let now = Utc::now();
	for item in items {
		cart.add_item(item.toppings, item.sauces, item.whipped, now);
	}
	cart.set_notes(notes);
}

/// Returns the saved draft.
pub async fn get_draft(engine: &ShopEngine) -> Result<Order, ApiError> {
	engine
		.reconciler()
		.load_draft()
		.await
		.ok_or_else(|| ApiError::not_found("DRAFT_NOT_FOUND", "No draft order saved"))
}

/// Replaces the draft with the given items. An empty list clears it.
pub async fn save_draft(
	engine: &ShopEngine,
	request: DraftRequest,
) -> Result<Option<Order>, ApiError> {
	validate_items(&request.items)?;

	let mut cart = engine.new_cart();
	fill_cart(&mut cart, request.items, request.notes);
	Ok(engine.save_cart(&cart, Utc::now()).await)
}

pub async fn clear_draft(engine: &ShopEngine) {
	engine.reconciler().clear_draft().await;
}

pub async fn list_pending(engine: &ShopEngine) -> Vec<Order> {
	engine.reconciler().get_pending().await
}

/// Removes one pending order.
pub async fn remove_pending(engine: &ShopEngine, id: &str) -> Result<(), ApiError> {
	if engine.reconciler().remove_pending(id).await {
		Ok(())
	} else {
		Err(ApiError::not_found(
			"ORDER_NOT_FOUND",
			format!("No pending order with id {}", id),
		))
	}
}

/// Checks out the given items and issues a payment reference.
pub async fn checkout(
	engine: &ShopEngine,
	request: CheckoutRequest,
) -> Result<CheckoutReceipt, ApiError> {
	validate_items(&request.items)?;
	if let Some(email) = &request.email {
		if !crepe_notify::is_valid_email(email) {
			return Err(ApiError::bad_request(
				"INVALID_EMAIL",
				format!("Invalid email address: {}", email),
			));
		}
	}

	let mut cart = engine.new_cart();
	fill_cart(&mut cart, request.items, request.notes);

	let receipt = engine
		.checkout(&mut cart, request.email.as_deref(), Utc::now())
		.await
		.map_err(|e| {
			warn!(error = %e, "Checkout failed");
			ApiError::from(e)
		})?;

	info!(
		order_id = %truncate_id(&receipt.payment.order.id),
		total_amount = receipt.payment.order.total_amount,
		"Checkout completed"
	);
	Ok(receipt)
}

pub async fn sync(engine: &ShopEngine) -> SyncReport {
	engine.reconciler().sync_pending().await
}

pub async fn stats(engine: &ShopEngine) -> OrderStats {
	engine.reconciler().stats().await
}
