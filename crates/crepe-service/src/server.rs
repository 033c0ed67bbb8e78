//! HTTP server for the crepe shop API.
//!
//! Exposes the order reconciler to the storefront under `/api`.

use crate::apis::{
	order::{self, CheckoutRequest, DraftRequest},
	quote::{self, QuoteRequest, QuoteResponse},
	ApiError,
};
use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Json, Response},
	routing::{delete, get, post},
	Router,
};
use crepe_config::ApiConfig;
use crepe_core::{CheckoutReceipt, ShopEngine};
use crepe_types::{Order, OrderStats, SyncReport};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the shop engine for processing requests.
	pub engine: Arc<ShopEngine>,
}

/// Builds the router with all `/api` routes.
pub fn router(engine: Arc<ShopEngine>) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route(
					"/orders/draft",
					get(handle_get_draft)
						.put(handle_save_draft)
						.delete(handle_clear_draft),
				)
				.route("/orders/pending", get(handle_list_pending))
				.route("/orders/pending/{id}", delete(handle_remove_pending))
				.route("/orders/checkout", post(handle_checkout))
				.route("/orders/sync", post(handle_sync))
				.route("/orders/stats", get(handle_stats))
				.route("/quote", post(handle_quote)),
		)
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(AppState { engine })
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<ShopEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(engine);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Crepe shop API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles GET /api/orders/draft requests.
async fn handle_get_draft(State(state): State<AppState>) -> Result<Json<Order>, ApiError> {
	order::get_draft(&state.engine).await.map(Json)
}

/// Handles PUT /api/orders/draft requests.
async fn handle_save_draft(
	State(state): State<AppState>,
	Json(request): Json<DraftRequest>,
) -> Result<Response, ApiError> {
	match order::save_draft(&state.engine, request).await? {
		Some(draft) => Ok(Json(draft).into_response()),
		None => Ok(StatusCode::NO_CONTENT.into_response()),
	}
}

/// Handles DELETE /api/orders/draft requests.
async fn handle_clear_draft(State(state): State<AppState>) -> StatusCode {
	order::clear_draft(&state.engine).await;
	StatusCode::NO_CONTENT
}

/// Handles GET /api/orders/pending requests.
async fn handle_list_pending(State(state): State<AppState>) -> Json<Vec<Order>> {
	Json(order::list_pending(&state.engine).await)
}

/// Handles DELETE /api/orders/pending/{id} requests.
async fn handle_remove_pending(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
	order::remove_pending(&state.engine, &id).await?;
	Ok(StatusCode::NO_CONTENT)
}

/// Handles POST /api/orders/checkout requests.
async fn handle_checkout(
	State(state): State<AppState>,
	Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutReceipt>), ApiError> {
	let receipt = order::checkout(&state.engine, request).await?;
	Ok((StatusCode::CREATED, Json(receipt)))
}

/// Handles POST /api/orders/sync requests.
async fn handle_sync(State(state): State<AppState>) -> Json<SyncReport> {
	Json(order::sync(&state.engine).await)
}

/// Handles GET /api/orders/stats requests.
async fn handle_stats(State(state): State<AppState>) -> Json<OrderStats> {
	Json(order::stats(&state.engine).await)
}

/// Handles POST /api/quote requests.
async fn handle_quote(
	State(state): State<AppState>,
	Json(request): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, ApiError> {
	match quote::process_quote_request(request, &state.engine) {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Quote request failed: {}", e);
			Err(e)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::factory_registry::build_shop_from_config;
	use axum::body::{to_bytes, Body};
	use axum::http::{header, Method, Request};
	use crepe_config::builders::ConfigBuilder;
	use serde_json::{json, Value};
	use tower::ServiceExt;

	fn app() -> Router {
		let config = ConfigBuilder::new().with_log_notifier().build();
		router(Arc::new(build_shop_from_config(config).unwrap()))
	}

	async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
		let request = Request::builder().method(method).uri(uri);
		let request = match body {
			Some(body) => request
				.header(header::CONTENT_TYPE, "application/json")
				.body(Body::from(body.to_string())),
			None => request.body(Body::empty()),
		}
		.unwrap();

		let response = app.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		let value = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap()
		};
		(status, value)
	}

	#[tokio::test]
	async fn test_draft_endpoints() {
		let app = app();

		let (status, body) = send(&app, Method::GET, "/api/orders/draft", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["error"], "DRAFT_NOT_FOUND");

		let draft = json!({
			"items": [{"toppings": ["banana", "nutella"]}, {"toppings": [], "whipped": true}],
			"notes": "for here"
		});
		let (status, saved) = send(&app, Method::PUT, "/api/orders/draft", Some(draft)).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(saved["totalAmount"], 34 + 40);
		assert_eq!(saved["status"], "draft");

		let (status, loaded) = send(&app, Method::GET, "/api/orders/draft", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(loaded, saved);

		let (status, _) = send(&app, Method::DELETE, "/api/orders/draft", None).await;
		assert_eq!(status, StatusCode::NO_CONTENT);
		let (status, _) = send(&app, Method::GET, "/api/orders/draft", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_checkout_flow() {
		let app = app();

		let request = json!({
			"items": [{"toppings": ["a", "b", "c"], "whipped": true}],
			"email": "customer@example.com"
		});
		let (status, receipt) = send(&app, Method::POST, "/api/orders/checkout", Some(request)).await;
		assert_eq!(status, StatusCode::CREATED);
		assert_eq!(receipt["order"]["totalAmount"], 60);
		assert_eq!(receipt["order"]["status"], "qr_issued");
		assert_eq!(receipt["remote"]["status"], "synced");
		assert_eq!(receipt["notification"]["success"], true);
		let order_id = receipt["order"]["id"].as_str().unwrap().to_string();
		assert!(receipt["qrText"]
			.as_str()
			.unwrap()
			.ends_with("|AMOUNT:60|CURRENCY:THB"));

		let (_, pending) = send(&app, Method::GET, "/api/orders/pending", None).await;
		assert_eq!(pending.as_array().unwrap().len(), 1);

		let (_, stats) = send(&app, Method::GET, "/api/orders/stats", None).await;
		assert_eq!(
			stats,
			json!({"draftOrders": 0, "pendingOrders": 1, "expiredOrders": 0, "totalValue": 60})
		);

		let (_, report) = send(&app, Method::POST, "/api/orders/sync", None).await;
		assert_eq!(report, json!({"synced": 0, "errors": []}));

		let uri = format!("/api/orders/pending/{}", order_id);
		let (status, _) = send(&app, Method::DELETE, &uri, None).await;
		assert_eq!(status, StatusCode::NO_CONTENT);
		let (status, body) = send(&app, Method::DELETE, &uri, None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["error"], "ORDER_NOT_FOUND");
	}

	#[tokio::test]
	async fn test_checkout_validation() {
		let app = app();

		let (status, body) = send(
			&app,
			Method::POST,
			"/api/orders/checkout",
			Some(json!({"items": []})),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "EMPTY_ORDER");

		let (status, body) = send(
			&app,
			Method::POST,
			"/api/orders/checkout",
			Some(json!({"items": [{"toppings": []}], "email": "not-an-email"})),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_EMAIL");
	}

	#[tokio::test]
	async fn test_quote_endpoint() {
		let app = app();
		let (status, body) = send(
			&app,
			Method::POST,
			"/api/quote",
			Some(json!({"toppings": 2})),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["total"], 34);
		assert_eq!(body["currency"], "THB");
	}
}
