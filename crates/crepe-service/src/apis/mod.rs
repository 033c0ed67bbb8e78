//! HTTP API handlers and the shared error type.

pub mod order;
pub mod quote;

use axum::{
	http::StatusCode,
	response::{IntoResponse, Json, Response},
};
use crepe_core::{EngineError, ReconcilerError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
}

/// Structured API error type with HTTP status mapping.
#[derive(Debug)]
pub enum ApiError {
	/// Invalid request (400)
	BadRequest { error_type: String, message: String },
	/// Unknown resource (404)
	NotFound { error_type: String, message: String },
	/// A dependency such as the remote store is unavailable (503)
	ServiceUnavailable { error_type: String, message: String },
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl ApiError {
	pub fn bad_request(error_type: &str, message: impl Into<String>) -> Self {
		ApiError::BadRequest {
			error_type: error_type.to_string(),
			message: message.into(),
		}
	}

	pub fn not_found(error_type: &str, message: impl Into<String>) -> Self {
		ApiError::NotFound {
			error_type: error_type.to_string(),
			message: message.into(),
		}
	}

	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> StatusCode {
		match self {
			ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
			ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
			ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
			ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message) = match self {
			ApiError::BadRequest {
				error_type,
				message,
			}
			| ApiError::NotFound {
				error_type,
				message,
			}
			| ApiError::ServiceUnavailable {
				error_type,
				message,
			}
			| ApiError::InternalServerError {
				error_type,
				message,
			} => (error_type, message),
		};
		ErrorResponse {
			error: error_type.clone(),
			message: message.clone(),
		}
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ApiError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			ApiError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			ApiError::ServiceUnavailable { message, .. } => {
				write!(f, "Service Unavailable: {}", message)
			}
			ApiError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			}
		}
	}
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.status_code(), Json(self.to_error_response())).into_response()
	}
}

impl From<ReconcilerError> for ApiError {
	fn from(e: ReconcilerError) -> Self {
		match e {
			ReconcilerError::EmptyOrder => ApiError::bad_request("EMPTY_ORDER", e.to_string()),
			ReconcilerError::RemoteWriteFailed { .. } => ApiError::ServiceUnavailable {
				error_type: "REMOTE_UNAVAILABLE".to_string(),
				message: e.to_string(),
			},
			ReconcilerError::Lifecycle(_) => ApiError::InternalServerError {
				error_type: "INVALID_TRANSITION".to_string(),
				message: e.to_string(),
			},
		}
	}
}

impl From<EngineError> for ApiError {
	fn from(e: EngineError) -> Self {
		match e {
			EngineError::Reconciler(inner) => inner.into(),
			other => ApiError::InternalServerError {
				error_type: "INTERNAL_ERROR".to_string(),
				message: other.to_string(),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crepe_core::LifecycleError;
	use crepe_types::OrderStatus;

	#[test]
	fn test_reconciler_errors_map_to_statuses() {
		let cases = [
			(ReconcilerError::EmptyOrder, StatusCode::BAD_REQUEST),
			(
				ReconcilerError::RemoteWriteFailed {
					reason: "timeout".into(),
				},
				StatusCode::SERVICE_UNAVAILABLE,
			),
			(
				ReconcilerError::Lifecycle(LifecycleError::InvalidTransition {
					from: OrderStatus::Paid,
					to: OrderStatus::Draft,
				}),
				StatusCode::INTERNAL_SERVER_ERROR,
			),
		];

		for (error, status) in cases {
			assert_eq!(ApiError::from(error).status_code(), status);
		}
	}

	#[test]
	fn test_error_body() {
		let error = ApiError::not_found("ORDER_NOT_FOUND", "No pending order with id x");
		assert_eq!(
			error.to_error_response(),
			ErrorResponse {
				error: "ORDER_NOT_FOUND".into(),
				message: "No pending order with id x".into(),
			}
		);
		assert_eq!(error.to_string(), "Not Found: No pending order with id x");
	}
}
