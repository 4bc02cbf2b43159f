//! # API Error Type
//!
//! Unified error type for storefront handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Handler                                                                │
//! │  Result<Json<T>, ApiError>                                              │
//! │       │                                                                 │
//! │       ├── CoreError::NotPurchasable   ──► 422 NOT_PURCHASABLE          │
//! │       ├── CoreError::UnavailableItems ──► 422 UNAVAILABLE_ITEMS        │
//! │       ├── CoreError::ProductNotFound  ──► 404 NOT_FOUND                │
//! │       ├── DbError::*                  ──► 500 DATABASE_ERROR           │
//! │       └── bad query / body            ──► 400 VALIDATION_ERROR         │
//! │                                                                         │
//! │  Response body:                                                         │
//! │  { "error": { "code": "NOT_PURCHASABLE", "message": "..." } }           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pricing itself never produces these: a price that cannot be computed
//! degrades to "no adjustment". Only purchase and checkout gates reject.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use maple_core::CoreError;
use maple_db::DbError;

/// API error returned from handlers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Product hidden for the shopper's province (422)
    NotPurchasable,

    /// Cart lines hidden for the checkout province (422)
    UnavailableItems,

    /// Cart limits exceeded (422)
    CartError,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NotPurchasable | ErrorCode::UnavailableItems | ErrorCode::CartError => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", id),
            CoreError::LineNotFound(key) => ApiError::not_found("Cart line", key),
            CoreError::NotPurchasable { .. } => ApiError::new(ErrorCode::NotPurchasable, message),
            CoreError::UnavailableItems { .. } => {
                ApiError::new(ErrorCode::UnavailableItems, message)
            }
            CoreError::CartTooLarge { .. } | CoreError::QuantityTooLarge { .. } => {
                ApiError::new(ErrorCode::CartError, message)
            }
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, id),
            other => {
                tracing::error!(error = %other, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        });
        (self.code.status(), Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use maple_core::ProductId;

    #[test]
    fn test_core_errors_map_to_codes() {
        let err = ApiError::from(CoreError::UnavailableItems {
            names: vec!["Mango Ice".to_string()],
        });
        assert_eq!(err.code, ErrorCode::UnavailableItems);
        assert!(err.message.starts_with("The items \"Mango Ice\" are not available"));

        let err = ApiError::from(CoreError::ProductNotFound(ProductId(9)));
        assert_eq!(err.code.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Product not found: 9");
    }

    #[test]
    fn test_db_errors_hide_details() {
        let err = ApiError::from(DbError::QueryFailed("syntax error near SELECT".to_string()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");
    }
}
