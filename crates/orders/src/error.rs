//! Unified error handling for route handlers.
//!
//! Provides a unified `AppError` type mapping every domain failure to an HTTP
//! status and a stable machine-readable code. All route handlers should
//! return `Result<T, AppError>`. Bodies are JSON `{ "error": ..., "code":
//! ... }`; storage failures never leak internals to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use orchard_store::StoreError;

use crate::middleware::GuardError;
use crate::models::{CartError, OrderError, PaymentError, ProductError};

/// Application-level error type for the orders service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Order operation failed.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Cart operation failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Product operation failed.
    #[error(transparent)]
    Product(#[from] ProductError),

    /// Payment operation failed.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Authorization guard rejected the request.
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// Storage failure outside a model repository.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Bad request from client.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Order(err) => match err {
                OrderError::Validation(_) => StatusCode::BAD_REQUEST,
                OrderError::NotFound(_) => StatusCode::NOT_FOUND,
                OrderError::InvalidTransition { .. } => StatusCode::CONFLICT,
                OrderError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Cart(err) => match err {
                CartError::Validation(_) => StatusCode::BAD_REQUEST,
                CartError::ItemNotFound(_) => StatusCode::NOT_FOUND,
                CartError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Product(err) => match err {
                ProductError::Validation(_) => StatusCode::BAD_REQUEST,
                ProductError::NotFound(_) => StatusCode::NOT_FOUND,
                ProductError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Payment(err) => match err {
                PaymentError::NotFound(_) => StatusCode::NOT_FOUND,
                PaymentError::InvalidTransition { .. } => StatusCode::CONFLICT,
                PaymentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Guard(err) => err.status(),
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Order(err) => match err {
                OrderError::Validation(_) => "VALIDATION_ERROR",
                OrderError::NotFound(_) => "ORDER_NOT_FOUND",
                OrderError::InvalidTransition { .. } => "INVALID_STATUS_TRANSITION",
                OrderError::Store(_) => "STORAGE_ERROR",
            },
            Self::Cart(err) => match err {
                CartError::Validation(_) => "VALIDATION_ERROR",
                CartError::ItemNotFound(_) => "CART_ITEM_NOT_FOUND",
                CartError::Store(_) => "STORAGE_ERROR",
            },
            Self::Product(err) => match err {
                ProductError::Validation(_) => "VALIDATION_ERROR",
                ProductError::NotFound(_) => "PRODUCT_NOT_FOUND",
                ProductError::Store(_) => "STORAGE_ERROR",
            },
            Self::Payment(err) => match err {
                PaymentError::NotFound(_) => "PAYMENT_NOT_FOUND",
                PaymentError::InvalidTransition { .. } => "INVALID_STATUS_TRANSITION",
                PaymentError::Store(_) => "STORAGE_ERROR",
            },
            Self::Guard(err) => err.code(),
            Self::Store(_) => "STORAGE_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
        }
    }

    /// Client-facing message. Storage failures are reported generically.
    fn message(&self) -> String {
        if self.status() == StatusCode::INTERNAL_SERVER_ERROR {
            return "internal server error".to_string();
        }
        self.to_string()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request error");
        }

        let body = json!({ "error": self.message(), "code": self.code() });
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use orchard_core::{OrderId, OrderStatus, PaymentId, ProductId};

    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::from(OrderError::Validation("bad".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(OrderError::NotFound(OrderId::generate())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(OrderError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Pending,
            })
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(ProductError::NotFound(ProductId::generate())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(GuardError::Unavailable).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_storage_errors_do_not_leak() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "/secret/path");
        let err = AppError::Store(StoreError::Io(io));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "STORAGE_ERROR");
        assert_eq!(err.message(), "internal server error");
    }

    #[test]
    fn test_codes() {
        assert_eq!(
            AppError::from(PaymentError::NotFound(PaymentId::generate())).code(),
            "PAYMENT_NOT_FOUND"
        );
        assert_eq!(
            AppError::BadRequest("nope".to_string()).code(),
            "BAD_REQUEST"
        );
    }
}
