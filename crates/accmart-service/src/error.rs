//! API error types and responses.
//!
//! Every error body has the shape `{"success": false, "message": ..}`, plus a
//! machine-readable `code` for business rejections.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use accmart_core::{PaymentError, Rejection};
use accmart_ledger::LedgerError;
use accmart_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("Unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but insufficient permissions.
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("{0}")]
    BadRequest(String),

    /// Refused on business grounds.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// A uniqueness constraint was hit.
    #[error("{0}")]
    Conflict(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("{0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, code) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string(), None),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            Self::Rejected(rejection) => {
                let status = if rejection.is_forbidden() {
                    StatusCode::FORBIDDEN
                } else {
                    StatusCode::BAD_REQUEST
                };
                (status, rejection.to_string(), Some(rejection.code()))
            }
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone(), None),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (StatusCode::BAD_GATEWAY, msg.clone(), None),
        };

        let body = ErrorResponse {
            success: false,
            message,
            code,
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            StoreError::Conflict(msg) => {
                tracing::warn!(error = %msg, "Constraint violation");
                Self::Conflict("Request conflicts with existing data".into())
            }
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        tracing::warn!(error = %err, "Payment gateway error");
        let message = match err {
            PaymentError::NotConfigured => "Payment verification is not available",
            PaymentError::Unreachable(_) | PaymentError::InvalidResponse(_) => {
                "Unable to reach the payment gateway, please retry verification"
            }
        };
        Self::ExternalService(message.into())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Rejected(rejection) => Self::Rejected(rejection),
            LedgerError::Payment(err) => err.into(),
            LedgerError::Store(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accmart_core::TransactionStatus;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn rejection_is_bad_request_with_message() {
        let response = ApiError::from(Rejection::ProductNotAvailable).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Product not available");
        assert_eq!(body["code"], "product_not_available");
    }

    #[tokio::test]
    async fn admin_rejection_is_forbidden() {
        let response = ApiError::from(Rejection::ProtectedAdmin).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn status_transition_is_bad_request() {
        let err = LedgerError::Rejected(Rejection::InvalidStatusTransition {
            from: TransactionStatus::Completed,
            to: TransactionStatus::Failed,
        });
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn gateway_failure_is_bad_gateway() {
        let err = LedgerError::Payment(PaymentError::Unreachable("timeout".into()));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn internal_error_hides_details() {
        let response = ApiError::from(StoreError::Database("pool timed out".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["message"], "An internal error occurred");
        assert!(body.get("code").is_none());
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let err = StoreError::NotFound {
            entity: "transaction",
            id: "01HX".into(),
        };
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
