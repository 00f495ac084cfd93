//! API Error Handling
//!
//! Structured error responses with HTTP status codes and request tracking.

use crate::{games::settlement::SettlementError, ledger::LedgerError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// FORBIDDEN, BAD_REQUEST, INTERNAL_ERROR, ...
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub request_id: String,
}

#[derive(Debug)]
pub enum ApiErrorKind {
    Forbidden,
    NotFound(String),
    BadRequest(String),
    InternalError(String),
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn forbidden(request_id: String) -> Self {
        Self {
            kind: ApiErrorKind::Forbidden,
            request_id,
        }
    }

    pub fn not_found(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::NotFound(message),
            request_id,
        }
    }

    pub fn bad_request(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::BadRequest(message),
            request_id,
        }
    }

    pub fn internal_error(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::InternalError(message),
            request_id,
        }
    }

    pub fn service_unavailable(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::ServiceUnavailable(message),
            request_id,
        }
    }

    /// Unknown players get 403, every other client fault 400, persistence 500
    pub fn from_settlement(request_id: String, error: SettlementError) -> Self {
        match error {
            SettlementError::UnknownPlayer => Self::forbidden(request_id),
            SettlementError::InvalidInput(msg) => Self::bad_request(request_id, msg),
            SettlementError::InsufficientFunds => {
                Self::bad_request(request_id, "Insufficient funds".to_string())
            }
            SettlementError::PersistenceFailure(msg) => Self::internal_error(request_id, msg),
        }
    }

    pub fn from_ledger(request_id: String, error: LedgerError) -> Self {
        match error {
            LedgerError::NotFound(id) => Self::not_found(request_id, format!("Player {} not found", id)),
            LedgerError::InvalidPlayer(msg) => Self::bad_request(request_id, msg),
            other => Self::internal_error(request_id, other.to_string()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ApiErrorKind::Forbidden => write!(f, "[{}] Forbidden", self.request_id),
            ApiErrorKind::NotFound(msg) => write!(f, "[{}] Not Found: {}", self.request_id, msg),
            ApiErrorKind::BadRequest(msg) => write!(f, "[{}] Bad Request: {}", self.request_id, msg),
            ApiErrorKind::InternalError(msg) => write!(f, "[{}] Internal Error: {}", self.request_id, msg),
            ApiErrorKind::ServiceUnavailable(msg) => write!(f, "[{}] Service Unavailable: {}", self.request_id, msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self.kind {
            ApiErrorKind::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", "Forbidden".to_string(), None),
            ApiErrorKind::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiErrorKind::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                "Bad request".to_string(),
                Some(serde_json::Value::String(msg)),
            ),
            ApiErrorKind::InternalError(msg) => {
                tracing::error!(request_id = %self.request_id, "{}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg, None)
            }
            ApiErrorKind::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg, None)
            }
        };

        let body = Json(ErrorResponse {
            request_id: self.request_id,
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settlement_error_status() {
        let cases = [
            (SettlementError::UnknownPlayer, StatusCode::FORBIDDEN),
            (SettlementError::InvalidInput("bet".to_string()), StatusCode::BAD_REQUEST),
            (SettlementError::InsufficientFunds, StatusCode::BAD_REQUEST),
            (SettlementError::PersistenceFailure("down".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            let response = ApiError::from_settlement("req-1".to_string(), error).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn test_ledger_not_found_is_404() {
        let error = ApiError::from_ledger("req-2".to_string(), LedgerError::NotFound(crate::games::PlayerId(9)));
        assert!(matches!(error.kind, ApiErrorKind::NotFound(_)));
        assert!(error.to_string().contains("req-2"));
    }
}
