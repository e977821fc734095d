use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::checkout::CheckoutError;
use crate::client::ClientError;
use crate::pricing::PricingError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Checkout summary unavailable: {0}")]
    SummaryUnavailable(String),

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Ticketing backend error")]
    BackendError(#[from] reqwest::Error),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SummaryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::OrderRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BackendError(_) => StatusCode::BAD_GATEWAY,
            AppError::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::SummaryUnavailable(_) => "SUMMARY_UNAVAILABLE",
            AppError::OrderRejected(_) => "ORDER_REJECTED",
            AppError::BackendError(_) => "BACKEND_ERROR",
            AppError::ExternalServiceError(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::OrderRejected(msg) => {
                warn!(code = self.code(), message = %msg, "Request refused");
            }
            AppError::SummaryUnavailable(msg)
            | AppError::ExternalServiceError(msg)
            | AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::BackendError(e) => {
                error!(error = ?e, "Ticketing backend error");
            }
        }
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Request(e) => AppError::BackendError(e),
            ClientError::NotFound { resource } => AppError::NotFound(resource),
            ClientError::Rejected { reason, .. } => AppError::ExternalServiceError(reason),
            ClientError::InvalidBaseUrl(url) => {
                AppError::InternalServerError(format!("Invalid ticketing backend URL '{url}'"))
            }
        }
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::Conversion(_) => AppError::SummaryUnavailable(
                "Totals cannot be shown right now, please try again".to_string(),
            ),
            PricingError::Overflow => AppError::ValidationError(err.to_string()),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::UnknownTicketType(_)
            | CheckoutError::Cart(_)
            | CheckoutError::Discount(_)
            | CheckoutError::EmptyCart
            | CheckoutError::WrongStep(_) => AppError::ValidationError(err.to_string()),
            CheckoutError::OrderRejected(reason) => AppError::OrderRejected(reason),
            CheckoutError::PaymentExpired(_) | CheckoutError::PaymentTimeout(_) => {
                AppError::ExternalServiceError(err.to_string())
            }
            CheckoutError::Backend(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::SummaryUnavailable(msg)
            | AppError::OrderRejected(msg)
            | AppError::ExternalServiceError(msg) => msg.clone(),
            AppError::BackendError(_) => "The ticketing service could not be reached".to_string(),
            AppError::InternalServerError(_) => "An internal error occurred".to_string(),
        };

        error_response(code, public_message, None, status)
    }
}
