//! Application error types
//!
//! `AppError` is what flows between the gateway client, the provider and the
//! HTTP layer. `PaymentError` is the narrower signal checkout initiation
//! raises so the ticketing platform can show its payment-failed page.

use http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::fmt;
use thiserror::Error;

use crate::database::error::DatabaseError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("{provider} error: {message}")]
    PaymentProvider {
        provider: String,
        message: String,
        is_retryable: bool,
    },

    #[error("{service} rate limit exceeded")]
    RateLimit {
        service: String,
        retry_after: Option<u64>,
    },

    #[error("{service} did not answer within {seconds} seconds")]
    Timeout { service: String, seconds: u64 },
}

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },
}

#[derive(Debug, Error)]
pub enum AppErrorKind {
    #[error(transparent)]
    External(ExternalError),

    #[error(transparent)]
    Infrastructure(InfrastructureError),

    #[error(transparent)]
    Domain(DomainError),
}

#[derive(Debug)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub context: Option<String>,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{} ({})", self.kind, context),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn provider(message: impl Into<String>, is_retryable: bool) -> Self {
        Self::new(AppErrorKind::External(ExternalError::PaymentProvider {
            provider: "Revolut".to_string(),
            message: message.into(),
            is_retryable,
        }))
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Infrastructure(
            InfrastructureError::Configuration {
                message: message.into(),
            },
        ))
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::new(AppErrorKind::Domain(DomainError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }))
    }

    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::External(ExternalError::PaymentProvider { is_retryable, .. }) => {
                *is_retryable
            }
            AppErrorKind::External(ExternalError::RateLimit { .. })
            | AppErrorKind::External(ExternalError::Timeout { .. }) => true,
            AppErrorKind::Infrastructure(InfrastructureError::Database(e)) => e.is_retryable(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match &self.kind {
            AppErrorKind::Domain(DomainError::NotFound { .. }) => true,
            AppErrorKind::Infrastructure(InfrastructureError::Database(e)) => e.is_not_found(),
            _ => false,
        }
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        Self::new(AppErrorKind::Infrastructure(InfrastructureError::Database(
            err,
        )))
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        Self::new(AppErrorKind::Domain(err))
    }
}

/// Raised by checkout initiation. For `Failed` the payment record has
/// already been annotated with the underlying cause.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaymentError {
    #[error("Payment {payment_id} not found")]
    NotFound { payment_id: i64 },

    /// Confirmed payments keep their gateway order; nothing was touched.
    #[error("Payment {payment_id} is already confirmed")]
    AlreadyConfirmed { payment_id: i64 },

    #[error("{message}")]
    Failed { message: String },
}

impl PaymentError {
    pub fn failed() -> Self {
        Self::Failed {
            message: "Payment failed".to_string(),
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = match self {
            PaymentError::NotFound { .. } => StatusCode::NOT_FOUND,
            PaymentError::AlreadyConfirmed { .. } => StatusCode::CONFLICT,
            PaymentError::Failed { .. } => StatusCode::PAYMENT_REQUIRED,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let message = if status == StatusCode::NOT_FOUND {
            self.to_string()
        } else {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
