//! Error taxonomy shared by every controller, and the success envelope.
//!
//! Every failure leaves the service as `{ "status": "error", "message", "details"? }`
//! with a non-2xx status. Upstream failures are logged here and reduced to a
//! generic message so database or SDK details never reach the client.

use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ErrorDetail {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<ErrorDetail>,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    NotEligible(String),

    #[error("{0}")]
    AlreadyClaimed(String),

    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Validation failure pinned to one request field.
    pub fn invalid_field(path: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Validation {
            message: "Validation failed".to_string(),
            details: vec![ErrorDetail {
                path: path.into(),
                message,
            }],
        }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized(reason.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. }
            | Self::NotEligible(_)
            | Self::AlreadyClaimed(_)
            | Self::PaymentFailed(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Conflict(what) => Self::Conflict(what),
            StoreError::Rejected(reason) => Self::validation(reason),
            StoreError::Other(err) => Self::Upstream(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

/// `Json` extractor whose rejections use the error envelope with status 400.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ErrorDetail>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (message, details) = match self {
            Self::Upstream(err) => {
                tracing::error!(error = ?err, "Upstream failure");
                ("Internal server error".to_string(), None)
            }
            Self::Validation { message, details } => {
                (message, (!details.is_empty()).then_some(details))
            }
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            status: "error".to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Success envelope used by every controller.
#[derive(Serialize, ToSchema)]
pub struct StdResponse<T, M> {
    pub data: Option<T>,
    pub message: Option<M>,
}

impl<T: Serialize, M: Serialize> IntoResponse for StdResponse<T, M> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
