use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::billing::events::EventValidationError;
use crate::billing::period::PeriodError;
use crate::timestamp::TimestampError;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Reference(String),
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl BillingError {
    pub fn validation(message: impl Into<String>) -> Self {
        BillingError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            BillingError::Validation(_) => StatusCode::BAD_REQUEST,
            BillingError::Conflict(_) => StatusCode::CONFLICT,
            BillingError::Reference(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BillingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EventValidationError> for BillingError {
    fn from(err: EventValidationError) -> Self {
        BillingError::Validation(err.to_string())
    }
}

impl From<TimestampError> for BillingError {
    fn from(err: TimestampError) -> Self {
        BillingError::Validation(err.to_string())
    }
}

impl From<PeriodError> for BillingError {
    fn from(err: PeriodError) -> Self {
        BillingError::Validation(err.to_string())
    }
}

impl From<JsonRejection> for BillingError {
    fn from(rejection: JsonRejection) -> Self {
        BillingError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for BillingError {
    fn from(rejection: PathRejection) -> Self {
        BillingError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for BillingError {
    fn from(rejection: QueryRejection) -> Self {
        BillingError::Validation(rejection.body_text())
    }
}

impl IntoResponse for BillingError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            BillingError::Storage(_) => {
                tracing::error!(error = ?self, "billing storage failure");
                "internal error".to_string()
            }
            other => {
                tracing::debug!(error = %other, "rejected billing request");
                other.to_string()
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
