//! Error handling for the HTTP layer
//!
//! [`AppError`] is the single failure type handlers return. Translating it
//! into a response is a pure mapping: a status code plus an [`ErrorBody`]
//! of the form `{"message": "..."}` or `{"message": ["...", ...]}`.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Message returned for every 5xx response; internal detail only goes to the log.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// A single message or an ordered list of messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    Single(String),
    List(Vec<String>),
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorMessage::Single(message) => f.write_str(message),
            ErrorMessage::List(messages) => f.write_str(&messages.join("; ")),
        }
    }
}

/// Wire format of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub message: ErrorMessage,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {message}")]
    Validation { message: ErrorMessage },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    /// The request was refused before reaching a handler (bad path or
    /// query, unreadable body, unsupported method). Keeps the status the
    /// framework chose.
    #[error("rejected ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Validation failure carrying every violation, in discovery order
    pub fn validation(messages: Vec<String>) -> Self {
        Self::Validation {
            message: ErrorMessage::List(messages),
        }
    }

    /// Validation failure with a single message
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            message: ErrorMessage::Single(message.into()),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Rejected { status, .. } => *status,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body sent to the client. Internal errors are replaced by a generic message.
    pub fn body(&self) -> ErrorBody {
        let message = match self {
            AppError::Validation { message } => message.clone(),
            AppError::NotFound { message } | AppError::Conflict { message } => {
                ErrorMessage::Single(message.clone())
            }
            AppError::Rejected { status, message } if !status.is_server_error() => {
                ErrorMessage::Single(message.clone())
            }
            AppError::Rejected { .. } | AppError::Internal(_) => {
                ErrorMessage::Single(INTERNAL_ERROR_MESSAGE.to_string())
            }
        };

        ErrorBody { message }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let status = self.status_code();
        let body = self.body();

        if status.is_server_error() {
            let detail = format!("{:#}", self);
            tracing::error!(
                error_id = %error_id,
                status_code = %status.as_u16(),
                error = %detail,
                "request failed"
            );
        } else {
            tracing::warn!(
                error_id = %error_id,
                status_code = %status.as_u16(),
                error = %self,
                "request rejected"
            );
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::{json, Value};

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_errors_keep_message_order() {
        let error = AppError::validation(vec![
            "instance: \"author\" is a required property".to_string(),
            "instance/pages: \"250\" is not of type \"integer\"".to_string(),
        ]);
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"message": [
                "instance: \"author\" is a required property",
                "instance/pages: \"250\" is not of type \"integer\""
            ]})
        );
    }

    #[tokio::test]
    async fn single_validation_message_is_a_string() {
        let response = AppError::invalid("Cannot update isbn").into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"message": "Cannot update isbn"})
        );
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            AppError::not_found("missing").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::conflict("duplicate").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::validation(vec![]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::rejected(StatusCode::PAYLOAD_TOO_LARGE, "too big").status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[tokio::test]
    async fn rejection_keeps_status_and_message() {
        let response =
            AppError::rejected(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            body_json(response).await,
            json!({"message": "Method Not Allowed"})
        );
    }

    #[tokio::test]
    async fn server_side_rejection_hides_detail() {
        let response = AppError::rejected(
            StatusCode::INTERNAL_SERVER_ERROR,
            "No paths parameters found for matched route",
        )
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"message": INTERNAL_ERROR_MESSAGE})
        );
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let internal_error = anyhow::anyhow!("database connection failed: secret dsn");
        let response = AppError::Internal(internal_error).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"message": INTERNAL_ERROR_MESSAGE})
        );
    }
}
