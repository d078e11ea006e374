use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::app::AccessError;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Maps an access-layer error to a response. `what` names the missing
    /// resource for 404s; `action` is logged and returned for 500s.
    pub fn from_access(err: AccessError, what: &str, action: &str) -> Self {
        match err {
            AccessError::NotFound => Self::not_found(format!("{} not found", what)),
            AccessError::Reference(detail) => {
                tracing::debug!(%detail, "dangling reference");
                Self::unprocessable("referenced record does not exist")
            }
            AccessError::Blocked => Self::forbidden("blocked"),
            AccessError::InteractionNotAllowed => Self::forbidden("interaction not allowed"),
            AccessError::Internal(err) => {
                tracing::error!(error = ?err, "{}", action);
                Self::internal(action)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
