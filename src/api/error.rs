//! Mapping of board errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::{BoardError, ErrorBody, ErrorCode};
use crate::notify::Notification;

/// A failed request: the error plus any notices the failure raised.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
    notifications: Vec<Notification>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    notifications: Vec<Notification>,
}

impl ApiError {
    pub fn with_notifications(mut self, notifications: Vec<Notification>) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> ErrorCode {
        self.body.code
    }
}

pub(crate) fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::MissingRequiredField | ErrorCode::InvalidFieldValue => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::GestureInProgress => StatusCode::CONFLICT,
        ErrorCode::BoardNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::PersistenceError => StatusCode::BAD_GATEWAY,
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        let body = ErrorBody::from(&err);
        Self {
            status: status_for(body.code),
            body,
            notifications: Vec::new(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = ErrorResponse {
            error: self.body,
            notifications: self.notifications,
        };
        (self.status, Json(payload)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;

    #[test]
    fn error_codes_map_to_statuses() {
        let cases = [
            (BoardError::missing_field("title"), StatusCode::BAD_REQUEST),
            (
                BoardError::invalid_value("color", "nope"),
                StatusCode::BAD_REQUEST,
            ),
            (BoardError::not_found("task", "t1"), StatusCode::NOT_FOUND),
            (
                BoardError::Gateway(GatewayError::not_found("board", "b1")),
                StatusCode::NOT_FOUND,
            ),
            (
                BoardError::GestureInProgress { active: "c1".into() },
                StatusCode::CONFLICT,
            ),
            (BoardError::NotLoaded, StatusCode::SERVICE_UNAVAILABLE),
            (
                BoardError::Gateway(GatewayError::Storage("disk full".into())),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }
}
