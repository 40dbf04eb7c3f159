//! Error types for board operations and the persistence gateway.

use serde::Serialize;
use thiserror::Error;

/// Error codes for programmatic error handling by API clients.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,

    // Lookup errors
    NotFound,

    // State errors
    GestureInProgress,
    BoardNotLoaded,

    // Backend errors
    PersistenceError,
}

/// Failure reported by a persistence backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl GatewayError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

// Database methods return anyhow errors; keep a NotFound raised inside them intact.
impl From<anyhow::Error> for GatewayError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<GatewayError>() {
            Ok(gateway_err) => gateway_err,
            Err(err) => GatewayError::Storage(format!("{:#}", err)),
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Errors raised by the board controller and reorder engine.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("a drag gesture is already in progress for {active}")]
    GestureInProgress { active: String },

    #[error("board is not loaded")]
    NotLoaded,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl BoardError {
    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            BoardError::MissingField { .. } => ErrorCode::MissingRequiredField,
            BoardError::InvalidValue { .. } => ErrorCode::InvalidFieldValue,
            BoardError::NotFound { .. } | BoardError::Gateway(GatewayError::NotFound { .. }) => {
                ErrorCode::NotFound
            }
            BoardError::GestureInProgress { .. } => ErrorCode::GestureInProgress,
            BoardError::NotLoaded => ErrorCode::BoardNotLoaded,
            BoardError::Gateway(GatewayError::Storage(_)) => ErrorCode::PersistenceError,
        }
    }

    /// The offending input field, for validation errors.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            BoardError::MissingField { field } | BoardError::InvalidValue { field, .. } => {
                Some(*field)
            }
            _ => None,
        }
    }
}

/// Serializable error body returned to API clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl From<&BoardError> for ErrorBody {
    fn from(err: &BoardError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            field: err.field().map(str::to_string),
        }
    }
}

/// Result type for board operations.
pub type BoardResult<T> = std::result::Result<T, BoardError>;
