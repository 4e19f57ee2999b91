//! Error types for the extension runtime.

use crate::config::ConfigError;
use hookwire_model::{MarshalError, ModelError};
use hookwire_storage::StorageError;
use hookwire_types::Priority;
use std::fmt;
use thiserror::Error;

/// Result type for runtime operations.
pub type ExtensionResult<T> = Result<T, ExtensionError>;

/// Errors raised by the runtime.
#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("failed to dispatch event '{event}' for schema '{schema_id}' at priority '{priority}' with index '{index}': {source}")]
    SchemaHandler {
        event: String,
        schema_id: String,
        priority: Priority,
        index: usize,
        #[source]
        source: HandlerError,
    },

    #[error("failed to dispatch event '{event}' at priority '{priority}' with index '{index}': {source}")]
    Handler {
        event: String,
        priority: Priority,
        index: usize,
        #[source]
        source: HandlerError,
    },

    #[error("failed to parse resource from context with schema '{schema_id}' for event '{event}': {message}")]
    ResourceParse {
        schema_id: String,
        event: String,
        message: String,
    },

    /// The write was persisted, then a post-event handler failed.
    #[error("post-processing of '{event}' failed: {source}")]
    PostEvent {
        event: String,
        #[source]
        source: Box<ExtensionError>,
    },

    #[error("resource type '{0}' not registered")]
    MissingType(String),

    #[error("schema '{schema_id}' is registered with type {registered}, not {requested}")]
    TypeMismatch {
        schema_id: String,
        registered: &'static str,
        requested: &'static str,
    },

    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("resource of schema '{0}' has no id")]
    MissingResourceId(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("marshal error: {0}")]
    Marshal(#[from] MarshalError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("extension module not found: {0}")]
    ModuleNotFound(String),

    #[error("failed to start extension '{module}': {source}")]
    Initialization {
        module: String,
        #[source]
        source: HandlerError,
    },

    #[error("before start hook of environment '{environment}' failed: {source}")]
    BeforeStart {
        environment: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("environment '{0}' is not started")]
    NotStarted(String),

    #[error("environment '{0}' is stopped")]
    Stopped(String),

    #[error("environment '{0}' has no database")]
    NoDatabase(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ExtensionError {
    /// Wraps a failure of a post-write event.
    pub fn post_event(event: impl Into<String>, source: ExtensionError) -> Self {
        Self::PostEvent {
            event: event.into(),
            source: Box::new(source),
        }
    }

    /// Whether the error is the distinguished not-found condition.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ResourceNotFound(_) => true,
            Self::Storage(err) => err.is_not_found(),
            _ => false,
        }
    }

    /// The handler error that aborted dispatch, if any.
    pub fn handler_error(&self) -> Option<&HandlerError> {
        match self {
            Self::SchemaHandler { source, .. }
            | Self::Handler { source, .. }
            | Self::Initialization { source, .. } => Some(source),
            Self::PostEvent { source, .. } => source.handler_error(),
            _ => None,
        }
    }
}

/// Category of a handler failure, mapped to an HTTP status by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorCode {
    pub const fn http_status(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BadRequest => "bad request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::Internal => "internal error",
        };
        f.write_str(name)
    }
}

/// Error returned by extension handlers and initializers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct HandlerError {
    pub code: ErrorCode,
    pub message: String,
}

impl HandlerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

impl From<ExtensionError> for HandlerError {
    fn from(err: ExtensionError) -> Self {
        if let Some(source) = err.handler_error() {
            return source.clone();
        }
        let code = match &err {
            _ if err.is_not_found() => ErrorCode::NotFound,
            ExtensionError::ResourceParse { .. } | ExtensionError::Marshal(_) => {
                ErrorCode::BadRequest
            }
            ExtensionError::Storage(StorageError::Conflict(_)) => ErrorCode::Conflict,
            _ => ErrorCode::Internal,
        };
        Self::new(code, err.to_string())
    }
}

impl From<MarshalError> for HandlerError {
    fn from(err: MarshalError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_survives_post_event_wrapping() {
        let inner = ExtensionError::Handler {
            event: "post_create".into(),
            priority: 0,
            index: 1,
            source: HandlerError::conflict("duplicate name"),
        };
        let err = ExtensionError::post_event("post_create", inner);

        assert_eq!(
            HandlerError::from(err),
            HandlerError::conflict("duplicate name")
        );
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = HandlerError::from(ExtensionError::Storage(StorageError::NotFound(
            "network".into(),
        )));
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn anyhow_context_is_kept() {
        let err = anyhow::anyhow!("socket closed").context("calling quota service");
        let handler_error = HandlerError::from(err);
        assert_eq!(handler_error.code, ErrorCode::Internal);
        assert_eq!(handler_error.message, "calling quota service: socket closed");
    }
}
