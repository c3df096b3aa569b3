use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::messages;

pub type ConsoleResult<T> = Result<T, ConsoleError>;

/// One structured problem reported by the remote service for a form submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationItem {
    pub code: String,
    #[serde(default)]
    pub context: Value,
}

impl ValidationItem {
    pub fn new(code: impl Into<String>, context: Value) -> Self {
        Self {
            code: code.into(),
            context,
        }
    }

    /// Shorthand for a `{ "field": name }` context.
    pub fn for_field(code: impl Into<String>, field: &str) -> Self {
        Self::new(code, serde_json::json!({ "field": field }))
    }
}

impl fmt::Display for ValidationItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Value::Null => write!(f, "{}", self.code),
            Value::String(s) => write!(f, "{}: {}", self.code, s),
            other => write!(f, "{}: {}", self.code, other),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConsoleError {
    #[error("unauthorized: {0}")]
    Auth(String),
    #[error("validation failed: {}", join_items(.0))]
    Validation(Vec<ValidationItem>),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("unknown error: {0}")]
    Unknown(String),
}

fn join_items(items: &[ValidationItem]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Where a caught error ends up in the interface.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSurface {
    /// A toast-style notification carrying a message key.
    Notification(&'static str),
    /// A list rendered next to the form that triggered the request.
    Inline(Vec<ValidationItem>),
}

impl ConsoleError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn validation(items: impl IntoIterator<Item = ValidationItem>) -> Self {
        Self::Validation(items.into_iter().collect())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown(message.into())
    }

    pub fn surface(&self) -> ErrorSurface {
        match self {
            ConsoleError::Auth(_) => ErrorSurface::Notification(messages::UNAUTHORIZED),
            ConsoleError::Validation(items) => ErrorSurface::Inline(items.clone()),
            ConsoleError::Transport(_)
            | ConsoleError::Configuration(_)
            | ConsoleError::Unknown(_) => ErrorSurface::Notification(messages::INTERNAL_ERROR),
        }
    }

    /// Message key used when the error is shown as a notification, including
    /// validation failures raised outside a form.
    pub fn notification_key(&self) -> &'static str {
        match self.surface() {
            ErrorSurface::Notification(key) => key,
            ErrorSurface::Inline(_) => messages::INVALID_INPUT,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ConsoleError::Auth(_) => "auth",
            ConsoleError::Validation(_) => "validation",
            ConsoleError::Transport(_) => "transport",
            ConsoleError::Configuration(_) => "configuration",
            ConsoleError::Unknown(_) => "unknown",
        }
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            return Self::Unknown(value.to_string());
        }
        if value.status() == Some(reqwest::StatusCode::UNAUTHORIZED) {
            return Self::Auth(value.to_string());
        }
        Self::Transport(value.to_string())
    }
}
