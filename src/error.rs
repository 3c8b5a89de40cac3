use std::fmt;

use thiserror::Error;

/// Failure of a call to the prediction backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response shape from {endpoint}: {detail}")]
    Schema { endpoint: &'static str, detail: String },

    #[error("server rejected features: {0}")]
    Validation(String),

    #[error("{endpoint} answered with status {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },
}

/// One field that failed validation, with the message shown next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every failing field of one validation pass, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Reasons a form action did not go through.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("form is not loaded yet")]
    NotLoaded,

    #[error("no fields to submit")]
    NothingToSubmit,

    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("a prediction is already in flight")]
    Busy,

    #[error("invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Api(#[from] ApiError),
}
