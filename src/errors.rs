use serde_json::{Map, Value};
use thiserror::Error;

/// Caller-supplied input that can never succeed as given (empty keywords, bad regex, ...).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct InvalidInputError {
    operation: &'static str,
    message: String,
    field: Option<String>,
    suggestion: Option<String>,
}

impl InvalidInputError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
            field: None,
            suggestion: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }
}

/// Total upload size over the configured limit.
#[derive(Debug, Error)]
#[error("uploaded files total {actual} bytes, limit is {limit} bytes")]
pub struct PayloadTooLargeError {
    pub actual: u64,
    pub limit: u64,
}

/// A workbook, folder, sheet or result artifact that does not exist.
///
/// Carries diagnostics (attempted paths, nearby candidates) so the caller can fix the input.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct NotFoundError {
    message: String,
    suggestion: Option<String>,
    details: Map<String, Value>,
}

impl NotFoundError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: Map::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_collects_details() {
        let err = NotFoundError::new("folder missing")
            .with_suggestion("check the path")
            .with_detail("original_path", "C:\\data")
            .with_detail("files_in_folder", vec!["a.txt", "b.txt"]);
        assert_eq!(err.to_string(), "folder missing");
        assert_eq!(err.suggestion(), Some("check the path"));
        assert_eq!(err.details()["original_path"], "C:\\data");
        assert_eq!(err.details()["files_in_folder"][1], "b.txt");
    }

    #[test]
    fn invalid_input_survives_anyhow_round_trip() {
        let err: anyhow::Error = InvalidInputError::new("search", "keywords must not be empty")
            .with_field("keywords")
            .into();
        let typed = err.downcast_ref::<InvalidInputError>().unwrap();
        assert_eq!(typed.operation(), "search");
        assert_eq!(typed.field(), Some("keywords"));
    }
}
