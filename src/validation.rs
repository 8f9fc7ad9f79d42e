/// Request validation
///
/// Explicit field checks that collect every failing field instead of
/// stopping at the first, so clients see the full picture in one response.
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Validation error detail for a single field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Collects field errors across a request
#[derive(Debug, Default)]
pub struct FieldValidator {
    errors: Vec<FieldError>,
}

impl FieldValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a non-blank value after trimming
    pub fn require(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(FieldError {
                field: field.to_string(),
                message: format!("{} is required", field),
            });
        }
        self
    }

    /// Require a plausible email address (non-blank, contains '@')
    pub fn require_email(&mut self, field: &str, value: &str) -> &mut Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.errors.push(FieldError {
                field: field.to_string(),
                message: format!("{} is required", field),
            });
        } else if !trimmed.contains('@') {
            self.errors.push(FieldError {
                field: field.to_string(),
                message: format!("{} is not a valid email address", field),
            });
        }
        self
    }

    /// Fail with every collected field error, or pass
    pub fn finish(self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::FieldValidation(self.errors))
        }
    }
}
