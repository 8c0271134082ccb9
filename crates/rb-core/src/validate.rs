//! Form field checks shared by every handler.

use crate::error::{AppError, Result};

/// Trims `value` and rejects it if empty or longer than `max_len` characters.
pub fn required(field: &str, value: &str, max_len: Option<usize>) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError(format!("{} is required.", field)));
    }
    if let Some(max) = max_len {
        if trimmed.chars().count() > max {
            return Err(AppError::ValidationError(format!(
                "{} must be at most {} characters.",
                field, max
            )));
        }
    }
    Ok(trimmed.to_string())
}

/// Same checks as `required`, but hands back `value` as submitted so
/// indentation and trailing newlines in body text survive.
pub fn required_text(field: &str, value: &str, max_len: Option<usize>) -> Result<String> {
    required(field, value, max_len)?;
    Ok(value.to_string())
}
