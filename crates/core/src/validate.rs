use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("content must not be empty")]
    Empty,
    #[error("content is unchanged")]
    Unchanged,
}

/// Trims `content` and rejects it when nothing is left.
pub fn validate_content(content: &str) -> Result<String, ValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    Ok(trimmed.to_string())
}

/// Like [`validate_content`], but also rejects an edit that would not change
/// the stored text.
pub fn validate_edit(current: &str, content: &str) -> Result<String, ValidationError> {
    let trimmed = validate_content(content)?;
    if trimmed == current.trim() {
        return Err(ValidationError::Unchanged);
    }
    Ok(trimmed)
}
