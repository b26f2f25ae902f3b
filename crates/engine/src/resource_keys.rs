use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceKeyError {
    #[error("resource name must not be empty")]
    Empty,
    #[error("resource name must not start with '/'")]
    LeadingSlash,
    #[error("resource name must not contain '..'")]
    ParentTraversal,
    #[error("resource name contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

/// Names registered in the resource cache are lowercase identifiers such as
/// `piece_black` or `pieces/king-black`.
pub(crate) fn validate_resource_key(key: &str) -> Result<(), ResourceKeyError> {
    if key.is_empty() {
        return Err(ResourceKeyError::Empty);
    }
    if key.starts_with('/') {
        return Err(ResourceKeyError::LeadingSlash);
    }
    if key.contains("..") {
        return Err(ResourceKeyError::ParentTraversal);
    }
    for ch in key.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-') {
            continue;
        }
        return Err(ResourceKeyError::InvalidCharacter { character: ch });
    }
    Ok(())
}
