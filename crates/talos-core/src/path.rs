//! Record and category path checks.

use crate::ValidationError;

/// Separator between categories in record paths.
pub const PATH_SEPARATOR: char = '/';

/// Validates a record path and returns it trimmed.
///
/// # Errors
/// - [`ValidationError::EmptyName`] for blank input.
/// - [`ValidationError::TrailingSeparator`] when the path names a category
///   (`Work/`) instead of a record.
/// - [`ValidationError::AbsolutePath`] / [`ValidationError::TraversalSegment`]
///   for paths escaping the store.
pub fn validate_record_path(path: &str) -> Result<&str, ValidationError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if trimmed.ends_with(PATH_SEPARATOR) {
        return Err(ValidationError::TrailingSeparator);
    }
    check_segments(trimmed)?;
    Ok(trimmed)
}

/// Validates a category path and returns it with surrounding whitespace and
/// trailing separators removed.
///
/// # Errors
/// Same as [`validate_record_path`], except that a trailing separator is
/// accepted.
pub fn validate_category_path(path: &str) -> Result<&str, ValidationError> {
    let trimmed = path.trim().trim_end_matches(PATH_SEPARATOR);
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    check_segments(trimmed)?;
    Ok(trimmed)
}

/// Returns the last path segment, used as the record display name.
pub fn record_name(path: &str) -> &str {
    path.rsplit(PATH_SEPARATOR).next().unwrap_or(path)
}

fn check_segments(path: &str) -> Result<(), ValidationError> {
    if path.starts_with(PATH_SEPARATOR) {
        return Err(ValidationError::AbsolutePath);
    }
    if path.split(PATH_SEPARATOR).any(|segment| segment == "..") {
        return Err(ValidationError::TraversalSegment);
    }
    Ok(())
}
