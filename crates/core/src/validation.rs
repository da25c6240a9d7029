//! Field validation helpers shared by the request DTOs.

use std::sync::LazyLock;

use regex::Regex;
use validator::ValidationErrors;

use crate::error::{CoreError, CoreResult};

/// Longest collection id the vision service accepts.
pub const MAX_COLLECTION_ID_LENGTH: usize = 255;

/// Characters the vision service accepts in a collection id.
pub const COLLECTION_ID_PATTERN: &str = r"^[a-zA-Z0-9_.\-]+$";

static COLLECTION_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(COLLECTION_ID_PATTERN).expect("valid regex"));

/// Validate a face collection id before it reaches the vision service.
pub fn validate_collection_id(collection_id: &str) -> CoreResult<()> {
    if collection_id.len() > MAX_COLLECTION_ID_LENGTH {
        return Err(CoreError::Validation(format!(
            "collectionId exceeds maximum length of {MAX_COLLECTION_ID_LENGTH} characters (got {})",
            collection_id.len()
        )));
    }
    if !COLLECTION_ID_RE.is_match(collection_id) {
        return Err(CoreError::Validation(format!(
            "collectionId '{collection_id}' may only contain letters, digits, '_', '.' and '-'"
        )));
    }
    Ok(())
}

/// Unwrap a field that `validate()` has already checked for presence.
pub fn required<'a>(value: &'a Option<String>, field: &str) -> CoreResult<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| CoreError::Validation(format!("{field} is required")))
}

/// Flatten `validator` errors into one stable, human-readable message.
///
/// Field errors are sorted by field name; each uses its configured message
/// when present.
pub fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}
