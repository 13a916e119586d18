//! Field validation rules shared by request bodies and patch views.
//!
//! Rules run through `validator::Validate`; this module adds the custom rules
//! and flattens `ValidationErrors` into the `{field: [messages]}` map returned
//! to clients.
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use validator::{Validate, ValidationError, ValidationErrors};

pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub const REQUIRED_MESSAGE: &str = "this field is required";
pub const FIRST_LETTER_MESSAGE: &str = "the first letter must be uppercase";

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Passes blank input; otherwise the first character must already be in its
/// uppercase form. Characters without case (digits, punctuation) pass.
pub fn first_letter_uppercase(value: &str) -> Result<(), ValidationError> {
    let Some(first) = value.trim_start().chars().next() else {
        return Ok(());
    };
    if first.to_uppercase().eq(std::iter::once(first)) {
        Ok(())
    } else {
        Err(error("first_letter_uppercase", FIRST_LETTER_MESSAGE))
    }
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(error("required", REQUIRED_MESSAGE))
    } else {
        Ok(())
    }
}

/// Required, non-blank text whose first letter is uppercase.
pub fn capitalized_text(value: &str) -> Result<(), ValidationError> {
    not_blank(value)?;
    first_letter_uppercase(value)
}

pub fn distinct_ids(ids: &[i64]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    if ids.iter().all(|id| seen.insert(*id)) {
        Ok(())
    } else {
        Err(error("distinct", "each author can only be listed once"))
    }
}

/// Flatten validator output into sorted `{field: [messages]}`.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut fields = FieldErrors::new();
    for (field, failures) in errors.field_errors() {
        let messages = failures
            .iter()
            .map(|failure| match &failure.message {
                Some(message) => message.to_string(),
                None => failure.code.to_string(),
            })
            .collect();
        fields.insert(field.to_string(), messages);
    }
    fields
}

pub fn validate_fields<T: Validate>(value: &T) -> Result<(), FieldErrors> {
    value.validate().map_err(|errors| field_errors(&errors))
}

pub fn single_field_error(field: &str, message: impl Into<String>) -> FieldErrors {
    let mut fields = FieldErrors::new();
    fields.insert(field.to_string(), vec![message.into()]);
    fields
}
