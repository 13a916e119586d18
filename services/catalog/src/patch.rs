//! JSON Patch applicator over typed views.
//!
//! # Purpose
//! Applies an RFC 6902 style operation list to a patchable view of an entity
//! and re-runs the view's full validation, so a patch can never persist a
//! state that a create or full update would have refused.
//!
//! # Key invariants
//! - Paths address top-level fields of the view only (`/names`). Anything
//!   else is rejected, so a patch cannot reach fields the view does not expose.
//! - Operations apply in order against a working copy; the caller's view is
//!   never mutated and nothing is persisted here.
//! - On validation failure every failing field is reported, not just the
//!   first one.
use crate::validation::{FieldErrors, single_field_error, validate_fields};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::Validate;

pub const DOCUMENT_FIELD: &str = "document";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add {
        path: String,
        #[schema(value_type = Object)]
        value: Value,
    },
    Remove {
        path: String,
    },
    Replace {
        path: String,
        #[schema(value_type = Object)]
        value: Value,
    },
    Test {
        path: String,
        #[schema(value_type = Object)]
        value: Value,
    },
    Copy {
        from: String,
        path: String,
    },
    Move {
        from: String,
        path: String,
    },
}

/// Apply `operations` to a copy of `view` and validate the outcome.
///
/// # Errors
/// Returns `{field: [messages]}` when a path is invalid, a `test` operation
/// fails, the patched document no longer fits the view's types, or any
/// validation rule fails.
pub fn apply_patch<V>(view: &V, operations: &[PatchOperation]) -> Result<V, FieldErrors>
where
    V: Serialize + DeserializeOwned + Validate,
{
    let mut document = match serde_json::to_value(view) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            return Err(single_field_error(
                DOCUMENT_FIELD,
                "resource cannot be patched",
            ));
        }
    };

    for operation in operations {
        apply_operation(&mut document, operation)?;
    }

    let patched: V = serde_json::from_value(Value::Object(document))
        .map_err(|err| single_field_error(DOCUMENT_FIELD, err.to_string()))?;
    validate_fields(&patched)?;
    Ok(patched)
}

fn apply_operation(
    document: &mut Map<String, Value>,
    operation: &PatchOperation,
) -> Result<(), FieldErrors> {
    match operation {
        PatchOperation::Add { path, value } | PatchOperation::Replace { path, value } => {
            let field = resolve(document, path)?;
            document.insert(field, value.clone());
        }
        PatchOperation::Remove { path } => {
            // View fields are fixed; removing one clears it.
            let field = resolve(document, path)?;
            document.insert(field, Value::Null);
        }
        PatchOperation::Test { path, value } => {
            let field = resolve(document, path)?;
            if document.get(&field) != Some(value) {
                return Err(single_field_error(&field, "test operation failed"));
            }
        }
        PatchOperation::Copy { from, path } => {
            let source = resolve(document, from)?;
            let target = resolve(document, path)?;
            let value = document.get(&source).cloned().unwrap_or(Value::Null);
            document.insert(target, value);
        }
        PatchOperation::Move { from, path } => {
            let source = resolve(document, from)?;
            let target = resolve(document, path)?;
            let value = document.insert(source, Value::Null).unwrap_or(Value::Null);
            document.insert(target, value);
        }
    }
    Ok(())
}

/// Map a JSON pointer onto an existing top-level field name.
fn resolve(document: &Map<String, Value>, path: &str) -> Result<String, FieldErrors> {
    let invalid = || single_field_error(path, "path does not address a patchable field");
    let segment = path.strip_prefix('/').ok_or_else(invalid)?;
    if segment.is_empty() || segment.contains('/') {
        return Err(invalid());
    }
    let field = segment.replace("~1", "/").replace("~0", "~");
    if document.contains_key(&field) {
        Ok(field)
    } else {
        Err(invalid())
    }
}
