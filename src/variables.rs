use crate::entity::{Entity, FieldAccessible};
use crate::error::{DesignError, DesignResult};
use crate::trace::{FieldState, TraceRecord, TraceSink};
use serde_json::Value;

/// Field name of a `$alias.field` reference (`$invoice.date` -> `date`).
///
/// Only the segment between the first and second dot is taken; the alias is
/// not checked against the bound entity.
pub fn decompose_reference(reference: &str) -> DesignResult<&str> {
    let mut segments = reference.split('.');
    let _alias = segments.next();
    segments
        .next()
        .ok_or_else(|| DesignError::MalformedVariable {
            variable: reference.to_string(),
        })
}

/// Pure classification of a field; emits nothing.
pub fn classify<E: FieldAccessible + ?Sized>(entity: &E, field: &str) -> FieldState {
    match entity.get(field) {
        None | Some(Value::Null) => FieldState::Null,
        Some(value) if is_empty_value(&value) => FieldState::Empty,
        Some(_) => FieldState::Present,
    }
}

// Empty covers falsy scalars as well as zero-length strings and collections:
// `false`, `0`, `0.0`, `""`, `"0"`, `[]`, `{}`.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty() || text == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

pub fn trace_classification(
    entity: &Entity,
    field: &str,
    classification: FieldState,
    sink: &dyn TraceSink,
) {
    sink.record(&TraceRecord {
        entity_id: entity.id().to_string(),
        field: field.to_string(),
        classification,
    });
}

/// True when the field is null or empty. Every call leaves one trace record.
pub fn should_hide(entity: &Entity, field: &str, sink: &dyn TraceSink) -> bool {
    let state = classify(entity, field);
    trace_classification(entity, field, state, sink);
    state.is_hidden()
}

/// `should_hide` for a full `$alias.field` reference.
pub fn entity_variable_check(
    entity: &Entity,
    reference: &str,
    sink: &dyn TraceSink,
) -> DesignResult<bool> {
    let field = decompose_reference(reference)?;
    Ok(should_hide(entity, field, sink))
}

pub fn resolve(entity: &Entity, reference: &str) -> DesignResult<Option<Value>> {
    let field = decompose_reference(reference)?;
    Ok(entity.get(field))
}

/// `"false"` for null or empty values, `"true"` otherwise. Templates read it as
/// an attribute string, hence not a bool.
pub fn presence_attribute(value: Option<&Value>) -> &'static str {
    match value {
        Some(value) if !is_empty_value(value) => "true",
        _ => "false",
    }
}
