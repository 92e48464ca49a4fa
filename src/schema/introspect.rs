//! Built-in `schema()` operation
//!
//! Always-present keys: `operations`, `fields`, `presets`, `defaultFields`.
//! The remaining keys appear only when they have content, so new keys can
//! be added without changing the meaning of existing ones.

use super::Schema;
use serde_json::{Map, Value};

/// Snapshot of the registered contract.
pub fn snapshot<T>(schema: &Schema<T>) -> Value {
    let mut out = Map::new();

    out.insert("operations".into(), strings(schema.operation_names()));
    out.insert("fields".into(), strings(schema.field_names()));
    out.insert(
        "presets".into(),
        Value::Object(
            schema
                .presets
                .iter()
                .map(|(name, fields)| (name.clone(), strings(fields.iter().map(String::as_str))))
                .collect(),
        ),
    );
    out.insert(
        "defaultFields".into(),
        strings(schema.default_fields.iter().map(String::as_str)),
    );

    if schema.has_mutations() {
        out.insert("mutations".into(), strings(schema.mutation_names()));
    }

    let operation_metadata: Map<String, Value> = schema
        .operations
        .iter()
        .filter_map(|(name, entry)| Some((name.clone(), to_value(entry.metadata.as_ref()?))))
        .collect();
    if !operation_metadata.is_empty() {
        out.insert("operationMetadata".into(), Value::Object(operation_metadata));
    }

    let mutation_metadata: Map<String, Value> = schema
        .mutations
        .iter()
        .filter_map(|(name, entry)| Some((name.clone(), to_value(entry.metadata.as_ref()?))))
        .collect();
    if !mutation_metadata.is_empty() {
        out.insert("mutationMetadata".into(), Value::Object(mutation_metadata));
    }

    if !schema.filters.is_empty() {
        out.insert("filterableFields".into(), strings(schema.filterable_fields()));
    }
    if !schema.sorts.is_empty() {
        out.insert("sortableFields".into(), strings(schema.sortable_fields()));
    }

    Value::Object(out)
}

fn strings<'s>(names: impl IntoIterator<Item = &'s str>) -> Value {
    Value::Array(names.into_iter().map(|s| Value::String(s.to_string())).collect())
}

// Metadata types hold only strings, bools and JSON values.
fn to_value<M: serde::Serialize>(meta: &M) -> Value {
    serde_json::to_value(meta).unwrap_or(Value::Null)
}
