//! Field projection

use super::{FieldAccessor, Schema};
use crate::error::{Error, Result};
use crate::types::FULL_PRESET;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// One projected entity: field name to display value, in field
/// registration order.
pub type Record = Map<String, Value>;

/// Resolved inclusion set for one statement.
pub struct FieldSelector<'a, T> {
    /// Selected fields in registration order.
    selected: Vec<(&'a str, &'a FieldAccessor<T>)>,
}

impl<'a, T> FieldSelector<'a, T> {
    /// Project one entity. Only accessors of selected fields run, each once.
    pub fn apply(&self, item: &T) -> Record {
        let mut record = Record::new();
        for (name, accessor) in &self.selected {
            record.insert((*name).to_string(), accessor(item));
        }
        record
    }

    pub fn include(&self, field: &str) -> bool {
        self.selected.iter().any(|(name, _)| *name == field)
    }

    pub fn fields(&self) -> Vec<&'a str> {
        self.selected.iter().map(|(name, _)| *name).collect()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

impl<T> Schema<T> {
    /// Resolve a projection list. An empty list falls back to the default
    /// fields, then to every field. Presets expand here; `full` selects
    /// every field.
    pub fn new_selector(&self, requested: &[String]) -> Result<FieldSelector<'_, T>> {
        let requested = if requested.is_empty() {
            self.default_fields.as_slice()
        } else {
            requested
        };

        let mut wanted: HashSet<&str> = HashSet::new();
        let mut all = requested.is_empty();

        for name in requested {
            if name == FULL_PRESET {
                all = true;
            } else if let Some(fields) = self.presets.get(name) {
                wanted.extend(fields.iter().map(String::as_str));
            } else if self.fields.contains_key(name) {
                wanted.insert(name.as_str());
            } else {
                return Err(Error::validation(format!("unknown field: {}", name))
                    .with_detail("field", name.as_str()));
            }
        }

        let selected = self
            .fields
            .iter()
            .filter(|(name, _)| all || wanted.contains(name.as_str()))
            .map(|(name, accessor)| (name.as_str(), accessor))
            .collect();

        Ok(FieldSelector { selected })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_fixtures::{sample_tasks, task_schema, Task};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_fields_used_when_empty() {
        let schema = task_schema(sample_tasks());
        let selector = schema.new_selector(&[]).unwrap();
        assert_eq!(selector.fields(), vec!["id", "name", "status"]);
    }

    #[test]
    fn test_all_fields_without_defaults() {
        let schema = Schema::<Task>::builder()
            .field("id", |t: &Task| t.id.clone())
            .field("name", |t: &Task| t.name.clone())
            .build()
            .unwrap();
        assert_eq!(schema.new_selector(&[]).unwrap().fields(), vec!["id", "name"]);
    }

    #[test]
    fn test_registration_order_not_request_order() {
        let schema = task_schema(sample_tasks());
        let selector = schema.new_selector(&names(&["status", "id"])).unwrap();
        assert_eq!(selector.fields(), vec!["id", "status"]);

        let record = selector.apply(&sample_tasks()[0]);
        let keys: Vec<&String> = record.keys().collect();
        assert_eq!(keys, vec!["id", "status"]);
    }

    #[test]
    fn test_preset_expansion() {
        let schema = task_schema(sample_tasks());
        let selector = schema.new_selector(&names(&["overview", "id"])).unwrap();
        assert_eq!(
            selector.fields(),
            vec!["id", "name", "status", "assignee", "priority"]
        );
        assert!(selector.include("assignee"));
        assert!(!selector.include("description"));
    }

    #[test]
    fn test_full_selects_everything() {
        let schema = task_schema(sample_tasks());
        let selector = schema.new_selector(&names(&["full"])).unwrap();
        assert_eq!(selector.len(), schema.field_names().count());
    }

    #[test]
    fn test_unknown_field() {
        let schema = task_schema(sample_tasks());
        let err = schema.new_selector(&names(&["id", "bogus"])).err().unwrap();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert_eq!(err.field(), Some("bogus"));
    }

    #[test]
    fn test_excluded_accessors_never_run() {
        let name_calls = Arc::new(AtomicUsize::new(0));
        let description_calls = Arc::new(AtomicUsize::new(0));
        let (n, d) = (name_calls.clone(), description_calls.clone());

        let schema = Schema::<Task>::builder()
            .field("id", |t: &Task| t.id.clone())
            .field("name", move |t: &Task| {
                n.fetch_add(1, Ordering::SeqCst);
                t.name.clone()
            })
            .field("description", move |t: &Task| {
                d.fetch_add(1, Ordering::SeqCst);
                t.description.clone()
            })
            .preset("minimal", ["id", "name"])
            .build()
            .unwrap();

        let selector = schema.new_selector(&names(&["minimal"])).unwrap();
        let tasks = sample_tasks();
        for task in &tasks {
            let record = selector.apply(task);
            assert_eq!(record.len(), 2);
        }

        assert_eq!(name_calls.load(Ordering::SeqCst), tasks.len());
        assert_eq!(description_calls.load(Ordering::SeqCst), 0);
    }
}
