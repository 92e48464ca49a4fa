//! Equality filters and item helpers
//!
//! `key=value` arguments whose key names a filterable field become an
//! AND-ed, case-insensitive equality predicate. Everything else, positional
//! arguments and reserved keys included, is ignored.

use super::{FilterAccessor, OperationContext, Schema};
use crate::error::{Error, Result};
use crate::query::Arg;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

/// Conjunction of `accessor(item) == expected` checks.
pub struct Predicate<'a, T> {
    /// expected values are stored lowercased
    checks: Vec<(&'a FilterAccessor<T>, String)>,
}

impl<'a, T> Predicate<'a, T> {
    /// Accepts every entity.
    pub fn match_all() -> Self {
        Self { checks: Vec::new() }
    }

    pub fn is_match_all(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn matches(&self, item: &T) -> bool {
        self.checks
            .iter()
            .all(|(accessor, expected)| accessor(item).to_lowercase() == *expected)
    }
}

pub fn match_all<'a, T>() -> Predicate<'a, T> {
    Predicate::match_all()
}

pub fn build_predicate<'a, T>(
    args: &[Arg],
    filters: &'a IndexMap<String, FilterAccessor<T>>,
) -> Predicate<'a, T> {
    let checks = args
        .iter()
        .filter_map(|arg| {
            let accessor = filters.get(arg.key()?)?;
            Some((accessor, arg.value.to_lowercase()))
        })
        .collect();
    Predicate { checks }
}

pub fn filter_items<'i, T>(items: &'i [T], predicate: &Predicate<'_, T>) -> Vec<&'i T> {
    items.iter().filter(|item| predicate.matches(item)).collect()
}

pub fn count_items<T>(items: &[T], predicate: &Predicate<'_, T>) -> usize {
    items.iter().filter(|item| predicate.matches(item)).count()
}

/// Unique accessor values in first-seen order. Comparison is exact.
pub fn distinct<T, F>(items: &[T], accessor: F) -> Vec<String>
where
    F: Fn(&T) -> String,
{
    let values: IndexSet<String> = items.iter().map(accessor).collect();
    values.into_iter().collect()
}

/// Built-in `distinct(field)`.
pub(crate) fn run_distinct<T>(schema: &Schema<T>, ctx: &OperationContext<'_, T>) -> Result<Value> {
    let available = || -> Vec<Value> {
        schema
            .filterable_fields()
            .map(|name| Value::String(name.to_string()))
            .collect()
    };

    let field = ctx.statement.first_positional().ok_or_else(|| {
        Error::validation("distinct requires a field name argument: distinct(field_name)")
            .with_detail("available", available())
    })?;

    let accessor = schema.filters.get(field).ok_or_else(|| {
        Error::validation(format!("unknown filterable field: {}", field))
            .with_detail("field", field)
            .with_detail("available", available())
    })?;

    let items = ctx.items()?;
    Ok(Value::from(distinct(items, |item| accessor(item))))
}
