//! Query Executor
//!
//! Runs parsed statements against a [`Schema`]. Statements execute strictly
//! in source order; a failing statement yields an error outcome in its slot
//! and never aborts its siblings.

use super::ast::{Query, Statement};
use crate::error::{Error, Result};
use crate::schema::mutation::{self, MutationResult};
use crate::schema::{
    build_predicate, build_sort_function, filter, introspect, parse_sort_directives,
    LazyItems, Operation, OperationContext, OperationEntry, Schema,
};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Result of one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Value(Value),
    Mutation(MutationResult),
    Error(Error),
}

impl Outcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Outcome::Error(e) => Some(e),
            _ => None,
        }
    }

    /// JSON form: the value, the mutation envelope, or `{"error": {...}}`.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Outcome::Value(value) => value.serialize(serializer),
            Outcome::Mutation(result) => result.serialize(serializer),
            Outcome::Error(e) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", &e.to_body())?;
                map.end()
            }
        }
    }
}

/// Caller-facing shape: one statement is unwrapped, a batch is a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutput {
    Single(Outcome),
    Batch(Vec<Outcome>),
}

impl QueryOutput {
    pub fn outcomes(&self) -> &[Outcome] {
        match self {
            QueryOutput::Single(outcome) => std::slice::from_ref(outcome),
            QueryOutput::Batch(outcomes) => outcomes,
        }
    }

    pub fn into_outcomes(self) -> Vec<Outcome> {
        match self {
            QueryOutput::Single(outcome) => vec![outcome],
            QueryOutput::Batch(outcomes) => outcomes,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Query executor
pub struct QueryExecutor<'a, T> {
    schema: &'a Schema<T>,
}

impl<'a, T> QueryExecutor<'a, T> {
    pub fn new(schema: &'a Schema<T>) -> Self {
        Self { schema }
    }

    /// Execute every statement in order.
    pub fn execute(&self, query: &Query) -> QueryOutput {
        debug!(statements = query.len(), "executing query");

        let mut outcomes: Vec<Outcome> = query
            .statements
            .iter()
            .enumerate()
            .map(|(index, stmt)| {
                let outcome = self.execute_statement(stmt);
                if let Some(e) = outcome.error() {
                    warn!(index, operation = %stmt.operation, code = %e.code(), "statement failed: {}", e);
                }
                outcome
            })
            .collect();

        if outcomes.len() == 1 {
            if let Some(outcome) = outcomes.pop() {
                return QueryOutput::Single(outcome);
            }
        }
        QueryOutput::Batch(outcomes)
    }

    /// Dispatch one statement: mutations first, then read operations.
    pub fn execute_statement(&self, stmt: &Statement) -> Outcome {
        let name = stmt.operation.as_str();

        if let Some(entry) = self.schema.mutations.get(name) {
            debug!(operation = name, kind = "mutation", "dispatching statement");
            let result = mutation::execute_mutation(self.schema, name, entry, stmt);
            if !result.ok {
                warn!(operation = name, errors = result.errors.len(), "mutation rejected");
            }
            return Outcome::Mutation(result);
        }

        match self.schema.operations.get(name) {
            Some(entry) => {
                debug!(operation = name, kind = "operation", "dispatching statement");
                match self.run_operation(entry, stmt) {
                    Ok(value) => Outcome::Value(value),
                    Err(e) => Outcome::Error(e),
                }
            }
            None => Outcome::Error(
                Error::not_found(format!("unknown operation: {}", name))
                    .with_detail("operation", name),
            ),
        }
    }

    fn run_operation(&self, entry: &OperationEntry<T>, stmt: &Statement) -> Result<Value> {
        let ctx = self.context(stmt)?;
        match &entry.operation {
            Operation::Custom(handler) => handler(&ctx),
            Operation::Introspect => Ok(introspect::snapshot(self.schema)),
            Operation::Distinct => filter::run_distinct(self.schema, &ctx),
        }
    }

    fn context<'s>(&'s self, stmt: &'s Statement) -> Result<OperationContext<'s, T>> {
        let schema = self.schema;
        let selector = schema.new_selector(&stmt.fields)?;
        let predicate = build_predicate(&stmt.args, &schema.filters);
        let directives = parse_sort_directives(&stmt.args)?;
        let sort = build_sort_function(&directives, &schema.sorts)?;

        Ok(OperationContext {
            statement: stmt,
            selector,
            predicate,
            sort: (!schema.sorts.is_empty()).then_some(sort),
            items: LazyItems::new(schema.loader.as_ref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_fixtures::{sample_tasks, task_schema, Task};
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_single_statement_unwrapped() {
        let schema = task_schema(sample_tasks());
        let out = schema.query("get(task-1) { id name }").unwrap();
        assert!(matches!(out, QueryOutput::Single(_)));
        assert_eq!(
            out.to_value(),
            json!({"id": "task-1", "name": "Fix login bug"})
        );
    }

    #[test]
    fn test_batch_error_isolation() {
        let schema = task_schema(sample_tasks());
        let out = schema
            .query("get(task-1) { id }; get(missing) { id }; get(task-1) { id }")
            .unwrap();

        let outcomes = out.outcomes();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0], Outcome::Value(json!({"id": "task-1"})));
        assert_eq!(outcomes[1].error().map(Error::code), Some(ErrorCode::NotFound));
        assert_eq!(outcomes[2], outcomes[0]);

        let json = out.to_value();
        assert_eq!(json[1]["error"]["code"], "NOT_FOUND");
    }

    #[test]
    fn test_unknown_operation_without_parser_validation() {
        let schema = task_schema(sample_tasks());
        let query = crate::query::parse("nope(1)").unwrap();
        let out = QueryExecutor::new(&schema).execute(&query);
        let json = out.to_value();
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "unknown operation: nope");
        assert_eq!(json["error"]["details"]["operation"], "nope");
    }

    #[test]
    fn test_parse_error_aborts_batch() {
        let schema = task_schema(sample_tasks());
        let err = schema.query("count(); get(task-1) {").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Parse);
    }

    #[test]
    fn test_bad_sort_is_statement_error() {
        let schema = task_schema(sample_tasks());
        let out = schema
            .query("list(sort_name=asc); list(sort_id=sideways); count()")
            .unwrap();
        let outcomes = out.outcomes();
        assert_eq!(outcomes[0].error().map(Error::code), Some(ErrorCode::Validation));
        assert_eq!(outcomes[1].error().map(Error::code), Some(ErrorCode::Validation));
        assert!(!outcomes[2].is_error());
    }

    #[test]
    fn test_sort_absent_without_sortable_fields() {
        let schema = Schema::<Task>::builder()
            .field("id", |t: &Task| t.id.clone())
            .operation("probe", |ctx| Ok(json!(ctx.sort.is_some())))
            .build()
            .unwrap();
        assert_eq!(schema.query_json("probe()").unwrap(), "false");

        let schema = task_schema(sample_tasks());
        let out = schema.query("list(sort_priority=desc) { id }").unwrap();
        let ids: Vec<String> = out.to_value().as_array().unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids.first().map(String::as_str), Some("task-1"));
    }

    #[test]
    fn test_mutations_run_in_order() {
        let schema = task_schema(sample_tasks());
        let out = schema
            .query(r#"create(title="A"); create(title="B"); count()"#)
            .unwrap();
        let json = out.to_value();
        assert_eq!(json[0]["ok"], true);
        assert_eq!(json[1]["ok"], true);
        assert_eq!(json[2]["count"], sample_tasks().len() + 2);
    }

    proptest! {
        #[test]
        fn prop_batch_yields_one_outcome_per_statement(ops in proptest::collection::vec(
            prop_oneof![Just("count()"), Just("get(task-2) { id }"), Just("get(zzz)"), Just("list(take=1)")],
            1..8,
        )) {
            let schema = task_schema(sample_tasks());
            let input = ops.join("; ");
            let out = schema.query(&input).unwrap();

            prop_assert_eq!(out.outcomes().len(), ops.len());
            prop_assert_eq!(matches!(out, QueryOutput::Single(_)), ops.len() == 1);
            for (op, outcome) in ops.iter().zip(out.outcomes()) {
                prop_assert_eq!(outcome.is_error(), *op == "get(zzz)");
            }
        }
    }
}
