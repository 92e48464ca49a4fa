//! Mutation dispatch
//!
//! Mutations share the operation namespace but run through their own
//! pipeline: argument map, dry-run flag, framework validation from the
//! declared parameters, then the handler. Every outcome, failure included,
//! is wrapped in a [`MutationResult`].

use super::{LazyItems, MutationEntry, Schema};
use crate::error::{Error, ErrorCode, Result};
use crate::query::Statement;
use crate::types::{ParameterDef, DRY_RUN_KEY};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
    pub code: ErrorCode,
}

impl MutationError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
            code,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl From<&Error> for MutationError {
    fn from(e: &Error) -> Self {
        Self {
            field: e.field().map(str::to_string),
            message: e.to_string(),
            code: e.code(),
        }
    }
}

/// `{ok, result?, errors?}` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<MutationError>,
}

impl MutationResult {
    pub fn success(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            errors: Vec::new(),
        }
    }

    pub fn failure(errors: Vec<MutationError>) -> Self {
        Self {
            ok: false,
            result: None,
            errors,
        }
    }
}

/// What a mutation handler gets.
pub struct MutationContext<'a, T> {
    pub mutation: &'a str,
    pub statement: &'a Statement,
    /// Keyed arguments, last write wins. `dry_run` is never present.
    pub args: IndexMap<String, String>,
    pub dry_run: bool,
    pub(crate) items: LazyItems<'a, T>,
}

impl<'a, T> MutationContext<'a, T> {
    pub fn items(&self) -> Result<&[T]> {
        self.items.get()
    }

    /// First positional argument, typically the target ID.
    pub fn positional_arg(&self) -> Option<&str> {
        self.statement.first_positional()
    }

    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }

    /// Keyed argument or a `REQUIRED` error naming it.
    pub fn require_arg(&self, key: &str) -> Result<&str> {
        self.arg(key).ok_or_else(|| {
            Error::required(format!("required parameter {:?} is missing", key))
                .with_detail("field", key)
        })
    }

    pub fn arg_or<'s>(&'s self, key: &str, default: &'s str) -> &'s str {
        self.arg(key).unwrap_or(default)
    }
}

/// `true`, `1` and `yes`, case-insensitive.
pub fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Keyed arguments as a map, last write wins.
pub fn arg_map(statement: &Statement) -> IndexMap<String, String> {
    statement
        .keyed_args()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Effective value of each declared parameter: the keyed argument if given,
/// otherwise the next positional argument, bound in declaration order.
pub fn bind_arguments<'s>(
    args: &'s IndexMap<String, String>,
    statement: &'s Statement,
    params: &'s [ParameterDef],
) -> IndexMap<&'s str, &'s str> {
    let mut positional = statement.positional_args().map(|a| a.value.as_str());
    let mut bound = IndexMap::new();
    for param in params {
        let value = match args.get(&param.name) {
            Some(v) => Some(v.as_str()),
            None => positional.next(),
        };
        if let Some(value) = value {
            bound.insert(param.name.as_str(), value);
        }
    }
    bound
}

/// Check required and enum constraints. All violations are reported.
///
/// A positional argument can satisfy a required parameter, but only keyed
/// arguments are checked against a parameter's allowed values.
pub fn validate_mutation_args(
    args: &IndexMap<String, String>,
    statement: &Statement,
    params: &[ParameterDef],
) -> Vec<MutationError> {
    let bound = bind_arguments(args, statement, params);
    let mut errors = Vec::new();

    for param in params {
        let value = bound.get(param.name.as_str()).copied();

        if param.required && value.is_none() {
            errors.push(
                MutationError::new(
                    ErrorCode::Required,
                    format!("required parameter {:?} is missing", param.name),
                )
                .with_field(param.name.as_str()),
            );
            continue;
        }

        // Positional arguments only satisfy `required`; enums apply to keyed values.
        if let Some(value) = args.get(&param.name).map(String::as_str) {
            if !param.allowed.is_empty()
                && !param.allowed.iter().any(|a| a.eq_ignore_ascii_case(value))
            {
                errors.push(
                    MutationError::new(
                        ErrorCode::InvalidValue,
                        format!(
                            "invalid value {:?} for {}, must be one of: {}",
                            value,
                            param.name,
                            param.allowed.join(", ")
                        ),
                    )
                    .with_field(param.name.as_str()),
                );
            }
        }
    }

    errors
}

/// Run one mutation statement end to end.
pub(crate) fn execute_mutation<T>(
    schema: &Schema<T>,
    name: &str,
    entry: &MutationEntry<T>,
    statement: &Statement,
) -> MutationResult {
    let mut args = arg_map(statement);
    let dry_run = args
        .shift_remove(DRY_RUN_KEY)
        .map(|v| is_truthy(&v))
        .unwrap_or(false);

    if let Some(meta) = &entry.metadata {
        let errors = validate_mutation_args(&args, statement, &meta.parameters);
        if !errors.is_empty() {
            return MutationResult::failure(errors);
        }
    }

    let ctx = MutationContext {
        mutation: name,
        statement,
        args,
        dry_run,
        items: LazyItems::new(schema.loader.as_ref()),
    };

    match (entry.handler)(&ctx) {
        Ok(value) => MutationResult::success(value),
        Err(e) => MutationResult::failure(vec![MutationError::from(&e)]),
    }
}
