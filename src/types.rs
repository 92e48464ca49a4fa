//! 基础类型定义
//!
//! Positions, introspection metadata and the reserved argument vocabulary
//! shared by the parser, the registry and the dispatchers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pagination offset key.
pub const SKIP_KEY: &str = "skip";
/// Pagination limit key.
pub const TAKE_KEY: &str = "take";
/// Mutation preview flag.
pub const DRY_RUN_KEY: &str = "dry_run";
/// Prefix marking a sort directive, e.g. `sort_name=desc`.
pub const SORT_PREFIX: &str = "sort_";
/// Projection name selecting every registered field.
pub const FULL_PRESET: &str = "full";
/// Built-in introspection operation.
pub const SCHEMA_OPERATION: &str = "schema";
/// Built-in unique-values operation.
pub const DISTINCT_OPERATION: &str = "distinct";

/// Whether `name` collides with an argument key the engine interprets itself.
pub fn is_reserved_key(name: &str) -> bool {
    name == SKIP_KEY || name == TAKE_KEY || name == DRY_RUN_KEY || name.starts_with(SORT_PREFIX)
}

/// Position in the query text. `line` and `column` are 1-based; `column`
/// counts bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pos {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Pos {
    pub fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

/// One parameter accepted by an operation or mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDef {
    pub name: String,
    /// "string", "int", "bool", ...
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub required: bool,
    /// Allowed values. Empty means unconstrained.
    #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl ParameterDef {
    pub fn new(name: impl Into<String>, param_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Documentation for a read operation, surfaced by `schema()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

/// Documentation and validation contract for a mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationMetadata {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterDef>,
    #[serde(default)]
    pub destructive: bool,
    #[serde(default)]
    pub idempotent: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}
