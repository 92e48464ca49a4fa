//! Schema Registry
//!
//! A [`Schema`] describes one query-able domain over an entity type `T`:
//! field accessors, presets, default projection, read operations, mutations,
//! filterable and sortable fields, and the entity loader.
//!
//! Registration happens on a [`SchemaBuilder`]; [`SchemaBuilder::build`]
//! validates the registration and freezes it. A built schema is read-only
//! and can be shared across threads.

pub mod context;
pub mod filter;
pub mod introspect;
pub mod mutation;
pub mod paginate;
pub mod selector;
pub mod sort;

pub use context::{LazyItems, OperationContext};
pub use filter::{build_predicate, count_items, distinct, filter_items, match_all, Predicate};
pub use mutation::{MutationContext, MutationError, MutationResult};
pub use paginate::{paginate, parse_skip_take, Page};
pub use selector::{FieldSelector, Record};
pub use sort::{
    build_sort_function, parse_sort_directives, sort_slice, SortDirection, SortDirective,
    SortFunction,
};

use crate::config::SchemaConfig;
use crate::error::{Error, Result};
use crate::format::{self, OutputMode};
use crate::query::{self, ParserConfig, Query, QueryExecutor, QueryOutput};
use crate::query::{FieldResolver, OperationResolver};
use crate::search::{self, SearchOptions, SearchResult};
use crate::types::{
    is_reserved_key, OperationMetadata, MutationMetadata, ParameterDef, DISTINCT_OPERATION,
    FULL_PRESET, SCHEMA_OPERATION,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::cmp::Ordering;
use tracing::debug;

/// Projects one display value out of an entity.
pub type FieldAccessor<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;
/// Produces the string compared by equality filters.
pub type FilterAccessor<T> = Box<dyn Fn(&T) -> String + Send + Sync>;
/// Natural ascending order for one sortable field.
pub type SortComparator<T> = Box<dyn Fn(&T, &T) -> Ordering + Send + Sync>;
pub type OperationHandler<T> =
    Box<dyn Fn(&OperationContext<'_, T>) -> Result<Value> + Send + Sync>;
pub type MutationHandler<T> = Box<dyn Fn(&MutationContext<'_, T>) -> Result<Value> + Send + Sync>;
/// Supplies the current entity set. Invoked at most once per statement.
pub type Loader<T> = Box<dyn Fn() -> Result<Vec<T>> + Send + Sync>;

/// Behavior behind a read-operation name.
pub enum Operation<T> {
    Custom(OperationHandler<T>),
    /// built-in `schema()`
    Introspect,
    /// built-in `distinct(field)`
    Distinct,
}

pub struct OperationEntry<T> {
    pub operation: Operation<T>,
    pub metadata: Option<OperationMetadata>,
}

pub struct MutationEntry<T> {
    pub handler: MutationHandler<T>,
    pub metadata: Option<MutationMetadata>,
}

/// Mutable registration phase of a [`Schema`].
pub struct SchemaBuilder<T> {
    fields: IndexMap<String, FieldAccessor<T>>,
    presets: IndexMap<String, Vec<String>>,
    default_fields: Vec<String>,
    operations: IndexMap<String, OperationEntry<T>>,
    mutations: IndexMap<String, MutationEntry<T>>,
    filters: IndexMap<String, FilterAccessor<T>>,
    sorts: IndexMap<String, SortComparator<T>>,
    loader: Option<Loader<T>>,
    config: SchemaConfig,
}

impl<T> Default for SchemaBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SchemaBuilder<T> {
    pub fn new() -> Self {
        Self {
            fields: IndexMap::new(),
            presets: IndexMap::new(),
            default_fields: Vec::new(),
            operations: IndexMap::new(),
            mutations: IndexMap::new(),
            filters: IndexMap::new(),
            sorts: IndexMap::new(),
            loader: None,
            config: SchemaConfig::default(),
        }
    }

    /// Register a projected field. Re-registering a name replaces the
    /// accessor and keeps its original position.
    pub fn field<F, V>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.fields
            .insert(name.into(), Box::new(move |item| accessor(item).into()));
        self
    }

    /// Named bundle of fields, usable wherever a field name is.
    pub fn preset<I, S>(mut self, name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.presets
            .insert(name.into(), fields.into_iter().map(Into::into).collect());
        self
    }

    /// Projection used when a statement has no `{ ... }` block. Entries may
    /// be fields, presets or `full`.
    pub fn default_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn operation<F>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&OperationContext<'_, T>) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert_operation(name.into(), Operation::Custom(Box::new(handler)), None)
    }

    pub fn operation_with_metadata<F>(
        self,
        name: impl Into<String>,
        handler: F,
        metadata: OperationMetadata,
    ) -> Self
    where
        F: Fn(&OperationContext<'_, T>) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert_operation(
            name.into(),
            Operation::Custom(Box::new(handler)),
            Some(metadata),
        )
    }

    fn insert_operation(
        mut self,
        name: String,
        operation: Operation<T>,
        metadata: Option<OperationMetadata>,
    ) -> Self {
        self.operations.insert(
            name,
            OperationEntry {
                operation,
                metadata,
            },
        );
        self
    }

    pub fn mutation<F>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&MutationContext<'_, T>) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert_mutation(name.into(), Box::new(handler), None)
    }

    /// Register a mutation whose declared parameters are validated before
    /// the handler runs.
    pub fn mutation_with_metadata<F>(
        self,
        name: impl Into<String>,
        handler: F,
        metadata: MutationMetadata,
    ) -> Self
    where
        F: Fn(&MutationContext<'_, T>) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert_mutation(name.into(), Box::new(handler), Some(metadata))
    }

    fn insert_mutation(
        mut self,
        name: String,
        handler: MutationHandler<T>,
        metadata: Option<MutationMetadata>,
    ) -> Self {
        self.mutations
            .insert(name, MutationEntry { handler, metadata });
        self
    }

    /// Field usable as `name=value` equality filter (case-insensitive).
    pub fn filterable_field<F>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Box::new(accessor));
        self
    }

    /// Field usable as `sort_<name>=asc|desc`, ordered by its key.
    pub fn sortable_field<F, K>(self, name: impl Into<String>, key: F) -> Self
    where
        F: Fn(&T) -> K + Send + Sync + 'static,
        K: Ord,
    {
        self.sortable_field_by(name, move |a, b| key(a).cmp(&key(b)))
    }

    /// Sortable field with a custom comparator, e.g. an enum rank.
    pub fn sortable_field_by<F>(mut self, name: impl Into<String>, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.sorts.insert(name.into(), Box::new(compare));
        self
    }

    pub fn loader<F>(mut self, loader: F) -> Self
    where
        F: Fn() -> Result<Vec<T>> + Send + Sync + 'static,
    {
        self.loader = Some(Box::new(loader));
        self
    }

    pub fn config(mut self, config: SchemaConfig) -> Self {
        self.config = config;
        self
    }

    pub fn without_introspection(mut self) -> Self {
        self.config.introspection = false;
        self
    }

    /// Validate the registration and freeze it.
    pub fn build(mut self) -> Result<Schema<T>> {
        if self.config.introspection && !self.operations.contains_key(SCHEMA_OPERATION) {
            self = self.insert_operation(SCHEMA_OPERATION.to_string(), Operation::Introspect, None);
        }
        if !self.filters.is_empty() && !self.operations.contains_key(DISTINCT_OPERATION) {
            self = self.insert_operation(
                DISTINCT_OPERATION.to_string(),
                Operation::Distinct,
                Some(distinct_metadata()),
            );
        }

        // 内置操作先安装，与同名变更的冲突由 validate 报告
        self.validate()?;

        debug!(
            fields = self.fields.len(),
            operations = self.operations.len(),
            mutations = self.mutations.len(),
            filters = self.filters.len(),
            sorts = self.sorts.len(),
            "schema built"
        );

        Ok(Schema {
            fields: self.fields,
            presets: self.presets,
            default_fields: self.default_fields,
            operations: self.operations,
            mutations: self.mutations,
            filters: self.filters,
            sorts: self.sorts,
            loader: self.loader,
            config: self.config,
        })
    }

    fn validate(&self) -> Result<()> {
        if let Some(name) = self
            .mutations
            .keys()
            .find(|name| self.operations.contains_key(*name))
        {
            return Err(Error::config(format!(
                "{:?} is registered as both an operation and a mutation",
                name
            )));
        }

        if let Some(name) = self.filters.keys().find(|name| is_reserved_key(name)) {
            return Err(Error::config(format!(
                "filterable field {:?} uses a reserved argument name",
                name
            )));
        }

        for (mutation, entry) in &self.mutations {
            let reserved = entry
                .metadata
                .iter()
                .flat_map(|m| m.parameters.iter())
                .find(|p| is_reserved_key(&p.name));
            if let Some(param) = reserved {
                return Err(Error::config(format!(
                    "mutation {:?} declares parameter {:?}, which is a reserved argument name",
                    mutation, param.name
                )));
            }
        }

        for (preset, fields) in &self.presets {
            if let Some(missing) = fields.iter().find(|f| !self.fields.contains_key(*f)) {
                return Err(Error::config(format!(
                    "preset {:?} references unknown field {:?}",
                    preset, missing
                )));
            }
        }

        if let Some(unknown) = self.default_fields.iter().find(|name| {
            name.as_str() != FULL_PRESET
                && !self.fields.contains_key(*name)
                && !self.presets.contains_key(*name)
        }) {
            return Err(Error::config(format!(
                "default field {:?} is neither a field nor a preset",
                unknown
            )));
        }

        Ok(())
    }
}

fn distinct_metadata() -> OperationMetadata {
    OperationMetadata {
        description: "Returns unique values for a filterable field.".to_string(),
        parameters: vec![ParameterDef::new("field", "string")
            .required()
            .describe("Name of a registered filterable field.")],
        examples: vec!["distinct(status)".to_string()],
    }
}

/// Frozen registry. Entry point for parsing and executing queries.
pub struct Schema<T> {
    pub(crate) fields: IndexMap<String, FieldAccessor<T>>,
    pub(crate) presets: IndexMap<String, Vec<String>>,
    pub(crate) default_fields: Vec<String>,
    pub(crate) operations: IndexMap<String, OperationEntry<T>>,
    pub(crate) mutations: IndexMap<String, MutationEntry<T>>,
    pub(crate) filters: IndexMap<String, FilterAccessor<T>>,
    pub(crate) sorts: IndexMap<String, SortComparator<T>>,
    pub(crate) loader: Option<Loader<T>>,
    pub(crate) config: SchemaConfig,
}

impl<T> Schema<T> {
    pub fn builder() -> SchemaBuilder<T> {
        SchemaBuilder::new()
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    /// Field names in registration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn presets(&self) -> &IndexMap<String, Vec<String>> {
        &self.presets
    }

    pub fn default_fields(&self) -> &[String] {
        &self.default_fields
    }

    /// Read operation names, sorted.
    pub fn operation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Mutation names, sorted.
    pub fn mutation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.mutations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn has_mutations(&self) -> bool {
        !self.mutations.is_empty()
    }

    pub fn is_mutation(&self, name: &str) -> bool {
        self.mutations.contains_key(name)
    }

    /// False for unknown mutations and mutations without metadata.
    pub fn is_mutation_destructive(&self, name: &str) -> bool {
        self.mutations
            .get(name)
            .and_then(|entry| entry.metadata.as_ref())
            .map(|meta| meta.destructive)
            .unwrap_or(false)
    }

    pub fn filterable_fields(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    pub fn sortable_fields(&self) -> impl Iterator<Item = &str> {
        self.sorts.keys().map(String::as_str)
    }

    /// Parser hooks validating names against this schema.
    pub fn parser_config(&self) -> ParserConfig<'_> {
        ParserConfig::permissive()
            .with_operations(self)
            .with_fields(self)
    }

    pub fn parse(&self, input: &str) -> Result<Query> {
        Ok(query::parse_with(input, self.parser_config())?)
    }

    /// Parse and execute. Only parse errors fail the call; execution errors
    /// are captured per statement in the output.
    pub fn query(&self, input: &str) -> Result<QueryOutput> {
        let query = self.parse(input)?;
        Ok(QueryExecutor::new(self).execute(&query))
    }

    pub fn query_json(&self, input: &str) -> Result<String> {
        Ok(serde_json::to_string(&self.query(input)?)?)
    }

    pub fn query_with_mode(&self, input: &str, mode: OutputMode) -> Result<String> {
        format::format_output(&self.query(input)?, mode)
    }

    /// Full-text search below the configured data directory.
    pub fn search(&self, pattern: &str, opts: &SearchOptions) -> Result<Vec<SearchResult>> {
        let root = self
            .config
            .data_dir
            .as_deref()
            .ok_or_else(|| Error::validation("no data directory configured for search"))?;
        search::search(root, pattern, &self.config.extensions, opts)
    }
}

impl<T> OperationResolver for Schema<T> {
    fn has_operation(&self, name: &str) -> bool {
        self.operations.contains_key(name) || self.mutations.contains_key(name)
    }
}

impl<T> FieldResolver for Schema<T> {
    fn has_field(&self, name: &str) -> bool {
        name == FULL_PRESET || self.fields.contains_key(name) || self.presets.contains_key(name)
    }
}
