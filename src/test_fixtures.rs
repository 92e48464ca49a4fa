//! Shared task-tracker schema for unit tests.

use crate::error::{Error, Result};
use crate::schema::{count_items, Schema};
use crate::types::{MutationMetadata, ParameterDef};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub status: String,
    pub assignee: String,
    pub priority: u32,
    pub description: String,
}

fn task(id: &str, name: &str, status: &str, assignee: &str, priority: u32) -> Task {
    Task {
        id: id.to_string(),
        name: name.to_string(),
        status: status.to_string(),
        assignee: assignee.to_string(),
        priority,
        description: format!("{}\nsee tracker", name),
    }
}

pub fn sample_tasks() -> Vec<Task> {
    vec![
        task("task-1", "Fix login bug", "todo", "alice", 3),
        task("task-2", "Write docs", "in-progress", "bob", 2),
        task("task-3", "Release v1", "done", "alice", 1),
        task("task-4", "Triage inbox", "todo", "bob", 2),
        task("task-5", "Refactor parser", "todo", "carol", 1),
    ]
}

pub fn task_schema(tasks: Vec<Task>) -> Schema<Task> {
    TaskStore::new(tasks).schema()
}

fn task_json(t: &Task) -> Value {
    json!({
        "id": t.id,
        "name": t.name,
        "status": t.status,
        "assignee": t.assignee,
        "priority": t.priority,
    })
}

fn require_id<'s>(id: Option<&'s str>) -> Result<&'s str> {
    id.ok_or_else(|| Error::validation("missing task id").with_detail("field", "id"))
}

/// In-memory store whose schema reloads on every statement.
#[derive(Clone)]
pub struct TaskStore {
    tasks: Arc<Mutex<Vec<Task>>>,
}

impl TaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(tasks)),
        }
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    pub fn schema(&self) -> Schema<Task> {
        let loader = self.tasks.clone();
        let create_store = self.tasks.clone();
        let update_store = self.tasks.clone();
        let delete_store = self.tasks.clone();

        Schema::<Task>::builder()
            .field("id", |t: &Task| t.id.clone())
            .field("name", |t: &Task| t.name.clone())
            .field("status", |t: &Task| t.status.clone())
            .field("assignee", |t: &Task| t.assignee.clone())
            .field("priority", |t: &Task| t.priority)
            .field("description", |t: &Task| t.description.clone())
            .preset("minimal", ["id", "name"])
            .preset("default", ["id", "name", "status"])
            .preset("overview", ["id", "name", "status", "assignee", "priority"])
            .default_fields(["default"])
            .filterable_field("status", |t: &Task| t.status.clone())
            .filterable_field("assignee", |t: &Task| t.assignee.clone())
            .filterable_field("priority", |t: &Task| t.priority.to_string())
            .sortable_field("id", |t: &Task| t.id.clone())
            .sortable_field("priority", |t: &Task| t.priority)
            .loader(move || Ok(loader.lock().clone()))
            .operation("get", |ctx| {
                let id = require_id(ctx.statement.first_positional())?;
                ctx.items()?
                    .iter()
                    .find(|t| t.id == id)
                    .map(|t| Value::Object(ctx.project(t)))
                    .ok_or_else(|| {
                        Error::not_found(format!("task not found: {}", id)).with_detail("id", id)
                    })
            })
            .operation("list", |ctx| Ok(Value::from(ctx.page()?)))
            .operation("count", |ctx| {
                Ok(json!({ "count": count_items(ctx.items()?, &ctx.predicate) }))
            })
            .mutation_with_metadata(
                "create",
                move |ctx| {
                    let mut tasks = create_store.lock();
                    let next = tasks.len() + 1;
                    let title = ctx.arg("title").or(ctx.positional_arg()).unwrap_or_default();
                    let new_task = Task {
                        id: format!("task-{}", next),
                        name: title.to_string(),
                        status: ctx.arg_or("status", "todo").to_lowercase(),
                        assignee: ctx.arg_or("assignee", "").to_string(),
                        priority: 1,
                        description: String::new(),
                    };
                    let out = task_json(&new_task);
                    if !ctx.dry_run {
                        tasks.push(new_task);
                    }
                    Ok(out)
                },
                MutationMetadata {
                    description: "Create a task".to_string(),
                    parameters: vec![
                        ParameterDef::new("title", "string").required(),
                        ParameterDef::new("status", "string").one_of(["todo", "in-progress", "done"]),
                        ParameterDef::new("assignee", "string"),
                    ],
                    ..Default::default()
                },
            )
            .mutation_with_metadata(
                "update",
                move |ctx| {
                    let id = require_id(ctx.positional_arg())?;
                    let mut tasks = update_store.lock();
                    let current = tasks
                        .iter_mut()
                        .find(|t| t.id == id)
                        .ok_or_else(|| Error::not_found(format!("task not found: {}", id)))?;
                    let mut updated = current.clone();
                    if let Some(title) = ctx.arg("title") {
                        updated.name = title.to_string();
                    }
                    if let Some(status) = ctx.arg("status") {
                        updated.status = status.to_lowercase();
                    }
                    let out = task_json(&updated);
                    if !ctx.dry_run {
                        *current = updated;
                    }
                    Ok(out)
                },
                MutationMetadata {
                    description: "Update a task".to_string(),
                    parameters: vec![
                        ParameterDef::new("id", "string").required(),
                        ParameterDef::new("title", "string"),
                        ParameterDef::new("status", "string").one_of(["todo", "in-progress", "done"]),
                    ],
                    idempotent: true,
                    ..Default::default()
                },
            )
            .mutation_with_metadata(
                "delete",
                move |ctx| {
                    let id = require_id(ctx.positional_arg())?;
                    let mut tasks = delete_store.lock();
                    let index = tasks
                        .iter()
                        .position(|t| t.id == id)
                        .ok_or_else(|| Error::not_found(format!("task not found: {}", id)))?;
                    if !ctx.dry_run {
                        tasks.remove(index);
                    }
                    Ok(json!({ "deleted": id }))
                },
                MutationMetadata {
                    description: "Delete a task".to_string(),
                    parameters: vec![ParameterDef::new("id", "string").required()],
                    destructive: true,
                    idempotent: true,
                    ..Default::default()
                },
            )
            .build()
            .expect("fixture schema is valid")
    }
}
