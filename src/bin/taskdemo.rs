//! agentquery 任务追踪示例
//!
//! 基于内存任务表演示 Schema 注册、查询、变更与全文搜索

use agentquery::cli::{run_command, Command};
use agentquery::schema::count_items;
use agentquery::{
    Error, MutationContext, MutationMetadata, OperationMetadata, ParameterDef, Schema, SchemaConfig,
};
use anyhow::Context;
use clap::Parser;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

const STATUSES: [&str; 3] = ["todo", "in-progress", "done"];

#[derive(Parser, Debug)]
#[command(name = "taskdemo")]
#[command(about = "agentquery 任务追踪示例")]
struct Args {
    /// JSON 任务文件（缺省使用内置样例）
    #[arg(short, long)]
    tasks: Option<PathBuf>,

    /// Schema 配置文件（JSON）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 搜索根目录，覆盖配置文件
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Task {
    id: String,
    title: String,
    status: String,
    #[serde(default)]
    assignee: String,
    #[serde(default)]
    priority: u32,
    #[serde(default)]
    description: String,
}

fn sample_tasks() -> Vec<Task> {
    let task = |id: &str, title: &str, status: &str, assignee: &str, priority: u32| Task {
        id: id.to_string(),
        title: title.to_string(),
        status: status.to_string(),
        assignee: assignee.to_string(),
        priority,
        description: String::new(),
    };
    vec![
        task("task-1", "Set up CI", "done", "alice", 2),
        task("task-2", "Write parser", "in-progress", "bob", 3),
        task("task-3", "Design schema", "todo", "alice", 3),
        task("task-4", "Document DSL", "todo", "carol", 1),
        task("task-5", "Benchmark queries", "todo", "bob", 2),
    ]
}

fn status_rank(status: &str) -> usize {
    STATUSES
        .iter()
        .position(|s| s.eq_ignore_ascii_case(status))
        .unwrap_or(STATUSES.len())
}

fn not_found(id: &str) -> Error {
    Error::not_found(format!("task not found: {}", id)).with_detail("id", id)
}

fn missing_id() -> Error {
    Error::validation("missing task id").with_detail("field", "id")
}

/// `id=...` or the first positional argument.
fn target_id<'c>(ctx: &'c MutationContext<'_, Task>) -> agentquery::Result<&'c str> {
    ctx.arg("id")
        .or_else(|| ctx.positional_arg())
        .ok_or_else(missing_id)
}

fn build_schema(store: Arc<Mutex<Vec<Task>>>, config: SchemaConfig) -> agentquery::Result<Schema<Task>> {
    let loader = store.clone();
    let create_store = store.clone();
    let update_store = store.clone();
    let delete_store = store;

    Schema::<Task>::builder()
        .config(config)
        .field("id", |t: &Task| t.id.clone())
        .field("title", |t: &Task| t.title.clone())
        .field("status", |t: &Task| t.status.clone())
        .field("assignee", |t: &Task| t.assignee.clone())
        .field("priority", |t: &Task| t.priority)
        .field("description", |t: &Task| t.description.clone())
        .preset("minimal", ["id", "title"])
        .preset("default", ["id", "title", "status"])
        .preset("overview", ["id", "title", "status", "assignee", "priority"])
        .default_fields(["default"])
        .filterable_field("status", |t: &Task| t.status.clone())
        .filterable_field("assignee", |t: &Task| t.assignee.clone())
        .filterable_field("priority", |t: &Task| t.priority.to_string())
        .sortable_field("id", |t: &Task| t.id.clone())
        .sortable_field("priority", |t: &Task| t.priority)
        .sortable_field_by("status", |a: &Task, b: &Task| {
            status_rank(&a.status).cmp(&status_rank(&b.status))
        })
        .loader(move || Ok(loader.lock().clone()))
        .operation_with_metadata(
            "get",
            |ctx| {
                let id = ctx.statement.first_positional().ok_or_else(missing_id)?;
                ctx.items()?
                    .iter()
                    .find(|t| t.id == id)
                    .map(|t| Value::Object(ctx.project(t)))
                    .ok_or_else(|| not_found(id))
            },
            OperationMetadata {
                description: "Fetch one task by ID".to_string(),
                parameters: vec![ParameterDef::new("id", "string").required()],
                examples: vec!["get(task-1) { overview }".to_string()],
            },
        )
        .operation_with_metadata(
            "list",
            |ctx| Ok(Value::from(ctx.page()?)),
            OperationMetadata {
                description: "List tasks with filters, sorting and pagination".to_string(),
                parameters: vec![
                    ParameterDef::new("skip", "int").default_value(0),
                    ParameterDef::new("take", "int"),
                ],
                examples: vec!["list(status=todo, sort_priority=desc, take=3) { minimal }".to_string()],
            },
        )
        .operation("count", |ctx| {
            Ok(json!({ "count": count_items(ctx.items()?, &ctx.predicate) }))
        })
        .operation("summary", |ctx| {
            let tasks = ctx.filtered()?;
            let mut by_status: IndexMap<&str, usize> =
                STATUSES.iter().map(|s| (*s, 0)).collect();
            for task in &tasks {
                *by_status.entry(task.status.as_str()).or_insert(0) += 1;
            }
            Ok(json!({ "total": tasks.len(), "byStatus": by_status }))
        })
        .mutation_with_metadata(
            "create",
            move |ctx| {
                let mut tasks = create_store.lock();
                let title = match ctx.arg("title").or_else(|| ctx.positional_arg()) {
                    Some(title) => title,
                    None => ctx.require_arg("title")?,
                };
                let next = tasks
                    .iter()
                    .filter_map(|t| t.id.strip_prefix("task-")?.parse::<usize>().ok())
                    .max()
                    .unwrap_or(0)
                    + 1;
                let task = Task {
                    id: format!("task-{}", next),
                    title: title.to_string(),
                    status: ctx.arg_or("status", "todo").to_lowercase(),
                    assignee: ctx.arg_or("assignee", "").to_string(),
                    priority: ctx
                        .arg("priority")
                        .map(|p| {
                            p.parse::<u32>().map_err(|_| {
                                Error::invalid_value(format!("priority must be an integer, got {:?}", p))
                                    .with_detail("field", "priority")
                            })
                        })
                        .transpose()?
                        .unwrap_or(1),
                    description: ctx.arg_or("description", "").to_string(),
                };
                let out = serde_json::to_value(&task)?;
                if !ctx.dry_run {
                    tasks.push(task);
                }
                Ok(out)
            },
            MutationMetadata {
                description: "Create a task".to_string(),
                parameters: vec![
                    ParameterDef::new("title", "string").required(),
                    ParameterDef::new("status", "string")
                        .one_of(STATUSES)
                        .default_value("todo"),
                    ParameterDef::new("assignee", "string"),
                    ParameterDef::new("priority", "int").default_value(1),
                    ParameterDef::new("description", "string"),
                ],
                examples: vec!["create(title=\"Write docs\", assignee=bob)".to_string()],
                ..Default::default()
            },
        )
        .mutation_with_metadata(
            "update",
            move |ctx| {
                let id = target_id(ctx)?;
                let mut tasks = update_store.lock();
                let current = tasks
                    .iter_mut()
                    .find(|t| t.id == id)
                    .ok_or_else(|| not_found(id))?;
                let mut updated = current.clone();
                if let Some(title) = ctx.arg("title") {
                    updated.title = title.to_string();
                }
                if let Some(status) = ctx.arg("status") {
                    updated.status = status.to_lowercase();
                }
                if let Some(assignee) = ctx.arg("assignee") {
                    updated.assignee = assignee.to_string();
                }
                let out = serde_json::to_value(&updated)?;
                if !ctx.dry_run {
                    *current = updated;
                }
                Ok(out)
            },
            MutationMetadata {
                description: "Update a task's title, status or assignee".to_string(),
                parameters: vec![
                    ParameterDef::new("id", "string").required(),
                    ParameterDef::new("title", "string"),
                    ParameterDef::new("status", "string").one_of(STATUSES),
                    ParameterDef::new("assignee", "string"),
                ],
                idempotent: true,
                examples: vec!["update(task-3, status=in-progress)".to_string()],
                ..Default::default()
            },
        )
        .mutation_with_metadata(
            "delete",
            move |ctx| {
                let id = target_id(ctx)?;
                let mut tasks = delete_store.lock();
                let index = tasks
                    .iter()
                    .position(|t| t.id == id)
                    .ok_or_else(|| not_found(id))?;
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
                examples: vec!["delete(task-4)".to_string()],
            },
        )
        .build()
}

fn load_tasks(path: Option<&PathBuf>) -> anyhow::Result<Vec<Task>> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("cannot read task file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid task file {}", path.display()))
        }
        None => Ok(sample_tasks()),
    }
}

fn main() -> anyhow::Result<()> {
    // 日志写到 stderr，stdout 只输出结果
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SchemaConfig::from_json_file(path)?,
        None => SchemaConfig::default(),
    };
    if let Some(dir) = &args.data_dir {
        config = config.with_data_dir(dir);
    }

    let store = Arc::new(Mutex::new(load_tasks(args.tasks.as_ref())?));
    let schema = build_schema(store, config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_command(&schema, &args.command, &mut out)?;

    Ok(())
}
