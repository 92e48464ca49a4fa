//! 输出格式
//!
//! `json` renders results as standard JSON. `compact` (alias `llm`) trades
//! structure for tokens: lists of records become a CSV table, single records
//! become `key:value` lines, everything else stays JSON.

use crate::error::{Error, Result};
use crate::query::QueryOutput;
use crate::search::SearchResult;
use indexmap::IndexSet;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Json,
    Compact,
}

impl FromStr for OutputMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputMode::Json),
            "compact" | "llm" => Ok(OutputMode::Compact),
            other => Err(Error::validation(format!(
                "unknown output format {:?}, expected json, compact or llm",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Json => write!(f, "json"),
            OutputMode::Compact => write!(f, "compact"),
        }
    }
}

/// Render a query result. Batch parts are separated by a blank line in
/// compact mode.
pub fn format_output(output: &QueryOutput, mode: OutputMode) -> Result<String> {
    match mode {
        OutputMode::Json => Ok(serde_json::to_string_pretty(output)?),
        OutputMode::Compact => {
            let parts = output
                .outcomes()
                .iter()
                .map(|outcome| format_compact(&outcome.to_value()))
                .collect::<Result<Vec<_>>>()?;
            Ok(parts.join("\n\n"))
        }
    }
}

/// Compact rendering of one value, without a trailing newline.
pub fn format_compact(value: &Value) -> Result<String> {
    match value {
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
            let rows: Vec<&Map<String, Value>> = items.iter().filter_map(Value::as_object).collect();
            format_table(&rows)
        }
        Value::Object(map) if !map.contains_key("error") => Ok(format_record(map)),
        other => Ok(serde_json::to_string(other)?),
    }
}

fn format_table(rows: &[&Map<String, Value>]) -> Result<String> {
    // header: union of keys in first-seen order
    let header: IndexSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(&header)?;
    for row in rows {
        writer.write_record(header.iter().map(|key| cell(row.get(*key))))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::internal(format!("csv flush failed: {}", e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| Error::internal(format!("csv output is not utf-8: {}", e)))?;
    Ok(text.trim_end_matches('\n').to_string())
}

fn format_record(map: &Map<String, Value>) -> String {
    map.iter()
        .map(|(key, value)| {
            let text = cell(Some(value)).replace('\n', "\\n").replace('\r', "\\r");
            format!("{}:{}", key, text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Search results grouped by file:
///
/// ```text
/// notes/a.md
///   3  context line
///   4: matching line
/// ```
pub fn format_search_compact(results: &[SearchResult]) -> String {
    let mut out = String::new();
    let mut current: Option<&str> = None;

    for result in results {
        let path = result.source.path.as_str();
        if current != Some(path) {
            if current.is_some() {
                out.push('\n');
            }
            out.push_str(path);
            out.push('\n');
            current = Some(path);
        }
        let sep = if result.is_match { ":" } else { " " };
        out.push_str(&format!("  {}{} {}\n", result.source.line, sep, result.content));
    }

    out
}

pub fn format_search(results: &[SearchResult], mode: OutputMode) -> Result<String> {
    match mode {
        OutputMode::Json => Ok(serde_json::to_string_pretty(results)?),
        OutputMode::Compact => Ok(format_search_compact(results)
            .trim_end_matches('\n')
            .to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::Source;
    use crate::test_fixtures::{sample_tasks, task_schema};
    use serde_json::json;

    #[test]
    fn test_mode_from_str() {
        assert_eq!("json".parse::<OutputMode>().unwrap(), OutputMode::Json);
        assert_eq!("LLM".parse::<OutputMode>().unwrap(), OutputMode::Compact);
        assert_eq!("compact".parse::<OutputMode>().unwrap(), OutputMode::Compact);
        assert!("yaml".parse::<OutputMode>().is_err());
    }

    #[test]
    fn test_table() {
        let value = json!([
            {"id": "task-1", "name": "Fix login, then test", "tags": ["a", "b"]},
            {"id": "task-2", "name": "Plain", "extra": null},
        ]);
        assert_eq!(
            format_compact(&value).unwrap(),
            "id,name,tags,extra\ntask-1,\"Fix login, then test\",\"[\"\"a\"\",\"\"b\"\"]\",\ntask-2,Plain,,"
        );
    }

    #[test]
    fn test_record() {
        let value = json!({"id": "task-1", "description": "line one\nline two", "priority": 3});
        assert_eq!(
            format_compact(&value).unwrap(),
            "id:task-1\ndescription:line one\\nline two\npriority:3"
        );
    }

    #[test]
    fn test_fallbacks_to_json() {
        assert_eq!(format_compact(&json!([])).unwrap(), "[]");
        assert_eq!(format_compact(&json!([1, 2])).unwrap(), "[1,2]");
        assert_eq!(format_compact(&json!("x")).unwrap(), "\"x\"");
        assert_eq!(
            format_compact(&json!({"error": {"code": "NOT_FOUND"}})).unwrap(),
            r#"{"error":{"code":"NOT_FOUND"}}"#
        );
    }

    #[test]
    fn test_batch_compact() {
        let schema = task_schema(sample_tasks());
        let text = schema
            .query_with_mode("count(status=done); get(task-1) { id }", OutputMode::Compact)
            .unwrap();
        assert_eq!(text, "count:1\n\nid:task-1");
    }

    #[test]
    fn test_json_mode() {
        let schema = task_schema(sample_tasks());
        let text = schema
            .query_with_mode("get(task-1) { id }", OutputMode::Json)
            .unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, json!({"id": "task-1"}));
    }

    #[test]
    fn test_search_compact() {
        let hit = |path: &str, line: usize, is_match: bool| SearchResult {
            source: Source {
                path: path.to_string(),
                line,
            },
            content: format!("line {}", line),
            is_match,
        };
        let results = vec![hit("a.md", 1, false), hit("a.md", 2, true), hit("b.md", 7, true)];
        assert_eq!(
            format_search_compact(&results),
            "a.md\n  1  line 1\n  2: line 2\n\nb.md\n  7: line 7\n"
        );
        assert_eq!(format_search_compact(&[]), "");
    }
}
