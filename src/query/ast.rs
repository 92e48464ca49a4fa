//! Query Abstract Syntax Tree
//!
//! A query is a batch of statements separated by `;`. Each statement invokes
//! one operation or mutation:
//!
//! ```text
//! query      = statement (";" statement)*
//! statement  = operation "(" args? ")" ("{" fields "}")?
//! args       = arg ("," arg)*
//! arg        = (identifier "=")? value
//! value      = identifier | string
//! fields     = identifier+
//! ```

use crate::types::Pos;
use serde::Serialize;
use std::fmt;

/// Top-level node: one or more statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    pub statements: Vec<Statement>,
}

impl Query {
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// More than one statement.
    pub fn is_batch(&self) -> bool {
        self.statements.len() > 1
    }
}

/// A single operation call with arguments and optional field projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub operation: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Arg>,
    /// Raw projection names; presets are expanded by the field selector.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    pub pos: Pos,
}

impl Statement {
    pub fn positional_args(&self) -> impl Iterator<Item = &Arg> {
        self.args.iter().filter(|a| a.is_positional())
    }

    pub fn keyed_args(&self) -> impl Iterator<Item = (&str, &str)> {
        self.args
            .iter()
            .filter_map(|a| a.key().map(|k| (k, a.value.as_str())))
    }

    /// First positional value, typically an entity ID.
    pub fn first_positional(&self) -> Option<&str> {
        self.positional_args().next().map(|a| a.value.as_str())
    }

    /// Value of a keyed argument. The last occurrence wins.
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .rev()
            .find(|a| a.key() == Some(key))
            .map(|a| a.value.as_str())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.operation)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")?;
        if !self.fields.is_empty() {
            write!(f, " {{ {} }}", self.fields.join(" "))?;
        }
        Ok(())
    }
}

/// Positional value or `key=value` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Arg {
    /// `None` for positional arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
    pub pos: Pos,
}

impl Arg {
    pub fn positional(value: impl Into<String>) -> Self {
        Self {
            key: None,
            value: value.into(),
            pos: Pos::default(),
        }
    }

    pub fn keyed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
            pos: Pos::default(),
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn is_positional(&self) -> bool {
        self.key.is_none()
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(key) = &self.key {
            write!(f, "{}=", key)?;
        }
        if is_bare_identifier(&self.value) {
            write!(f, "{}", self.value)
        } else {
            write!(f, "\"{}\"", self.value)
        }
    }
}

fn is_bare_identifier(value: &str) -> bool {
    let mut bytes = value.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphanumeric() || b == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(args: Vec<Arg>, fields: &[&str]) -> Statement {
        Statement {
            operation: "list".to_string(),
            args,
            fields: fields.iter().map(|s| s.to_string()).collect(),
            pos: Pos::start(),
        }
    }

    #[test]
    fn test_arg_lookup_last_wins() {
        let stmt = statement(
            vec![
                Arg::keyed("status", "todo"),
                Arg::positional("task-1"),
                Arg::keyed("status", "done"),
            ],
            &[],
        );
        assert_eq!(stmt.arg("status"), Some("done"));
        assert_eq!(stmt.arg("missing"), None);
        assert_eq!(stmt.first_positional(), Some("task-1"));
        assert_eq!(stmt.keyed_args().count(), 2);
    }

    #[test]
    fn test_statement_display() {
        let stmt = statement(
            vec![Arg::positional("task-1"), Arg::keyed("title", "Fix login bug")],
            &["id", "overview"],
        );
        assert_eq!(
            stmt.to_string(),
            "list(task-1, title=\"Fix login bug\") { id overview }"
        );
    }

    #[test]
    fn test_empty_statement_display() {
        assert_eq!(statement(vec![], &[]).to_string(), "list()");
    }
}
