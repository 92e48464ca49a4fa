//! Schema 配置
//!
//! Host-level settings that are not part of the registered contract itself:
//! where the search collaborator looks, and whether introspection is exposed.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Engine configuration, fixed when the schema is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemaConfig {
    /// Root directory for full-text search.
    pub data_dir: Option<PathBuf>,
    /// File extensions searched, leading dot included. Empty searches all files.
    pub extensions: Vec<String>,
    /// Expose the built-in `schema()` operation.
    pub introspection: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            extensions: vec![".md".to_string()],
            introspection: true,
        }
    }
}

impl SchemaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置搜索根目录
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// 设置搜索文件扩展名
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn without_introspection(mut self) -> Self {
        self.introspection = false;
        self
    }

    /// Load a configuration from a JSON file. Missing keys take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {:?}: {}", path, e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::config(format!("invalid config {:?}: {}", path, e)))
    }
}
