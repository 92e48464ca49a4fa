//! agentquery - 面向 AI Agent 的可嵌入查询与变更 DSL 引擎
//!
//! 宿主程序为任意领域实体类型注册一份 Schema，即可获得：
//! - 统一的查询 DSL：`op(args) { fields }`，`;` 分隔的批量语句
//! - 字段投影、预设、等值过滤、多键排序、skip/take 分页
//! - 带参数校验与 dry-run 的变更操作
//! - 内置 `schema()` 自省与 `distinct(field)`
//! - JSON 与紧凑表格两种输出格式，以及目录全文搜索

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod query;
pub mod schema;
pub mod search;
pub mod types;

#[cfg(test)]
mod test_fixtures;

// 重导出常用类型
pub use config::SchemaConfig;
pub use error::{Error, ErrorBody, ErrorCode, ParseError, Result};
pub use format::OutputMode;
pub use query::{Outcome, Query, QueryOutput, Statement};
pub use schema::{
    MutationContext, MutationError, MutationResult, OperationContext, Schema, SchemaBuilder,
};
pub use search::{SearchOptions, SearchResult};
pub use types::{MutationMetadata, OperationMetadata, ParameterDef, Pos};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
