//! 查询语言模块
//!
//! 轻量 DSL 的词法分析、语法解析与执行:
//!
//! ```text
//! get(task-1) { id name }; list(status=todo, sort_priority=desc, take=5) { overview }
//! ```
//!
//! 主要特性:
//! - 单趟词法分析，记录每个 token 的偏移、行、列
//! - 递归下降解析，首个错误即终止整个批次
//! - 批量语句按源顺序执行，单条语句失败互不影响

mod ast;
mod executor;
mod lexer;
mod parser;

// 导出 AST 类型
pub use ast::{Arg, Query, Statement};

// 导出词法分析器
pub use lexer::{tokenize, Lexer, Token, TokenKind};

// 导出解析器
pub use parser::{parse, parse_with, FieldResolver, OperationResolver, ParserConfig, QueryParser};

// 导出执行器
pub use executor::{Outcome, QueryExecutor, QueryOutput};
