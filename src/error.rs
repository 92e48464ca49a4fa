//! 错误类型定义
//!
//! Every failure the engine can surface maps onto one [`ErrorCode`] and can be
//! rendered as the uniform `{code, message, details?}` body.

use crate::types::Pos;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Structured, JSON-serializable error details.
pub type Details = Map<String, Value>;

/// 错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "PARSE_ERROR")]
    Parse,
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    #[serde(rename = "VALIDATION")]
    Validation,
    /// 必填参数缺失
    #[serde(rename = "REQUIRED")]
    Required,
    /// 参数值不在枚举范围内
    #[serde(rename = "INVALID_VALUE")]
    InvalidValue,
    #[serde(rename = "CONFLICT")]
    Conflict,
    #[serde(rename = "FORBIDDEN")]
    Forbidden,
    #[serde(rename = "PRECONDITION_FAILED")]
    PreconditionFailed,
    /// Schema 注册配置错误
    #[serde(rename = "CONFIGURATION")]
    Configuration,
    #[serde(rename = "INTERNAL")]
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Parse => "PARSE_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Validation => "VALIDATION",
            ErrorCode::Required => "REQUIRED",
            ErrorCode::InvalidValue => "INVALID_VALUE",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::PreconditionFailed => "PRECONDITION_FAILED",
            ErrorCode::Configuration => "CONFIGURATION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 解析错误（词法、语法以及解析期的语义校验）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub pos: Pos,
    pub got: Option<String>,
    pub expected: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, pos: Pos) -> Self {
        Self {
            message: message.into(),
            pos,
            got: None,
            expected: None,
        }
    }

    pub fn with_got(mut self, got: impl Into<String>) -> Self {
        self.got = Some(got.into());
        self
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse error at {}:{}: {}",
            self.pos.line, self.pos.column, self.message
        )?;
        match (&self.got, &self.expected) {
            (Some(got), Some(expected)) => write!(f, " (got {:?}, expected {})", got, expected),
            (Some(got), None) => write!(f, " (got {:?})", got),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{message}")]
    NotFound { message: String, details: Details },

    #[error("{message}")]
    Validation { message: String, details: Details },

    #[error("{message}")]
    Required { message: String, details: Details },

    #[error("{message}")]
    InvalidValue { message: String, details: Details },

    #[error("{message}")]
    Conflict { message: String, details: Details },

    #[error("{message}")]
    Forbidden { message: String, details: Details },

    #[error("{message}")]
    PreconditionFailed { message: String, details: Details },

    #[error("invalid schema configuration: {0}")]
    Config(String),

    #[error("{message}")]
    Internal { message: String, details: Details },
}

impl Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound {
            message: message.into(),
            details: Details::new(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            details: Details::new(),
        }
    }

    pub fn required(message: impl Into<String>) -> Self {
        Error::Required {
            message: message.into(),
            details: Details::new(),
        }
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Error::InvalidValue {
            message: message.into(),
            details: Details::new(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Error::Conflict {
            message: message.into(),
            details: Details::new(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Error::Forbidden {
            message: message.into(),
            details: Details::new(),
        }
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Error::PreconditionFailed {
            message: message.into(),
            details: Details::new(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
            details: Details::new(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Attach one structured detail. Parse and configuration errors carry
    /// their context in dedicated fields and ignore extra details.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Some(details) = self.details_mut() {
            details.insert(key.into(), value.into());
        }
        self
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Parse(_) => ErrorCode::Parse,
            Error::NotFound { .. } => ErrorCode::NotFound,
            Error::Validation { .. } => ErrorCode::Validation,
            Error::Required { .. } => ErrorCode::Required,
            Error::InvalidValue { .. } => ErrorCode::InvalidValue,
            Error::Conflict { .. } => ErrorCode::Conflict,
            Error::Forbidden { .. } => ErrorCode::Forbidden,
            Error::PreconditionFailed { .. } => ErrorCode::PreconditionFailed,
            Error::Config(_) => ErrorCode::Configuration,
            Error::Internal { .. } => ErrorCode::Internal,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Error::Parse(e) => e.message.clone(),
            Error::Config(message) => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn details(&self) -> Option<&Details> {
        match self {
            Error::NotFound { details, .. }
            | Error::Validation { details, .. }
            | Error::Required { details, .. }
            | Error::InvalidValue { details, .. }
            | Error::Conflict { details, .. }
            | Error::Forbidden { details, .. }
            | Error::PreconditionFailed { details, .. }
            | Error::Internal { details, .. } => Some(details),
            Error::Parse(_) | Error::Config(_) => None,
        }
    }

    fn details_mut(&mut self) -> Option<&mut Details> {
        match self {
            Error::NotFound { details, .. }
            | Error::Validation { details, .. }
            | Error::Required { details, .. }
            | Error::InvalidValue { details, .. }
            | Error::Conflict { details, .. }
            | Error::Forbidden { details, .. }
            | Error::PreconditionFailed { details, .. }
            | Error::Internal { details, .. } => Some(details),
            Error::Parse(_) | Error::Config(_) => None,
        }
    }

    /// The `field` detail, if the producer recorded one.
    pub fn field(&self) -> Option<&str> {
        self.details()
            .and_then(|d| d.get("field"))
            .and_then(Value::as_str)
    }

    /// Uniform `{code, message, details?}` body shared by every transport.
    pub fn to_body(&self) -> ErrorBody {
        let details = match self {
            Error::Parse(e) => {
                let mut details = Details::new();
                details.insert(
                    "position".to_string(),
                    serde_json::json!({
                        "offset": e.pos.offset,
                        "line": e.pos.line,
                        "column": e.pos.column,
                    }),
                );
                if let Some(got) = &e.got {
                    details.insert("got".to_string(), Value::String(got.clone()));
                }
                if let Some(expected) = &e.expected {
                    details.insert("expected".to_string(), Value::String(expected.clone()));
                }
                Some(details)
            }
            other => other.details().filter(|d| !d.is_empty()).cloned(),
        };

        ErrorBody {
            code: self.code(),
            message: self.to_string(),
            details,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::internal(format!("io error: {}", e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::internal(format!("serialization error: {}", e))
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::internal(format!("csv error: {}", e))
    }
}

/// Serializable error envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Details>,
}
