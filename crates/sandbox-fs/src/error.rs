//! 沙箱文件系统错误类型。

use std::io;

use thiserror::Error;

/// 文件系统错误类型。
///
/// 除 [`SandboxError::Traversal`] 外，携带的路径均为调用方提交的原始字符串。
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("路径无效: {path} ({reason})")]
    InvalidPath { path: String, reason: String },

    /// 不携带规范路径或根目录信息。
    #[error("路径超出沙箱范围: {0}")]
    OutOfSandbox(String),

    #[error("路径不存在: {0}")]
    NotFound(String),

    #[error("路径不是目录: {0}")]
    NotADirectory(String),

    #[error("遍历目录失败: {path}: {source}")]
    Traversal {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("读取失败: {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("沙箱根目录无效: {root} ({reason})")]
    InvalidRoot { root: String, reason: String },
}

impl SandboxError {
    pub(crate) fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// 稳定的错误码，供 API 层和批量读取结果使用。
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPath { .. } => "INVALID_PATH",
            Self::OutOfSandbox(_) => "OUT_OF_SANDBOX",
            Self::NotFound(_) => "NOT_FOUND",
            Self::NotADirectory(_) => "NOT_A_DIRECTORY",
            Self::Traversal { .. } => "TRAVERSAL_ERROR",
            Self::Read { .. } => "READ_ERROR",
            Self::InvalidRoot { .. } => "INVALID_ROOT",
        }
    }
}

pub type Result<T> = std::result::Result<T, SandboxError>;
