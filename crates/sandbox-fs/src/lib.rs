//! Sandbox FS - 沙箱文件系统访问模块。
//!
//! 该 crate 为外部调用方（自动化 agent）提供只读文件系统能力：
//! 读取文件、列出目录、构建目录树、递归搜索与元数据查询，
//! 所有路径都限制在配置的沙箱根目录之内。

pub mod batch;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod listing;
pub mod metadata;
pub mod resolver;
pub mod search;
mod walk;

pub use batch::{BatchReadResult, ReadOutcome};
pub use config::SandboxConfig;
pub use error::{Result, SandboxError};
pub use filesystem::FileSystemCapabilities;
pub use listing::{DirectoryEntry, TreeEntry, render_listing};
pub use metadata::{EntryKind, FileMetadata};
pub use resolver::{PathResolver, ResolvedPath};
pub use search::SearchMatch;
