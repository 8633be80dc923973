//! 单个条目的元数据读取。

use std::fs;
use std::io;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SandboxError};
use crate::resolver::ResolvedPath;

/// 条目类型，观察时从文件系统读取，不做缓存。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn is_dir(self) -> bool {
        self == Self::Directory
    }
}

/// 文件/目录元数据快照。
///
/// 各属性分别读取，彼此之间不保证原子性。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// 规范路径。
    pub path: String,
    /// 名称（符号链接解析之前）。
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// 字节数，目录为 0。
    #[serde(rename = "size")]
    pub size_bytes: u64,
    #[serde(rename = "creationTime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "lastModifiedTime")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(rename = "lastAccessTime")]
    pub accessed_at: Option<DateTime<Utc>>,
    pub is_readable: bool,
    pub is_writable: bool,
    pub is_executable: bool,
    #[serde(rename = "isSymbolicLink")]
    pub is_symlink: bool,
}

/// 读取元数据。符号链接报告 `is_symlink = true`，类型取自链接目标。
pub fn stat(path: &ResolvedPath) -> Result<FileMetadata> {
    let metadata = fs::metadata(path.as_path()).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => SandboxError::NotFound(path.requested().to_string()),
        _ => SandboxError::Read {
            path: path.requested().to_string(),
            source: e,
        },
    })?;

    let kind = if metadata.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };
    let is_symlink = fs::symlink_metadata(path.addressed())
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);

    Ok(FileMetadata {
        path: path.as_path().display().to_string(),
        name: path.name(),
        kind,
        size_bytes: if kind.is_dir() { 0 } else { metadata.len() },
        created_at: timestamp(metadata.created()),
        modified_at: timestamp(metadata.modified()),
        accessed_at: timestamp(metadata.accessed()),
        is_readable: is_readable(path, kind),
        is_writable: !metadata.permissions().readonly(),
        is_executable: is_executable(&metadata),
        is_symlink,
    })
}

fn timestamp(time: io::Result<SystemTime>) -> Option<DateTime<Utc>> {
    time.ok().map(DateTime::<Utc>::from)
}

fn is_readable(path: &ResolvedPath, kind: EntryKind) -> bool {
    match kind {
        EntryKind::Directory => fs::read_dir(path.as_path()).is_ok(),
        EntryKind::File => fs::File::open(path.as_path()).is_ok(),
    }
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(metadata: &fs::Metadata) -> bool {
    metadata.is_dir()
}
