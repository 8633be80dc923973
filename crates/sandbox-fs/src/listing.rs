//! 目录列表与目录树。
//!
//! 子项顺序即底层目录枚举顺序，不排序，也不保证跨调用或跨平台稳定。

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SandboxError};
use crate::metadata::EntryKind;
use crate::resolver::{PathResolver, ResolvedPath};
use crate::walk::{SandboxWalk, WalkItem};

/// 目录中的一个直接子项。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl fmt::Display for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            EntryKind::Directory => "[DIR]  ",
            EntryKind::File => "[FILE] ",
        };
        write!(f, "{prefix}{}", self.name)
    }
}

/// 以 `[DIR]`/`[FILE]` 前缀逐行渲染列表。
pub fn render_listing(entries: &[DirectoryEntry]) -> String {
    entries.iter().map(|entry| format!("{entry}\n")).collect()
}

/// 目录树节点。文件节点没有 `children` 字段。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeEntry {
    File {
        name: String,
    },
    Directory {
        name: String,
        children: Vec<TreeEntry>,
    },
}

impl TreeEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::File { name } | Self::Directory { name, .. } => name,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Self::File { .. } => EntryKind::File,
            Self::Directory { .. } => EntryKind::Directory,
        }
    }

    /// 目录返回子节点，文件返回 `None`。
    pub fn children(&self) -> Option<&[TreeEntry]> {
        match self {
            Self::File { .. } => None,
            Self::Directory { children, .. } => Some(children),
        }
    }
}

/// 对目录中的一个直接子项分类。
///
/// 目标存在且位于沙箱内的符号链接按目标类型处理；悬空或越界的链接
/// 视为普通文件。
fn classify(resolver: &PathResolver, path: &Path) -> io::Result<EntryKind> {
    let metadata = fs::symlink_metadata(path)?;
    if !metadata.file_type().is_symlink() {
        return Ok(if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        });
    }

    match resolver.confine(path) {
        Some(target) if target.is_dir() => Ok(EntryKind::Directory),
        Some(_) => Ok(EntryKind::File),
        None => {
            debug!(path = %path.display(), "symlink not followed");
            Ok(EntryKind::File)
        }
    }
}

fn ensure_directory(path: &ResolvedPath) -> Result<()> {
    if !path.exists() {
        return Err(SandboxError::NotFound(path.requested().to_string()));
    }
    if !path.is_dir() {
        return Err(SandboxError::NotADirectory(path.requested().to_string()));
    }
    Ok(())
}

/// 列出目录的直接子项。
pub fn list_flat(resolver: &PathResolver, path: &ResolvedPath) -> Result<Vec<DirectoryEntry>> {
    ensure_directory(path)?;

    let read_error = |source| SandboxError::Read {
        path: path.requested().to_string(),
        source,
    };

    let mut entries = Vec::new();
    for entry in fs::read_dir(path.as_path()).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        let child = entry.path();
        let kind = classify(resolver, &child).unwrap_or(EntryKind::File);
        entries.push(DirectoryEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            kind,
        });
    }
    Ok(entries)
}

/// 递归构建目录树（深度优先）。
///
/// 全有或全无：任何子孙读取失败或符号链接成环都会放弃整棵树，
/// 返回一个指明出错路径的 [`SandboxError::Traversal`]。
pub fn build_tree(resolver: &PathResolver, path: &ResolvedPath) -> Result<TreeEntry> {
    if !path.exists() {
        return Err(SandboxError::NotFound(path.requested().to_string()));
    }

    let name = path.name();
    if !path.is_dir() {
        return Ok(TreeEntry::File { name });
    }

    let mut builder = TreeBuilder::default();
    for item in SandboxWalk::new(resolver, path.as_path()) {
        let item = item.map_err(|err| traversal_error(path.as_path(), err))?;
        builder.add(item);
    }
    Ok(TreeEntry::Directory {
        name,
        children: builder.finish(),
    })
}

fn traversal_error(root: &Path, err: walkdir::Error) -> SandboxError {
    let path = err.path().unwrap_or(root).display().to_string();
    let source = if err.loop_ancestor().is_some() {
        io::Error::other("symbolic link cycle")
    } else {
        io::Error::from(err)
    };
    SandboxError::Traversal { path, source }
}

/// 按先序条目及其深度还原树结构。
#[derive(Default)]
struct TreeBuilder {
    root: Vec<TreeEntry>,
    /// 尚未闭合的目录，第 i 个位于深度 i + 1。
    open: Vec<(String, Vec<TreeEntry>)>,
}

impl TreeBuilder {
    fn children(&mut self) -> &mut Vec<TreeEntry> {
        match self.open.last_mut() {
            Some((_, children)) => children,
            None => &mut self.root,
        }
    }

    fn close(&mut self) {
        if let Some((name, children)) = self.open.pop() {
            self.children().push(TreeEntry::Directory { name, children });
        }
    }

    fn add(&mut self, item: WalkItem) {
        while self.open.len() >= item.depth.max(1) {
            self.close();
        }
        let name = item.name();
        match item.kind {
            EntryKind::Directory => self.open.push((name, Vec::new())),
            EntryKind::File => self.children().push(TreeEntry::File { name }),
        }
    }

    fn finish(mut self) -> Vec<TreeEntry> {
        while !self.open.is_empty() {
            self.close();
        }
        self.root
    }
}
