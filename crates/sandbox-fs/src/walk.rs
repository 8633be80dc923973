//! 沙箱内的递归遍历。
//!
//! 基于 `walkdir` 跟随符号链接做深度优先先序遍历，条目路径即实际访问的路径。
//! 目标越界的链接作为普通文件产出且不进入；悬空链接同样视为文件。
//! 成环与不可读目录以 [`walkdir::Error`] 原样交给调用方。

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::metadata::EntryKind;
use crate::resolver::{PathResolver, entry_name};

/// 遍历产出的单个条目。
pub(crate) struct WalkItem {
    pub path: PathBuf,
    /// 相对遍历起点的深度，直接子项为 1。
    pub depth: usize,
    pub kind: EntryKind,
}

impl WalkItem {
    pub fn name(&self) -> String {
        entry_name(&self.path)
    }
}

/// 不含起点本身的沙箱遍历迭代器。
pub(crate) struct SandboxWalk<'a> {
    resolver: &'a PathResolver,
    inner: walkdir::IntoIter,
}

impl<'a> SandboxWalk<'a> {
    pub fn new(resolver: &'a PathResolver, root: &Path) -> Self {
        let inner = WalkDir::new(root)
            .min_depth(1)
            .follow_links(true)
            .into_iter();
        Self { resolver, inner }
    }
}

impl Iterator for SandboxWalk<'_> {
    type Item = Result<WalkItem, walkdir::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.inner.next()? {
            Ok(entry) => entry,
            Err(err) => return Some(dangling_link(&err).ok_or(err)),
        };

        let is_dir = entry.file_type().is_dir();
        let mut kind = if is_dir {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        if entry.path_is_symlink() && self.resolver.confine(entry.path()).is_none() {
            debug!(path = %entry.path().display(), "symlink not followed");
            if is_dir {
                self.inner.skip_current_dir();
            }
            kind = EntryKind::File;
        }

        let depth = entry.depth();
        Some(Ok(WalkItem {
            path: entry.into_path(),
            depth,
            kind,
        }))
    }
}

/// 跟随失败的悬空链接按文件产出。
fn dangling_link(err: &walkdir::Error) -> Option<WalkItem> {
    if err.loop_ancestor().is_some() {
        return None;
    }
    let path = err.path()?;
    let is_link = fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    if !is_link || fs::metadata(path).is_ok() {
        return None;
    }
    Some(WalkItem {
        path: path.to_path_buf(),
        depth: err.depth(),
        kind: EntryKind::File,
    })
}
