//! 按名称递归搜索。

use std::io;

use tracing::debug;

use crate::error::{Result, SandboxError};
use crate::resolver::{PathResolver, ResolvedPath, entry_name};
use crate::walk::SandboxWalk;

/// 匹配条目的绝对路径（经由符号链接访问时为链接下的路径）。
pub type SearchMatch = String;

/// 在 `root` 下递归搜索名称包含 `pattern`（不区分大小写）的文件和目录。
///
/// 结果按深度优先先序排列。无法读取的子目录与符号链接环被静默跳过，
/// 只有起点目录本身不可读时才返回错误。
pub fn search(
    resolver: &PathResolver,
    root: &ResolvedPath,
    pattern: &str,
) -> Result<Vec<SearchMatch>> {
    if !root.exists() {
        return Err(SandboxError::NotFound(root.requested().to_string()));
    }
    if !root.is_dir() {
        return Err(SandboxError::NotADirectory(root.requested().to_string()));
    }

    let pattern = pattern.to_lowercase();
    let mut matches = Vec::new();
    for item in SandboxWalk::new(resolver, root.as_path()) {
        let (path, name) = match item {
            Ok(item) => {
                let name = item.name();
                (item.path, name)
            }
            Err(err) if err.path() == Some(root.as_path()) => {
                return Err(SandboxError::Read {
                    path: root.requested().to_string(),
                    source: io::Error::from(err),
                });
            }
            Err(err) => {
                debug!(error = %err, "skipping unreadable entry");
                // 成环的链接本身仍参与匹配，只是不再进入。
                match (err.loop_ancestor(), err.path()) {
                    (Some(_), Some(link)) => {
                        let name = entry_name(link);
                        (link.to_path_buf(), name)
                    }
                    _ => continue,
                }
            }
        };
        if name.to_lowercase().contains(&pattern) {
            matches.push(path.display().to_string());
        }
    }
    Ok(matches)
}
