//! 路径解析与沙箱边界校验。
//!
//! 所有操作都先经过 [`PathResolver::resolve`]，其余模块信任它产出的
//! [`ResolvedPath`]，不再重复校验边界。

use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{info, warn};

use crate::config::SandboxConfig;
use crate::error::{Result, SandboxError};

/// 已证明位于沙箱内的规范路径。
///
/// 只能由 [`PathResolver`] 构造。相等性只比较规范路径。
#[derive(Debug, Clone)]
pub struct ResolvedPath {
    canonical: PathBuf,
    /// 最后一个组件在解析符号链接之前的位置。
    addressed: PathBuf,
    requested: String,
}

impl ResolvedPath {
    /// 规范（已解析符号链接）的绝对路径。
    pub fn as_path(&self) -> &Path {
        &self.canonical
    }

    pub fn addressed(&self) -> &Path {
        &self.addressed
    }

    /// 调用方提交的原始字符串。
    pub fn requested(&self) -> &str {
        &self.requested
    }

    pub fn exists(&self) -> bool {
        self.canonical.exists()
    }

    pub fn is_dir(&self) -> bool {
        self.canonical.is_dir()
    }

    /// 条目名称，取自符号链接解析之前的路径。
    pub fn name(&self) -> String {
        entry_name(&self.addressed)
    }
}

impl PartialEq for ResolvedPath {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for ResolvedPath {}

impl Hash for ResolvedPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.canonical
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.canonical.display().fmt(f)
    }
}

/// 沙箱路径解析器。
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// 规范化后的根目录，按配置顺序排列。
    roots: Vec<PathBuf>,
}

impl PathResolver {
    /// 根据配置创建解析器，根目录在此处一次性规范化。
    pub fn new(config: &SandboxConfig) -> Result<Self> {
        let expanded = config.expanded_roots();
        if expanded.is_empty() {
            return Err(SandboxError::InvalidRoot {
                root: String::new(),
                reason: "no sandbox roots configured".to_string(),
            });
        }

        let mut roots = Vec::with_capacity(expanded.len());
        for root in expanded {
            let canonical = fs::canonicalize(&root).map_err(|e| SandboxError::InvalidRoot {
                root: root.display().to_string(),
                reason: e.to_string(),
            })?;
            if !canonical.is_dir() {
                return Err(SandboxError::InvalidRoot {
                    root: root.display().to_string(),
                    reason: "not a directory".to_string(),
                });
            }
            if !roots.contains(&canonical) {
                roots.push(canonical);
            }
        }

        info!(count = roots.len(), "sandbox roots configured");
        Ok(Self { roots })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// 按目录边界判断规范路径是否位于某个根目录下。
    pub fn contains(&self, canonical: &Path) -> bool {
        self.roots.iter().any(|root| canonical.starts_with(root))
    }

    /// 解析调用方提交的路径。
    ///
    /// 目标不存在不算失败；只保证“如果存在，它位于沙箱内”。
    pub fn resolve(&self, raw: &str) -> Result<ResolvedPath> {
        validate_input(raw)?;
        let requested = Path::new(raw);

        if requested.is_absolute() {
            return self
                .resolve_candidate(raw, requested)?
                .ok_or_else(|| self.reject(raw));
        }

        // 相对路径：优先取第一个目标已存在的根目录，否则取第一个未越界的候选。
        let mut fallback = None;
        for root in &self.roots {
            match self.resolve_candidate(raw, &root.join(requested))? {
                Some(resolved) if resolved.exists() => return Ok(resolved),
                Some(resolved) => {
                    if fallback.is_none() {
                        fallback = Some(resolved);
                    }
                }
                None => {}
            }
        }
        fallback.ok_or_else(|| self.reject(raw))
    }

    /// 严格规范化一个已存在的路径，仅当结果仍在沙箱内时返回。
    pub fn confine(&self, path: &Path) -> Option<PathBuf> {
        let canonical = fs::canonicalize(path).ok()?;
        self.contains(&canonical).then_some(canonical)
    }

    fn resolve_candidate(&self, raw: &str, candidate: &Path) -> Result<Option<ResolvedPath>> {
        let canonical = canonicalize_lenient(candidate)
            .map_err(|e| SandboxError::invalid_path(raw, e.to_string()))?;
        if !self.contains(&canonical) {
            return Ok(None);
        }

        let addressed = self
            .addressed_path(candidate)
            .unwrap_or_else(|| canonical.clone());
        Ok(Some(ResolvedPath {
            canonical,
            addressed,
            requested: raw.to_string(),
        }))
    }

    fn addressed_path(&self, candidate: &Path) -> Option<PathBuf> {
        let name = match candidate.components().next_back()? {
            Component::Normal(name) => name,
            _ => return None,
        };
        let parent = canonicalize_lenient(candidate.parent()?).ok()?;
        self.contains(&parent).then(|| parent.join(name))
    }

    fn reject(&self, raw: &str) -> SandboxError {
        warn!(path = %raw, "rejected path outside sandbox");
        SandboxError::OutOfSandbox(raw.to_string())
    }
}

fn validate_input(raw: &str) -> Result<()> {
    if raw.is_empty() {
        return Err(SandboxError::invalid_path(raw, "empty path"));
    }
    if raw.contains('\0') {
        return Err(SandboxError::invalid_path(raw, "embedded NUL byte"));
    }
    if matches!(Path::new(raw).components().next(), Some(Component::Normal(first)) if first == "~")
    {
        return Err(SandboxError::invalid_path(
            raw,
            "home directory placeholder is not supported",
        ));
    }
    Ok(())
}

/// 规范化最深的已存在祖先，其余组件按字面追加（`..` 弹出，`.` 忽略）。
fn canonicalize_lenient(path: &Path) -> io::Result<PathBuf> {
    let components: Vec<Component<'_>> = path.components().collect();
    for split in (1..=components.len()).rev() {
        let base: PathBuf = components[..split].iter().collect();
        match fs::canonicalize(&base) {
            Ok(canonical) => return Ok(append_lexically(canonical, &components[split..])),
            Err(err) if is_missing(&err) => continue,
            Err(err) => return Err(err),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        "no existing ancestor",
    ))
}

fn append_lexically(mut base: PathBuf, tail: &[Component<'_>]) -> PathBuf {
    for component in tail {
        match component {
            Component::ParentDir => {
                base.pop();
            }
            Component::Normal(part) => base.push(part),
            _ => {}
        }
    }
    base
}

fn is_missing(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

pub(crate) fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::PathResolver;
    use crate::config::SandboxConfig;
    use crate::error::SandboxError;

    fn sandbox() -> (TempDir, PathBuf, PathResolver) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        fs::create_dir_all(root.join("reports")).unwrap();
        fs::write(root.join("reports/2024.csv"), "year,total\n").unwrap();
        let resolver = PathResolver::new(&SandboxConfig::new([&root])).unwrap();
        let root = fs::canonicalize(&root).unwrap();
        (dir, root, resolver)
    }

    #[test]
    fn test_resolve_relative_file() {
        let (_dir, root, resolver) = sandbox();
        let resolved = resolver.resolve("reports/2024.csv").unwrap();
        assert_eq!(resolved.as_path(), root.join("reports/2024.csv"));
        assert_eq!(resolved.requested(), "reports/2024.csv");
        assert_eq!(resolved.name(), "2024.csv");
        assert!(resolved.exists());
    }

    #[test]
    fn test_parent_escape_is_out_of_sandbox() {
        let (_dir, _root, resolver) = sandbox();
        for raw in ["../etc/passwd", "reports/../../x", "../../../../../../../../etc/passwd"] {
            let err = resolver.resolve(raw).unwrap_err();
            assert!(
                matches!(err, SandboxError::OutOfSandbox(ref p) if p == raw),
                "{raw}: {err:?}"
            );
        }
    }

    #[test]
    fn test_absolute_path_outside_is_rejected() {
        let (dir, _root, resolver) = sandbox();
        let outside = dir.path().join("outside.txt");
        fs::write(&outside, "secret").unwrap();
        let err = resolver.resolve(outside.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, SandboxError::OutOfSandbox(_)));
    }

    #[test]
    fn test_sibling_with_shared_prefix_is_rejected() {
        let (dir, root, resolver) = sandbox();
        let sibling = dir.path().join("data-other");
        fs::create_dir_all(&sibling).unwrap();
        fs::write(sibling.join("x.txt"), "x").unwrap();

        let err = resolver.resolve("../data-other/x.txt").unwrap_err();
        assert!(matches!(err, SandboxError::OutOfSandbox(_)));

        let message = err.to_string();
        assert!(!message.contains(root.to_str().unwrap()));
    }

    #[test]
    fn test_missing_target_still_resolves() {
        let (_dir, root, resolver) = sandbox();
        let resolved = resolver.resolve("reports/missing/../new.txt").unwrap();
        assert_eq!(resolved.as_path(), root.join("reports/new.txt"));
        assert!(!resolved.exists());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let (_dir, _root, resolver) = sandbox();
        for raw in ["reports/2024.csv", "reports/./../reports", ".", "not/yet/here.txt"] {
            let first = resolver.resolve(raw).unwrap();
            let second = resolver
                .resolve(first.as_path().to_str().unwrap())
                .unwrap();
            assert_eq!(first, second, "{raw}");
            assert_eq!(first.as_path(), second.as_path());
        }
    }

    #[test]
    fn test_malformed_input_is_invalid_path() {
        let (_dir, _root, resolver) = sandbox();
        for raw in ["", "reports/\0evil", "~/secrets"] {
            let err = resolver.resolve(raw).unwrap_err();
            assert!(matches!(err, SandboxError::InvalidPath { .. }), "{raw:?}: {err:?}");
        }
    }

    #[test]
    fn test_file_used_as_directory_resolves_without_error() {
        let (_dir, root, resolver) = sandbox();
        let resolved = resolver.resolve("reports/2024.csv/inner").unwrap();
        assert_eq!(resolved.as_path(), root.join("reports/2024.csv/inner"));
        assert!(!resolved.exists());
    }

    #[test]
    fn test_multiple_roots_prefer_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(second.join("only-second.txt"), "2").unwrap();

        let resolver = PathResolver::new(&SandboxConfig::new([&first, &second])).unwrap();
        let second = fs::canonicalize(&second).unwrap();
        let first = fs::canonicalize(&first).unwrap();

        let resolved = resolver.resolve("only-second.txt").unwrap();
        assert_eq!(resolved.as_path(), second.join("only-second.txt"));

        let missing = resolver.resolve("nowhere.txt").unwrap();
        assert_eq!(missing.as_path(), first.join("nowhere.txt"));

        // 从 first 出发的 `../second` 仍在沙箱内。
        let across = resolver.resolve("../second/only-second.txt").unwrap();
        assert_eq!(across.as_path(), second.join("only-second.txt"));
    }

    #[test]
    fn test_invalid_roots() {
        let err = PathResolver::new(&SandboxConfig::default()).unwrap_err();
        assert!(matches!(err, SandboxError::InvalidRoot { .. }));

        let dir = tempfile::tempdir().unwrap();
        let err = PathResolver::new(&SandboxConfig::new([dir.path().join("absent")])).unwrap_err();
        assert!(matches!(err, SandboxError::InvalidRoot { .. }));

        let file = dir.path().join("file.txt");
        fs::write(&file, "").unwrap();
        let err = PathResolver::new(&SandboxConfig::new([&file])).unwrap_err();
        assert!(matches!(err, SandboxError::InvalidRoot { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_pointing_outside_is_rejected() {
        let (dir, root, resolver) = sandbox();
        let outside = dir.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("secret.txt"), "secret").unwrap();
        std::os::unix::fs::symlink(&outside, root.join("escape")).unwrap();

        for raw in ["escape", "escape/secret.txt", "escape/not-there.txt"] {
            let err = resolver.resolve(raw).unwrap_err();
            assert!(matches!(err, SandboxError::OutOfSandbox(_)), "{raw}: {err:?}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_inside_keeps_addressed_name() {
        let (_dir, root, resolver) = sandbox();
        std::os::unix::fs::symlink(root.join("reports"), root.join("current")).unwrap();

        let resolved = resolver.resolve("current").unwrap();
        assert_eq!(resolved.as_path(), root.join("reports"));
        assert_eq!(resolved.addressed(), root.join("current"));
        assert_eq!(resolved.name(), "current");
    }

    #[test]
    fn test_confine() {
        let (dir, root, resolver) = sandbox();
        assert_eq!(
            resolver.confine(&root.join("reports")),
            Some(root.join("reports"))
        );
        assert_eq!(resolver.confine(dir.path()), None);
        assert_eq!(resolver.confine(&root.join("missing")), None);
    }
}
