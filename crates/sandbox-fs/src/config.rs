//! 沙箱配置。

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// 沙箱根目录集合，启动时读取一次，之后不再变化。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default)]
    pub roots: Vec<PathBuf>,
}

impl SandboxConfig {
    /// 由一组根目录直接构造。
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    /// 从 TOML 文件读取配置。
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read sandbox config: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("failed to parse sandbox config: {}", path.display()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("failed to deserialize sandbox config")
    }

    /// 解析平台路径列表（Unix 以 `:` 分隔，Windows 以 `;` 分隔），忽略空段。
    pub fn from_path_list(list: impl AsRef<std::ffi::OsStr>) -> Self {
        Self {
            roots: std::env::split_paths(list.as_ref())
                .filter(|p| !p.as_os_str().is_empty())
                .collect(),
        }
    }

    /// 将开头的 `~` 替换为用户主目录后的根目录列表。
    pub fn expanded_roots(&self) -> Vec<PathBuf> {
        self.roots.iter().map(|root| expand_home(root)).collect()
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::SandboxConfig;

    #[test]
    fn test_parse_config() {
        let raw = r#"
roots = ["/srv/catalog", "/srv/shared"]
"#;
        let config = SandboxConfig::from_str(raw).expect("config should parse");
        assert_eq!(
            config.roots,
            vec![PathBuf::from("/srv/catalog"), PathBuf::from("/srv/shared")]
        );
    }

    #[test]
    fn test_missing_roots_defaults_to_empty() {
        let config = SandboxConfig::from_str("").expect("empty config should parse");
        assert!(config.roots.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_path_list_skips_empty_segments() {
        let config = SandboxConfig::from_path_list("/data::/tmp/work");
        assert_eq!(
            config.roots,
            vec![PathBuf::from("/data"), PathBuf::from("/tmp/work")]
        );
    }

    #[test]
    fn test_home_expansion() {
        let config = SandboxConfig::new(["~/projects", "/abs"]);
        let expanded = config.expanded_roots();
        assert_eq!(expanded[1], PathBuf::from("/abs"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded[0], home.join("projects"));
        }
    }
}
