use std::ffi::OsString;
use std::path::Path;

use anyhow::Context;
use sandbox_fs::SandboxConfig;
use serde::Deserialize;
type Result<T> = anyhow::Result<T>;

pub const CONFIG_PATH_ENV: &str = "CATALOG_FS_CONFIG";
pub const ROOTS_ENV: &str = "CATALOG_FS_ROOTS";
pub const BIND_ENV: &str = "CATALOG_FS_BIND";
pub const DEFAULT_CONFIG_PATH: &str = "catalog-fs.toml";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            sandbox: SandboxConfig::default(),
        }
    }
}

impl ServerConfig {
    /// 读取配置文件（若存在）并应用环境变量覆盖。
    pub fn load() -> Result<Self> {
        let config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(DEFAULT_CONFIG_PATH)?
            }
            None => Self::default(),
        };
        Ok(config.with_overrides(
            std::env::var_os(ROOTS_ENV),
            std::env::var(BIND_ENV).ok(),
        ))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("failed to deserialize server config")
    }

    /// 非空的根目录列表会替换配置文件中的根目录。
    pub fn with_overrides(mut self, roots: Option<OsString>, bind_addr: Option<String>) -> Self {
        if let Some(roots) = roots {
            let from_env = SandboxConfig::from_path_list(&roots);
            if !from_env.roots.is_empty() {
                self.sandbox = from_env;
            }
        }
        if let Some(bind_addr) = bind_addr.filter(|b| !b.trim().is_empty()) {
            self.bind_addr = bind_addr;
        }
        self
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}
