//! 文件系统能力模块。
//!
//! 以原始路径字符串为输入的统一入口：先解析并校验沙箱边界，
//! 再交给各组件执行。所有操作均为同步阻塞调用。

use tracing::info;

use crate::batch::{self, BatchReadResult};
use crate::config::SandboxConfig;
use crate::error::Result;
use crate::listing::{self, DirectoryEntry, TreeEntry};
use crate::metadata::{self, FileMetadata};
use crate::resolver::{PathResolver, ResolvedPath};
use crate::search::{self, SearchMatch};

/// 文件系统能力接口。
#[derive(Debug, Clone)]
pub struct FileSystemCapabilities {
    resolver: PathResolver,
}

impl FileSystemCapabilities {
    /// 根据沙箱配置创建实例。
    pub fn new(config: &SandboxConfig) -> Result<Self> {
        Ok(Self::from_resolver(PathResolver::new(config)?))
    }

    pub fn from_resolver(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// 解析路径，不检查目标是否存在。
    pub fn resolve(&self, path: &str) -> Result<ResolvedPath> {
        self.resolver.resolve(path)
    }

    /// 读取单个文件的完整内容。
    pub fn read_file(&self, path: &str) -> Result<String> {
        info!(path = %path, "Reading file");
        batch::read(&self.resolver.resolve(path)?)
    }

    /// 同时读取多个文件，单个失败不会中断其余读取。
    pub fn read_multiple_files<S: AsRef<str>>(&self, paths: &[S]) -> BatchReadResult {
        info!(count = paths.len(), "Reading multiple files");
        let result = batch::read_many(&self.resolver, paths);
        info!(
            count = result.len(),
            failed = result.failed_count(),
            "Batch read finished"
        );
        result
    }

    /// 列出目录的直接子项。
    pub fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>> {
        info!(path = %path, "Listing directory");
        listing::list_flat(&self.resolver, &self.resolver.resolve(path)?)
    }

    /// 递归构建目录树。
    pub fn directory_tree(&self, path: &str) -> Result<TreeEntry> {
        info!(path = %path, "Building directory tree");
        listing::build_tree(&self.resolver, &self.resolver.resolve(path)?)
    }

    /// 搜索名称包含 `pattern` 的文件和目录。
    pub fn search_files(&self, path: &str, pattern: &str) -> Result<Vec<SearchMatch>> {
        info!(path = %path, pattern = %pattern, "Searching files");
        let matches = search::search(&self.resolver, &self.resolver.resolve(path)?, pattern)?;
        info!(count = matches.len(), "Search finished");
        Ok(matches)
    }

    /// 获取文件或目录的元数据。
    pub fn get_file_info(&self, path: &str) -> Result<FileMetadata> {
        info!(path = %path, "Getting file info");
        metadata::stat(&self.resolver.resolve(path)?)
    }
}
