//! 统一的应用状态。

use std::sync::Arc;

use sandbox_fs::FileSystemCapabilities;

/// 统一的应用状态，包含所有服务共享的数据。
#[derive(Clone)]
pub struct AppState {
    /// 文件系统能力，沙箱根目录在启动时确定。
    pub filesystem: Arc<FileSystemCapabilities>,
}

impl AppState {
    /// 创建新的应用状态。
    pub fn new(filesystem: FileSystemCapabilities) -> Self {
        Self {
            filesystem: Arc::new(filesystem),
        }
    }
}
