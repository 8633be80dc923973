//! 文件系统 API 路由。
//!
//! 提供文件读取、目录浏览、目录树、文件搜索与元数据查询能力给 agent 使用。
//! 每次调用都在阻塞线程池中执行，避免大目录遍历阻塞其它请求。

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use catalog_fs_api_types::{
    ErrorResponse, ListDirectoryQuery, ListFormat, PathQuery, ReadFileResponse,
    ReadMultipleFilesRequest, SearchQuery,
};
use sandbox_fs::{
    BatchReadResult, FileMetadata, FileSystemCapabilities, SandboxError, SearchMatch, TreeEntry,
    render_listing,
};
use std::sync::Arc;
use tracing::error;

use super::state::AppState;

/// 创建文件系统 API 路由。
pub fn create_filesystem_router() -> Router<Arc<AppState>> {
    Router::new()
        // 读取单个文件
        .route("/api/fs/read", get(read_file))
        // 批量读取
        .route("/api/fs/read-many", post(read_multiple_files))
        // 列出目录内容
        .route("/api/fs/list", get(list_directory))
        // 目录树
        .route("/api/fs/tree", get(directory_tree))
        // 搜索文件
        .route("/api/fs/search", get(search_files))
        // 文件元数据
        .route("/api/fs/info", get(get_file_info))
}

/// 在阻塞线程池中执行文件系统操作。
async fn run_blocking<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&FileSystemCapabilities) -> sandbox_fs::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let filesystem = Arc::clone(&state.filesystem);
    tokio::task::spawn_blocking(move || op(&filesystem))
        .await
        .map_err(|err| {
            error!(error = %err, "filesystem task failed");
            ApiError::internal(err.to_string())
        })?
        .map_err(ApiError::from)
}

/// 读取单个文件。
async fn read_file(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
) -> Result<Json<ReadFileResponse>, ApiError> {
    let path = query.path.clone();
    let content = run_blocking(&state, move |fs| fs.read_file(&path)).await?;
    Ok(Json(ReadFileResponse {
        path: query.path,
        content,
    }))
}

/// 批量读取，单个路径的失败记录在结果中。
async fn read_multiple_files(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReadMultipleFilesRequest>,
) -> Result<Json<BatchReadResult>, ApiError> {
    let result = run_blocking(&state, move |fs| {
        Ok(fs.read_multiple_files(&request.paths))
    })
    .await?;
    Ok(Json(result))
}

/// 列出目录内容。
async fn list_directory(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListDirectoryQuery>,
) -> Result<Response, ApiError> {
    let path = query.path;
    let entries = run_blocking(&state, move |fs| fs.list_directory(&path)).await?;
    Ok(match query.format {
        ListFormat::Json => Json(entries).into_response(),
        ListFormat::Text => render_listing(&entries).into_response(),
    })
}

/// 构建目录树。
async fn directory_tree(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
) -> Result<Json<TreeEntry>, ApiError> {
    let tree = run_blocking(&state, move |fs| fs.directory_tree(&query.path)).await?;
    Ok(Json(tree))
}

/// 搜索文件。
async fn search_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchMatch>>, ApiError> {
    let matches = run_blocking(&state, move |fs| {
        fs.search_files(&query.path, &query.pattern)
    })
    .await?;
    Ok(Json(matches))
}

/// 获取文件元数据。
async fn get_file_info(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
) -> Result<Json<FileMetadata>, ApiError> {
    let info = run_blocking(&state, move |fs| fs.get_file_info(&query.path)).await?;
    Ok(Json(info))
}

/// API 错误类型。
#[derive(Debug)]
struct ApiError {
    message: String,
    code: String,
    status: StatusCode,
}

impl ApiError {
    fn internal(message: String) -> Self {
        ApiError {
            message,
            code: "INTERNAL_ERROR".to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SandboxError> for ApiError {
    fn from(err: SandboxError) -> Self {
        let code = err.code().to_string();
        let (status, message) = match &err {
            SandboxError::InvalidPath { path, reason } => (
                StatusCode::BAD_REQUEST,
                format!("Invalid path: {} ({})", path, reason),
            ),
            SandboxError::OutOfSandbox(path) => (
                StatusCode::FORBIDDEN,
                format!("Path is outside the sandbox: {}", path),
            ),
            SandboxError::NotFound(path) => (
                StatusCode::NOT_FOUND,
                format!("Path does not exist: {}", path),
            ),
            SandboxError::NotADirectory(path) => (
                StatusCode::BAD_REQUEST,
                format!("Path is not a directory: {}", path),
            ),
            SandboxError::Traversal { path, source } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to build directory tree at {}: {}", path, source),
            ),
            SandboxError::Read { path, source } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read {}: {}", path, source),
            ),
            SandboxError::InvalidRoot { root, reason } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Invalid sandbox root {}: {}", root, reason),
            ),
        };
        ApiError {
            message,
            code,
            status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            code: self.code,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}
