//! API 路由模块。
//!
//! 为 agent 工具调用提供沙箱文件系统 API。

pub mod filesystem;
pub mod state;

use std::sync::Arc;

use axum::{Json, Router, routing::get};
use catalog_fs_api_types::HealthCheckResponse;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use filesystem::create_filesystem_router;
pub use state::AppState;

/// 组装完整的应用路由。
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(create_filesystem_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse::ok())
}
