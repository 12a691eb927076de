//! 控制面 HTTP API 模块
//!
//! 提供监控的增删改查接口。接口只修改监控配置字段，
//! 状态、计数与 `last_checked_at` 由调度器和工作者维护。

pub mod api;
pub mod server;

use crate::error::StoreError;
use crate::store::MonitorCatalog;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

pub use server::ApiServer;

/// API共享状态
#[derive(Clone)]
pub struct ApiState {
    /// 监控配置存储
    pub catalog: Arc<dyn MonitorCatalog>,
}

impl ApiState {
    /// 创建API状态
    pub fn new(catalog: Arc<dyn MonitorCatalog>) -> Self {
        Self { catalog }
    }
}

/// API错误类型
#[derive(Debug)]
pub enum ApiError {
    /// 监控不存在
    NotFound,
    /// 请求体验证失败
    Validation(String),
    /// 存储故障
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Monitor not found".to_string()),
            ApiError::Validation(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
            ApiError::Internal(message) => {
                error!("API请求处理失败: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// 创建API路由
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route(
            "/monitors",
            get(api::list_monitors).post(api::create_monitor),
        )
        .route(
            "/monitors/{id}",
            get(api::get_monitor)
                .put(api::update_monitor)
                .delete(api::delete_monitor),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
