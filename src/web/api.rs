//! API端点实现

use super::{ApiError, ApiState};
use crate::monitor::{Monitor, MonitorId, MonitorInput};
use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

/// 存活检查
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// 创建监控，新监控从 UNKNOWN 开始
pub async fn create_monitor(
    State(state): State<ApiState>,
    Json(input): Json<MonitorInput>,
) -> Result<Json<Monitor>, ApiError> {
    input.validate().map_err(ApiError::Validation)?;

    let monitor = state.catalog.create_monitor(input).await?;
    info!(monitor_id = monitor.id, url = %monitor.url, "监控已创建");
    Ok(Json(monitor))
}

/// 列出全部监控
pub async fn list_monitors(State(state): State<ApiState>) -> Result<Json<Vec<Monitor>>, ApiError> {
    Ok(Json(state.catalog.list_monitors().await?))
}

/// 获取单个监控
pub async fn get_monitor(
    State(state): State<ApiState>,
    Path(id): Path<MonitorId>,
) -> Result<Json<Monitor>, ApiError> {
    Ok(Json(state.catalog.get_monitor(id).await?))
}

/// 替换监控配置
pub async fn update_monitor(
    State(state): State<ApiState>,
    Path(id): Path<MonitorId>,
    Json(input): Json<MonitorInput>,
) -> Result<Json<Monitor>, ApiError> {
    input.validate().map_err(ApiError::Validation)?;

    let monitor = state.catalog.update_monitor(id, input).await?;
    info!(monitor_id = id, "监控已更新");
    Ok(Json(monitor))
}

/// 删除监控
pub async fn delete_monitor(
    State(state): State<ApiState>,
    Path(id): Path<MonitorId>,
) -> Result<Json<Value>, ApiError> {
    state.catalog.delete_monitor(id).await?;
    info!(monitor_id = id, "监控已删除");
    Ok(Json(json!({ "message": "deleted" })))
}
