//! 通知发送器模块
//!
//! 定义通知发送的trait和基础实现

use crate::error::NotificationError;
use crate::health::result::MonitorStatus;
use crate::health::state::Transition;
use crate::monitor::MonitorId;
use crate::store::ProbeRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// 状态变化事件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
    /// 监控ID
    pub monitor_id: MonitorId,
    /// 监控名称
    pub name: String,
    /// 监控URL
    pub url: String,
    /// 旧状态
    pub old_status: MonitorStatus,
    /// 新状态
    pub new_status: MonitorStatus,
    /// 变化时间
    pub time: DateTime<Utc>,
}

impl StatusChange {
    /// 从一次探测记录构造状态变化
    pub fn from_record(record: &ProbeRecord, time: DateTime<Utc>) -> Self {
        let Transition { previous, next } = record.transition;
        Self {
            monitor_id: record.monitor_id,
            name: record.name.clone(),
            url: record.url.clone(),
            old_status: previous.status,
            new_status: next.status,
            time,
        }
    }
}

/// 通知发送器trait
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// 发送状态变化通知
    ///
    /// # 参数
    /// * `webhook_url` - 目标 webhook，为空时不发送且不视为错误
    /// * `change` - 状态变化
    ///
    /// # 返回
    /// * `Result<(), NotificationError>` - 发送结果，调用方只记录日志
    async fn notify(
        &self,
        webhook_url: Option<&str>,
        change: &StatusChange,
    ) -> Result<(), NotificationError>;
}
