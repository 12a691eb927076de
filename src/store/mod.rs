//! 监控存储模块
//!
//! 核心流水线通过 [`MonitorStore`] 读写监控：调度器查询到期监控并记录派发时间，
//! 工作者在单个原子操作内读取旧状态、应用状态机并写回。控制面通过
//! [`MonitorCatalog`] 管理监控配置，二者修改的字段互不重叠。

pub mod memory;
pub mod postgres;

use crate::error::StoreError;
use crate::health::state::{HealthPolicy, Transition};
use crate::monitor::{Monitor, MonitorId, MonitorInput};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::InMemoryMonitorStore;
pub use postgres::PgMonitorStore;

/// 一次探测写入存储后的记录
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRecord {
    /// 监控ID
    pub monitor_id: MonitorId,
    /// 监控名称
    pub name: String,
    /// 监控URL
    pub url: String,
    /// 当前配置的webhook URL
    pub webhook_url: Option<String>,
    /// 状态机迁移
    pub transition: Transition,
}

/// 核心流水线使用的存储接口
#[async_trait]
pub trait MonitorStore: Send + Sync {
    /// 查询在 `now` 时刻到期的已启用监控
    async fn due_monitors(&self, now: DateTime<Utc>) -> Result<Vec<Monitor>, StoreError>;

    /// 记录监控已派发检测
    async fn mark_dispatched(&self, monitor_id: MonitorId, at: DateTime<Utc>)
        -> Result<(), StoreError>;

    /// 原子地应用一次探测结果
    ///
    /// 读取旧状态与写回新状态必须在同一个原子单元内完成，并发调用不能丢失更新。
    /// 监控不存在时返回 [`StoreError::NotFound`]。
    async fn record_probe(
        &self,
        monitor_id: MonitorId,
        up: bool,
        policy: &HealthPolicy,
    ) -> Result<ProbeRecord, StoreError>;
}

/// 控制面使用的监控配置接口
#[async_trait]
pub trait MonitorCatalog: Send + Sync {
    /// 创建监控
    async fn create_monitor(&self, input: MonitorInput) -> Result<Monitor, StoreError>;

    /// 列出全部监控，按ID排序
    async fn list_monitors(&self) -> Result<Vec<Monitor>, StoreError>;

    /// 获取单个监控
    async fn get_monitor(&self, monitor_id: MonitorId) -> Result<Monitor, StoreError>;

    /// 更新监控配置，不修改状态与计数
    async fn update_monitor(
        &self,
        monitor_id: MonitorId,
        input: MonitorInput,
    ) -> Result<Monitor, StoreError>;

    /// 删除监控
    async fn delete_monitor(&self, monitor_id: MonitorId) -> Result<(), StoreError>;
}
