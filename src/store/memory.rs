//! 内存存储实现
//!
//! 整个读-改-写过程持有同一把锁，因此并发的 `record_probe` 调用等价于某种串行顺序。

use crate::error::StoreError;
use crate::health::state::HealthPolicy;
use crate::monitor::{Monitor, MonitorId, MonitorInput};
use crate::store::{MonitorCatalog, MonitorStore, ProbeRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    monitors: BTreeMap<MonitorId, Monitor>,
    next_id: MonitorId,
}

/// 内存监控存储
#[derive(Debug, Default)]
pub struct InMemoryMonitorStore {
    inner: Mutex<Inner>,
}

impl InMemoryMonitorStore {
    /// 创建空存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接写入一条完整的监控记录（测试与预置数据用）
    pub async fn insert(&self, monitor: Monitor) {
        let mut inner = self.inner.lock().await;
        inner.next_id = inner.next_id.max(monitor.id);
        inner.monitors.insert(monitor.id, monitor);
    }

    /// 读取监控快照
    pub async fn snapshot(&self, monitor_id: MonitorId) -> Option<Monitor> {
        self.inner.lock().await.monitors.get(&monitor_id).cloned()
    }
}

#[async_trait]
impl MonitorStore for InMemoryMonitorStore {
    async fn due_monitors(&self, now: DateTime<Utc>) -> Result<Vec<Monitor>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .monitors
            .values()
            .filter(|monitor| monitor.is_due(now))
            .cloned()
            .collect())
    }

    async fn mark_dispatched(
        &self,
        monitor_id: MonitorId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        // 与 UPDATE ... WHERE id = ? 一致：监控已被删除时静默忽略
        if let Some(monitor) = inner.monitors.get_mut(&monitor_id) {
            monitor.last_checked_at = Some(at);
        }
        Ok(())
    }

    async fn record_probe(
        &self,
        monitor_id: MonitorId,
        up: bool,
        policy: &HealthPolicy,
    ) -> Result<ProbeRecord, StoreError> {
        let mut inner = self.inner.lock().await;
        let monitor = inner
            .monitors
            .get_mut(&monitor_id)
            .ok_or(StoreError::NotFound(monitor_id))?;

        let transition = monitor.health_state().apply(up, policy);
        monitor.set_health_state(transition.next);

        Ok(ProbeRecord {
            monitor_id,
            name: monitor.name.clone(),
            url: monitor.url.clone(),
            webhook_url: monitor.webhook_url.clone(),
            transition,
        })
    }
}

#[async_trait]
impl MonitorCatalog for InMemoryMonitorStore {
    async fn create_monitor(&self, input: MonitorInput) -> Result<Monitor, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let monitor = input.into_monitor(inner.next_id, Utc::now());
        inner.monitors.insert(monitor.id, monitor.clone());
        Ok(monitor)
    }

    async fn list_monitors(&self) -> Result<Vec<Monitor>, StoreError> {
        Ok(self.inner.lock().await.monitors.values().cloned().collect())
    }

    async fn get_monitor(&self, monitor_id: MonitorId) -> Result<Monitor, StoreError> {
        self.inner
            .lock()
            .await
            .monitors
            .get(&monitor_id)
            .cloned()
            .ok_or(StoreError::NotFound(monitor_id))
    }

    async fn update_monitor(
        &self,
        monitor_id: MonitorId,
        input: MonitorInput,
    ) -> Result<Monitor, StoreError> {
        let mut inner = self.inner.lock().await;
        let monitor = inner
            .monitors
            .get_mut(&monitor_id)
            .ok_or(StoreError::NotFound(monitor_id))?;

        monitor.name = input.name;
        monitor.url = input.url;
        monitor.check_interval = input.check_interval;
        monitor.timeout = input.timeout;
        monitor.expected_status_code = input.expected_status_code;
        monitor.webhook_url = input.webhook_url;
        monitor.enabled = input.enabled;

        Ok(monitor.clone())
    }

    async fn delete_monitor(&self, monitor_id: MonitorId) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .monitors
            .remove(&monitor_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(monitor_id))
    }
}
