//! 派发调度器模块
//!
//! 按固定节拍查询到期监控，为每个监控发布一条检测任务，然后记录派发时间。
//! 发布与记录不是原子操作，两者之间崩溃会在下一周期重复派发，由至少一次语义吸收。
//! 同一时刻只应运行一个调度器实例。

use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::monitor::CheckJob;
use crate::queue::DeliveryQueue;
use crate::store::MonitorStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// 派发调度器
pub struct DispatchScheduler {
    /// 监控存储
    store: Arc<dyn MonitorStore>,
    /// 投递队列
    queue: Arc<dyn DeliveryQueue>,
    /// 调度配置
    config: SchedulerConfig,
}

impl DispatchScheduler {
    /// 创建新的调度器
    ///
    /// # 参数
    /// * `store` - 监控存储
    /// * `queue` - 投递队列
    /// * `config` - 调度配置
    pub fn new(
        store: Arc<dyn MonitorStore>,
        queue: Arc<dyn DeliveryQueue>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            queue,
            config,
        }
    }

    /// 执行一个调度周期
    ///
    /// 任一步骤出错时放弃本周期剩余的监控，已派发的监控保持已标记状态。
    ///
    /// # 参数
    /// * `now` - 本周期的时间基准
    ///
    /// # 返回
    /// * `Result<usize>` - 本周期派发的任务数
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<usize> {
        let due = self.store.due_monitors(now).await?;
        if due.is_empty() {
            return Ok(0);
        }
        debug!(count = due.len(), "发现到期监控");

        let mut dispatched = 0;
        for monitor in &due {
            let body = CheckJob::for_monitor(monitor, now).to_json()?;
            self.queue.send(body).await?;
            self.store.mark_dispatched(monitor.id, now).await?;

            debug!(monitor_id = monitor.id, url = %monitor.url, "检测任务已派发");
            dispatched += 1;
        }

        Ok(dispatched)
    }

    /// 运行调度循环，直到收到关闭信号
    ///
    /// 周期内的错误只记录日志并退避，不会终止循环。
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            tick_interval_seconds = self.config.tick_interval_seconds,
            "调度器已启动"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {}
            }

            match self.tick(Utc::now()).await {
                Ok(0) => debug!("本周期没有到期监控"),
                Ok(dispatched) => info!(dispatched, "调度周期完成"),
                Err(e) => {
                    if e.is_retryable() {
                        warn!(error = %e, "调度周期失败，退避后重试");
                    } else {
                        error!(error = %e, "调度周期失败，退避后重试");
                    }

                    tokio::select! {
                        _ = shutdown.recv() => break,
                        _ = sleep(self.config.error_backoff()) => {}
                    }
                }
            }
        }

        info!("调度器已停止");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueueError;
    use crate::monitor::{Monitor, MonitorInput};
    use crate::queue::{InMemoryQueue, QueueMessage};
    use crate::store::{InMemoryMonitorStore, MonitorCatalog};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FailingQueue;

    #[async_trait]
    impl DeliveryQueue for FailingQueue {
        async fn send(&self, _body: String) -> std::result::Result<(), QueueError> {
            Err(QueueError::Send("queue unavailable".to_string()))
        }

        async fn receive(
            &self,
            _max_messages: usize,
            _wait: Duration,
        ) -> std::result::Result<Vec<QueueMessage>, QueueError> {
            Ok(Vec::new())
        }

        async fn ack(&self, _receipt: &str) -> std::result::Result<(), QueueError> {
            Ok(())
        }
    }

    fn input(name: &str, check_interval: u64) -> MonitorInput {
        MonitorInput {
            name: name.to_string(),
            url: format!("https://{name}.example.com"),
            check_interval,
            timeout: 3,
            expected_status_code: 204,
            webhook_url: Some("https://hooks.example.com/t".to_string()),
            enabled: true,
        }
    }

    async fn seeded_store() -> (Arc<InMemoryMonitorStore>, Monitor) {
        let store = Arc::new(InMemoryMonitorStore::new());
        let monitor = store.create_monitor(input("api", 60)).await.unwrap();
        (store, monitor)
    }

    #[tokio::test]
    async fn test_tick_publishes_and_marks() {
        let (store, monitor) = seeded_store().await;
        let queue = Arc::new(InMemoryQueue::default());
        let scheduler = DispatchScheduler::new(
            store.clone(),
            queue.clone(),
            SchedulerConfig::default(),
        );

        let now = Utc::now();
        assert_eq!(scheduler.tick(now).await.unwrap(), 1);

        let bodies = queue.bodies().await;
        assert_eq!(bodies.len(), 1);
        let job = CheckJob::parse(&bodies[0]).unwrap();
        assert_eq!(job.monitor_id, monitor.id);
        assert_eq!(job.url, monitor.url);
        assert_eq!(job.timeout, 3);
        assert_eq!(job.expected_status_code, 204);
        assert_eq!(job.webhook_url, monitor.webhook_url);

        let stored = store.snapshot(monitor.id).await.unwrap();
        assert_eq!(stored.last_checked_at, Some(now));

        // 间隔未到，不再派发
        assert_eq!(scheduler.tick(now + chrono::Duration::seconds(30)).await.unwrap(), 0);
        assert_eq!(queue.len().await, 1);

        assert_eq!(scheduler.tick(now + chrono::Duration::seconds(60)).await.unwrap(), 1);
        assert_eq!(queue.len().await, 2);
    }

    #[tokio::test]
    async fn test_zero_interval_is_always_due() {
        let store = Arc::new(InMemoryMonitorStore::new());
        store.create_monitor(input("hot", 0)).await.unwrap();
        let queue = Arc::new(InMemoryQueue::default());
        let scheduler = DispatchScheduler::new(store, queue.clone(), SchedulerConfig::default());

        let now = Utc::now();
        for _ in 0..3 {
            assert_eq!(scheduler.tick(now).await.unwrap(), 1);
        }
        assert_eq!(queue.len().await, 3);
    }

    #[tokio::test]
    async fn test_queue_failure_leaves_monitor_unmarked() {
        let (store, monitor) = seeded_store().await;
        let scheduler = DispatchScheduler::new(
            store.clone(),
            Arc::new(FailingQueue),
            SchedulerConfig::default(),
        );

        let err = scheduler.tick(Utc::now()).await.unwrap_err();
        assert!(err.is_retryable());

        let stored = store.snapshot(monitor.id).await.unwrap();
        assert_eq!(stored.last_checked_at, None);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (store, _monitor) = seeded_store().await;
        let queue = Arc::new(InMemoryQueue::default());
        let scheduler = DispatchScheduler::new(store, queue.clone(), SchedulerConfig::default());

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

        // 首个节拍立即触发
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_run_survives_failing_ticks() {
        let (store, _monitor) = seeded_store().await;
        let config = SchedulerConfig {
            tick_interval_seconds: 1,
            error_backoff_seconds: 0,
        };
        let scheduler = DispatchScheduler::new(store, Arc::new(FailingQueue), config);

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_finished());

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }
}
