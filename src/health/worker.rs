//! 检测工作者模块
//!
//! 持续执行"接收、处理、确认"循环。每条消息独立处理：解析任务、探测URL、
//! 在存储中原子地应用状态机，状态迁移到 UP 或 DOWN 时发送通知。
//! 只有处理成功的消息才会被确认；格式错误的消息不确认，在可见性超时后重新投递。

use crate::config::WorkerConfig;
use crate::error::{Result, StoreError};
use crate::health::checker::{HealthChecker, ProbeTarget};
use crate::health::state::HealthPolicy;
use crate::monitor::{CheckJob, MonitorId};
use crate::notification::{NotificationSender, StatusChange};
use crate::queue::{DeliveryQueue, QueueMessage};
use crate::store::{MonitorStore, ProbeRecord};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// 单条消息的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// 探测结果已写入存储，消息应确认
    Recorded(ProbeRecord),
    /// 消息格式错误，不确认
    Skipped,
    /// 监控已被删除，消息应确认
    MonitorMissing(MonitorId),
}

impl MessageOutcome {
    /// 是否应确认消息
    pub fn should_ack(&self) -> bool {
        !matches!(self, MessageOutcome::Skipped)
    }
}

/// 检测工作者
pub struct Worker {
    /// 投递队列
    queue: Arc<dyn DeliveryQueue>,
    /// 监控存储
    store: Arc<dyn MonitorStore>,
    /// 健康检测器
    checker: Arc<dyn HealthChecker>,
    /// 通知发送器
    notifier: Arc<dyn NotificationSender>,
    /// 状态机阈值
    policy: HealthPolicy,
    /// 工作者配置
    config: WorkerConfig,
}

impl Worker {
    /// 创建新的工作者
    pub fn new(
        queue: Arc<dyn DeliveryQueue>,
        store: Arc<dyn MonitorStore>,
        checker: Arc<dyn HealthChecker>,
        notifier: Arc<dyn NotificationSender>,
        policy: HealthPolicy,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            store,
            checker,
            notifier,
            policy,
            config,
        }
    }

    /// 处理一条消息体，不负责确认
    ///
    /// # 参数
    /// * `body` - 队列消息体
    ///
    /// # 返回
    /// * `Result<MessageOutcome>` - 存储故障时返回错误，消息保持未确认
    pub async fn process_message(&self, body: &str) -> Result<MessageOutcome> {
        let job = match CheckJob::parse(body) {
            Ok(job) => job,
            Err(e) => {
                warn!(error = %e, body, "检测任务无效，跳过且不确认");
                return Ok(MessageOutcome::Skipped);
            }
        };

        let target = ProbeTarget::from(&job);
        let probe = self.checker.probe(&target).await;
        debug!(
            monitor_id = job.monitor_id,
            up = probe.up,
            status_code = ?probe.status_code,
            response_time_ms = probe.response_time_ms(),
            error = ?probe.error_message,
            "探测完成"
        );

        let record = match self
            .store
            .record_probe(job.monitor_id, probe.up, &self.policy)
            .await
        {
            Ok(record) => record,
            Err(StoreError::NotFound(monitor_id)) => {
                info!(monitor_id, "监控已不存在，丢弃检测任务");
                return Ok(MessageOutcome::MonitorMissing(monitor_id));
            }
            Err(e) => return Err(e.into()),
        };

        let transition = record.transition;
        if transition.should_notify() {
            info!(
                monitor_id = record.monitor_id,
                old_status = %transition.previous.status,
                new_status = %transition.next.status,
                "监控状态变化"
            );

            let change = StatusChange::from_record(&record, Utc::now());
            // 通知失败不影响已提交的状态
            if let Err(e) = self
                .notifier
                .notify(record.webhook_url.as_deref(), &change)
                .await
            {
                warn!(monitor_id = record.monitor_id, error = %e, "状态变化通知发送失败");
            }
        }

        Ok(MessageOutcome::Recorded(record))
    }

    /// 处理一条消息并按结果确认
    async fn handle_message(&self, message: &QueueMessage) -> bool {
        match self.process_message(&message.body).await {
            Ok(outcome) if outcome.should_ack() => match self.queue.ack(&message.receipt).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "确认消息失败，消息将被重新投递");
                    false
                }
            },
            Ok(_) => false,
            Err(e) => {
                error!(error = %e, body = %message.body, "处理消息失败，保留以便重新投递");
                false
            }
        }
    }

    /// 并发处理一批消息
    ///
    /// # 返回
    /// * `usize` - 已确认的消息数
    pub async fn process_batch(&self, messages: &[QueueMessage]) -> usize {
        join_all(messages.iter().map(|message| self.handle_message(message)))
            .await
            .into_iter()
            .filter(|acked| *acked)
            .count()
    }

    /// 接收并处理一批消息
    ///
    /// # 返回
    /// * `Result<usize>` - 已确认的消息数，接收失败时返回错误
    pub async fn poll_once(&self) -> Result<usize> {
        let messages = self
            .queue
            .receive(self.config.batch_size, self.config.wait_time())
            .await?;
        Ok(self.process_batch(&messages).await)
    }

    /// 运行工作者循环，直到收到关闭信号
    ///
    /// 关闭信号只打断接收等待，正在处理的批次会完成。
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            batch_size = self.config.batch_size,
            wait_time_seconds = self.config.wait_time_seconds,
            failure_threshold = self.policy.failure_threshold,
            success_threshold = self.policy.success_threshold,
            "工作者已启动"
        );

        loop {
            let received = tokio::select! {
                _ = shutdown.recv() => break,
                received = self.queue.receive(self.config.batch_size, self.config.wait_time()) => received,
            };

            match received {
                Ok(messages) if messages.is_empty() => {}
                Ok(messages) => {
                    let acked = self.process_batch(&messages).await;
                    debug!(received = messages.len(), acked, "批次处理完成");
                }
                Err(e) => {
                    error!(error = %e, "接收消息失败，退避后重试");
                    tokio::select! {
                        _ = shutdown.recv() => break,
                        _ = sleep(self.config.error_backoff()) => {}
                    }
                }
            }
        }

        info!("工作者已停止");
    }
}
