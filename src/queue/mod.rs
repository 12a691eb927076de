//! 投递队列模块
//!
//! 定义调度器与工作者依赖的至少一次投递队列接口。实现必须满足：
//! - `send` 持久化且至少投递一次
//! - `receive` 返回零条或多条消息，每条携带不透明的确认凭据
//! - `ack` 永久删除消息；未确认的消息在可见性超时后重新可见
//! - 消息之间没有顺序保证

pub mod memory;
pub mod sqs;

use crate::error::QueueError;
use async_trait::async_trait;
use std::time::Duration;

pub use memory::InMemoryQueue;
pub use sqs::SqsQueue;

/// 从队列收到的一条消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// 消息体
    pub body: String,
    /// 确认凭据，每次投递都可能不同
    pub receipt: String,
}

/// 投递队列trait
#[async_trait]
pub trait DeliveryQueue: Send + Sync {
    /// 发送一条消息
    async fn send(&self, body: String) -> Result<(), QueueError>;

    /// 接收一批消息
    ///
    /// # 参数
    /// * `max_messages` - 单批最多返回的消息数
    /// * `wait` - 没有可见消息时的最长等待时间
    async fn receive(&self, max_messages: usize, wait: Duration)
        -> Result<Vec<QueueMessage>, QueueError>;

    /// 确认并删除消息
    async fn ack(&self, receipt: &str) -> Result<(), QueueError>;
}
