//! 内存队列实现
//!
//! 模拟可见性超时语义：被接收的消息在超时前不可见，未确认的消息超时后
//! 重新投递，并换发新的确认凭据，旧凭据随之失效。

use crate::error::QueueError;
use crate::queue::{DeliveryQueue, QueueMessage};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use uuid::Uuid;

/// 队列中的一条消息
#[derive(Debug)]
struct Entry {
    /// 消息体
    body: String,
    /// 当前投递的确认凭据
    receipt: Option<String>,
    /// 不可见截止时间
    invisible_until: Option<Instant>,
    /// 已投递次数
    receive_count: u32,
}

/// 内存投递队列
#[derive(Debug)]
pub struct InMemoryQueue {
    /// 消息列表
    entries: Mutex<Vec<Entry>>,
    /// 新消息到达通知
    arrivals: Notify,
    /// 可见性超时
    visibility_timeout: Duration,
}

impl InMemoryQueue {
    /// 创建内存队列
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            arrivals: Notify::new(),
            visibility_timeout,
        }
    }

    /// 队列中尚未确认的消息总数（含不可见的）
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// 队列是否为空
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// 当前可见的消息数
    pub async fn visible_len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .iter()
            .filter(|entry| entry.invisible_until.is_none_or(|until| until <= now))
            .count()
    }

    /// 所有未确认消息的消息体
    pub async fn bodies(&self) -> Vec<String> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|entry| entry.body.clone())
            .collect()
    }

    /// 各消息的投递次数
    pub async fn receive_counts(&self) -> Vec<u32> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|entry| entry.receive_count)
            .collect()
    }

    /// 取出当前可见的消息并使其不可见
    async fn take_visible(&self, max_messages: usize) -> Vec<QueueMessage> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let mut batch = Vec::new();

        for entry in entries.iter_mut() {
            if batch.len() >= max_messages {
                break;
            }
            if entry.invisible_until.is_some_and(|until| until > now) {
                continue;
            }
            let receipt = Uuid::new_v4().to_string();
            entry.receipt = Some(receipt.clone());
            entry.invisible_until = Some(now + self.visibility_timeout);
            entry.receive_count += 1;
            batch.push(QueueMessage {
                body: entry.body.clone(),
                receipt,
            });
        }

        batch
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl DeliveryQueue for InMemoryQueue {
    async fn send(&self, body: String) -> Result<(), QueueError> {
        self.entries.lock().await.push(Entry {
            body,
            receipt: None,
            invisible_until: None,
            receive_count: 0,
        });
        self.arrivals.notify_waiters();
        Ok(())
    }

    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let deadline = Instant::now() + wait;
        loop {
            let arrived = self.arrivals.notified();
            let batch = self.take_visible(max_messages.max(1)).await;
            if !batch.is_empty() {
                return Ok(batch);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            // 新消息到达或有消息重新可见时再次尝试
            let retry_in = (deadline - now).min(Duration::from_millis(50));
            let _ = tokio::time::timeout(retry_in, arrived).await;
        }
    }

    async fn ack(&self, receipt: &str) -> Result<(), QueueError> {
        let mut entries = self.entries.lock().await;
        match entries
            .iter()
            .position(|entry| entry.receipt.as_deref() == Some(receipt))
        {
            Some(index) => {
                entries.remove(index);
                Ok(())
            }
            None => Err(QueueError::Ack(format!("确认凭据无效或已过期: {receipt}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_receive_ack() {
        let queue = InMemoryQueue::new(Duration::from_secs(30));
        queue.send("a".to_string()).await.unwrap();
        queue.send("b".to_string()).await.unwrap();

        let batch = queue.receive(5, Duration::ZERO).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(queue.visible_len().await, 0);

        for message in &batch {
            queue.ack(&message.receipt).await.unwrap();
        }
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_batch_size_is_bounded() {
        let queue = InMemoryQueue::default();
        for i in 0..7 {
            queue.send(format!("m{i}")).await.unwrap();
        }

        let batch = queue.receive(5, Duration::ZERO).await.unwrap();
        assert_eq!(batch.len(), 5);
        let rest = queue.receive(5, Duration::ZERO).await.unwrap();
        assert_eq!(rest.len(), 2);
    }

    #[tokio::test]
    async fn test_unacked_message_is_redelivered_after_visibility_timeout() {
        let queue = InMemoryQueue::new(Duration::from_millis(50));
        queue.send("poison".to_string()).await.unwrap();

        let first = queue.receive(1, Duration::ZERO).await.unwrap();
        assert_eq!(first.len(), 1);
        assert!(queue.receive(1, Duration::ZERO).await.unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(80)).await;
        let second = queue.receive(1, Duration::ZERO).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].body, "poison");
        assert_ne!(second[0].receipt, first[0].receipt);
        assert_eq!(queue.receive_counts().await, vec![2]);

        // 旧凭据不能删除重新投递的消息
        assert!(queue.ack(&first[0].receipt).await.is_err());
        queue.ack(&second[0].receipt).await.unwrap();
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_receive_waits_for_arrival() {
        let queue = std::sync::Arc::new(InMemoryQueue::default());
        let producer = std::sync::Arc::clone(&queue);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            producer.send("late".to_string()).await.unwrap();
        });

        let batch = queue.receive(5, Duration::from_secs(2)).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].body, "late");
    }

    #[tokio::test]
    async fn test_receive_returns_empty_after_wait() {
        let queue = InMemoryQueue::default();
        let batch = queue.receive(5, Duration::from_millis(20)).await.unwrap();
        assert!(batch.is_empty());
    }
}
