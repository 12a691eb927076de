//! AWS SQS 队列实现

use crate::error::QueueError;
use crate::queue::{DeliveryQueue, QueueMessage};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// SQS 单次接收的消息数上限
pub const SQS_MAX_BATCH: usize = 10;
/// SQS 长轮询等待时间上限（秒）
pub const SQS_MAX_WAIT_SECONDS: u64 = 20;

/// 基于 AWS SQS 的投递队列
#[derive(Clone)]
pub struct SqsQueue {
    /// SQS 客户端
    client: Client,
    /// 队列 URL
    queue_url: String,
}

impl SqsQueue {
    /// 使用默认凭据链连接 SQS
    ///
    /// # 参数
    /// * `queue_url` - 队列 URL
    /// * `region` - AWS 区域
    /// * `endpoint_url` - 自定义端点（可选，用于兼容 SQS 的本地服务）
    pub async fn connect(queue_url: String, region: String, endpoint_url: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region));
        if let Some(endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        Self {
            client: Client::new(&sdk_config),
            queue_url,
        }
    }

    /// 队列 URL
    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl DeliveryQueue for SqsQueue {
    async fn send(&self, body: String) -> Result<(), QueueError> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| QueueError::Send(DisplayErrorContext(&e).to_string()))?;

        debug!(message_id = ?output.message_id(), "SQS 消息已发送");
        Ok(())
    }

    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let max_messages = max_messages.clamp(1, SQS_MAX_BATCH) as i32;
        let wait_seconds = wait.as_secs().min(SQS_MAX_WAIT_SECONDS) as i32;

        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_seconds)
            .send()
            .await
            .map_err(|e| QueueError::Receive(DisplayErrorContext(&e).to_string()))?;

        let mut messages = Vec::new();
        for message in output.messages() {
            match (message.body(), message.receipt_handle()) {
                (Some(body), Some(receipt)) => messages.push(QueueMessage {
                    body: body.to_string(),
                    receipt: receipt.to_string(),
                }),
                _ => warn!(
                    message_id = ?message.message_id(),
                    "SQS 消息缺少消息体或确认凭据，已忽略"
                ),
            }
        }

        Ok(messages)
    }

    async fn ack(&self, receipt: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt)
            .send()
            .await
            .map_err(|e| QueueError::Ack(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}
