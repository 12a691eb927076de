//! Webhook 通知发送器模块
//!
//! 以 `{"text": ...}` 形式向 Slack 兼容的 incoming webhook 发送状态变化，
//! 单次尽力投递，不重试。

use crate::error::NotificationError;
use crate::notification::sender::{NotificationSender, StatusChange};
use crate::notification::template::{HandlebarsTemplate, MessageTemplate};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// 默认的webhook请求超时
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(15);

/// Webhook 通知发送器
pub struct WebhookSender {
    /// HTTP客户端
    client: Client,
    /// 消息模板
    template: Box<dyn MessageTemplate>,
}

impl WebhookSender {
    /// 创建新的webhook发送器
    ///
    /// # 参数
    /// * `timeout` - 单次请求超时
    /// * `message_template` - 自定义模板，`None` 时使用内置模板
    ///
    /// # 返回
    /// * `Result<Self, NotificationError>` - 模板无效或客户端创建失败时返回错误
    pub fn new(timeout: Duration, message_template: Option<&str>) -> Result<Self, NotificationError> {
        let template = match message_template {
            Some(source) => HandlebarsTemplate::new(source)?,
            None => HandlebarsTemplate::default(),
        };

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()
            .map_err(|e| NotificationError::SendError(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self {
            client,
            template: Box::new(template),
        })
    }

    /// 发送消息到webhook
    async fn send_to_webhook(&self, webhook_url: &str, text: String) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(webhook_url)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| NotificationError::SendError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            info!(status = status.as_u16(), "webhook 通知发送成功");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl NotificationSender for WebhookSender {
    async fn notify(
        &self,
        webhook_url: Option<&str>,
        change: &StatusChange,
    ) -> Result<(), NotificationError> {
        let webhook_url = match webhook_url.map(str::trim) {
            Some(url) if !url.is_empty() => url,
            _ => {
                debug!(monitor_id = change.monitor_id, "未配置webhook URL，跳过通知");
                return Ok(());
            }
        };

        let text = self.template.render(change)?;
        self.send_to_webhook(webhook_url, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::result::MonitorStatus;
    use chrono::Utc;
    use mockito::Matcher;

    fn change() -> StatusChange {
        StatusChange {
            monitor_id: 1,
            name: "api".to_string(),
            url: "https://api.example.com".to_string(),
            old_status: MonitorStatus::Unknown,
            new_status: MonitorStatus::Down,
            time: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_posts_text_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Regex(
                r#"\{"text":" \*API Status Changed\*\\n\*Name:\* api\\n.*\*Old:\* UNKNOWN -> \*New:\* DOWN"#
                    .to_string(),
            ))
            .with_status(200)
            .create_async()
            .await;

        let sender = WebhookSender::new(DEFAULT_WEBHOOK_TIMEOUT, None).unwrap();
        let url = format!("{}/hook", server.url());
        sender.notify(Some(&url), &change()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_webhook_is_noop() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", Matcher::Any).expect(0).create_async().await;

        let sender = WebhookSender::new(DEFAULT_WEBHOOK_TIMEOUT, None).unwrap();
        sender.notify(None, &change()).await.unwrap();
        sender.notify(Some("  "), &change()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/hook")
            .with_status(404)
            .with_body("no_service")
            .create_async()
            .await;

        let sender = WebhookSender::new(DEFAULT_WEBHOOK_TIMEOUT, None).unwrap();
        let url = format!("{}/hook", server.url());
        let err = sender.notify(Some(&url), &change()).await.unwrap_err();

        match err {
            NotificationError::Rejected { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "no_service");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_send_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let sender = WebhookSender::new(Duration::from_secs(2), None).unwrap();
        let url = format!("http://{addr}/hook");
        let err = sender.notify(Some(&url), &change()).await.unwrap_err();
        assert!(matches!(err, NotificationError::SendError(_)));
    }

    #[test]
    fn test_invalid_custom_template() {
        assert!(matches!(
            WebhookSender::new(DEFAULT_WEBHOOK_TIMEOUT, Some("{{#each}}")),
            Err(NotificationError::TemplateError(_))
        ));
    }
}
