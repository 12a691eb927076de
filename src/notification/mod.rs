//! 通知模块
//!
//! 提供状态变化的 webhook 通知和消息模板功能

pub mod sender;
pub mod template;
pub mod webhook;

// 重新导出主要类型
pub use sender::{NotificationSender, StatusChange};
pub use template::{HandlebarsTemplate, MessageTemplate, DEFAULT_STATUS_CHANGE_TEMPLATE};
pub use webhook::{WebhookSender, DEFAULT_WEBHOOK_TIMEOUT};
