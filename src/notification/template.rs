//! 消息模板模块
//!
//! 使用 Handlebars 渲染状态变化通知

use crate::error::NotificationError;
use crate::notification::sender::StatusChange;
use handlebars::Handlebars;

/// 模板在注册表中的名称
const TEMPLATE_NAME: &str = "status_change";

/// 默认的状态变化消息模板（Slack 兼容的 mrkdwn）
pub const DEFAULT_STATUS_CHANGE_TEMPLATE: &str = " *API Status Changed*
*Name:* {{name}}
*URL:* {{url}}
*Old:* {{old_status}} -> *New:* {{new_status}}
*Time:* {{time}}";

/// 消息模板trait
pub trait MessageTemplate: Send + Sync {
    /// 渲染模板
    ///
    /// # 参数
    /// * `change` - 状态变化
    ///
    /// # 返回
    /// * `Result<String, NotificationError>` - 渲染后的消息
    fn render(&self, change: &StatusChange) -> Result<String, NotificationError>;
}

/// Handlebars模板
#[derive(Debug)]
pub struct HandlebarsTemplate {
    registry: Handlebars<'static>,
}

impl HandlebarsTemplate {
    /// 编译模板
    ///
    /// 可用变量：`monitor_id`、`name`、`url`、`old_status`、`new_status`、`time`。
    ///
    /// # 参数
    /// * `template` - 模板字符串
    ///
    /// # 返回
    /// * `Result<Self, NotificationError>` - 语法错误时返回 `TemplateError`
    pub fn new(template: &str) -> Result<Self, NotificationError> {
        let mut registry = Handlebars::new();
        // 输出是纯文本，不做HTML转义
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| NotificationError::TemplateError(e.to_string()))?;

        Ok(Self { registry })
    }
}

impl Default for HandlebarsTemplate {
    fn default() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        // 内置模板是常量，注册失败只会在开发期出现
        if let Err(e) = registry.register_template_string(TEMPLATE_NAME, DEFAULT_STATUS_CHANGE_TEMPLATE)
        {
            tracing::error!("内置通知模板无效: {}", e);
        }
        Self { registry }
    }
}

impl MessageTemplate for HandlebarsTemplate {
    fn render(&self, change: &StatusChange) -> Result<String, NotificationError> {
        self.registry
            .render(TEMPLATE_NAME, change)
            .map_err(|e| NotificationError::TemplateError(e.to_string()))
    }
}
