//! 错误处理模块
//!
//! 定义应用程序的统一错误类型。循环边界上的错误通过 `is_retryable` 区分
//! 可重试的瞬时故障与终止性故障。

use thiserror::Error;

/// Uptime Vitals 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum VitalsError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 监控存储相关错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),

    /// 投递队列相关错误
    #[error("队列错误: {0}")]
    Queue(#[from] QueueError),

    /// 通知相关错误
    #[error("通知错误: {0}")]
    Notification(#[from] NotificationError),

    /// HTTP客户端错误
    #[error("HTTP客户端错误: {0}")]
    Http(#[from] reqwest::Error),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),
}

impl VitalsError {
    /// 是否为可重试的瞬时错误
    pub fn is_retryable(&self) -> bool {
        match self {
            VitalsError::Config(_) => false,
            VitalsError::Store(e) => e.is_retryable(),
            VitalsError::Queue(_) => true,
            VitalsError::Notification(_) => false,
            VitalsError::Http(_) => true,
            VitalsError::Io(_) => true,
            VitalsError::Json(_) => false,
        }
    }
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },

    /// 缺少必需的配置项
    #[error("缺少必需的配置项: {0}")]
    MissingSetting(String),
}

/// 监控存储错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    /// 监控记录不存在（例如派发后被删除）
    #[error("监控不存在: id={0}")]
    NotFound(i64),

    /// 数据库错误
    #[error("数据库操作失败: {0}")]
    Database(#[from] sqlx::Error),

    /// 存储中的数据无法解释
    #[error("存储数据无效: {0}")]
    InvalidData(String),
}

impl StoreError {
    /// 是否为可重试的瞬时错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Database(_))
    }
}

/// 投递队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// 发送消息失败
    #[error("发送消息失败: {0}")]
    Send(String),

    /// 接收消息失败
    #[error("接收消息失败: {0}")]
    Receive(String),

    /// 确认（删除）消息失败
    #[error("确认消息失败: {0}")]
    Ack(String),
}

/// 检测任务解析错误类型
#[derive(Error, Debug)]
pub enum JobError {
    /// 消息体不是合法的JSON
    #[error("消息体不是合法的JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// 缺少必需字段
    #[error("缺少必需字段: {0}")]
    MissingField(&'static str),
}

/// 通知错误类型
#[derive(Error, Debug)]
pub enum NotificationError {
    /// 发送失败
    #[error("通知发送失败: {0}")]
    SendError(String),

    /// webhook 返回非2xx状态码
    #[error("webhook 返回非成功状态码: {status}")]
    Rejected { status: u16, body: String },

    /// 模板渲染错误
    #[error("模板渲染失败: {0}")]
    TemplateError(String),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, VitalsError>;
