//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use crate::health::state::HealthPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,
    /// 投递队列配置
    #[serde(default)]
    pub queue: QueueConfig,
    /// 调度器配置
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// 工作者配置
    #[serde(default)]
    pub worker: WorkerConfig,
    /// 健康状态阈值
    #[serde(default)]
    pub health: HealthConfig,
    /// 通知配置
    #[serde(default)]
    pub notification: NotificationConfig,
    /// 控制面API配置
    #[serde(default)]
    pub api: ApiConfig,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// 连接URL
    #[serde(default)]
    pub url: String,
    /// 连接池最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// 获取连接的超时时间（秒）
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

/// 投递队列配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueConfig {
    /// 队列URL，调度器与工作者必需
    pub url: Option<String>,
    /// AWS 区域
    #[serde(default = "default_region")]
    pub region: String,
    /// 自定义端点
    pub endpoint_url: Option<String>,
}

/// 调度器配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfig {
    /// 调度间隔（秒）
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,
    /// 出错后的退避时间（秒）
    #[serde(default = "default_scheduler_backoff")]
    pub error_backoff_seconds: u64,
}

/// 工作者配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerConfig {
    /// 单次接收的消息数
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// 长轮询等待时间（秒）
    #[serde(default = "default_wait_time")]
    pub wait_time_seconds: u64,
    /// 出错后的退避时间（秒）
    #[serde(default = "default_worker_backoff")]
    pub error_backoff_seconds: u64,
}

/// 健康状态阈值配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthConfig {
    /// 判定为DOWN所需的连续失败次数
    #[serde(default = "default_threshold")]
    pub failure_threshold: u32,
    /// 判定为UP所需的连续成功次数
    #[serde(default = "default_threshold")]
    pub success_threshold: u32,
}

/// 通知配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationConfig {
    /// webhook 请求超时（秒）
    #[serde(default = "default_notification_timeout")]
    pub timeout_seconds: u64,
    /// 自定义消息模板（Handlebars）
    pub message_template: Option<String>,
}

/// 控制面API配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// 监听地址
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

// 默认值函数
fn default_max_connections() -> u32 {
    5
}
fn default_acquire_timeout() -> u64 {
    5
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_tick_interval() -> u64 {
    10
}
fn default_scheduler_backoff() -> u64 {
    5
}
fn default_batch_size() -> usize {
    5
}
fn default_wait_time() -> u64 {
    10
}
fn default_worker_backoff() -> u64 {
    2
}
fn default_threshold() -> u32 {
    2
}
fn default_notification_timeout() -> u64 {
    15
}
fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            acquire_timeout_seconds: default_acquire_timeout(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: None,
            region: default_region(),
            endpoint_url: None,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval(),
            error_backoff_seconds: default_scheduler_backoff(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            wait_time_seconds: default_wait_time(),
            error_backoff_seconds: default_worker_backoff(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_threshold(),
            success_threshold: default_threshold(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_notification_timeout(),
            message_template: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl DatabaseConfig {
    /// 获取连接的超时时间
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

impl SchedulerConfig {
    /// 调度间隔
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_seconds)
    }

    /// 出错退避时间
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_seconds)
    }
}

impl WorkerConfig {
    /// 长轮询等待时间
    pub fn wait_time(&self) -> Duration {
        Duration::from_secs(self.wait_time_seconds)
    }

    /// 出错退避时间
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_seconds)
    }
}

impl HealthConfig {
    /// 转换为状态机使用的阈值策略
    pub fn policy(&self) -> HealthPolicy {
        HealthPolicy {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
        }
    }
}

impl NotificationConfig {
    /// webhook 请求超时
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &AppConfig) -> Result<(), String> {
    if config.database.url.trim().is_empty() {
        return Err("数据库URL不能为空".to_string());
    }

    if config.database.max_connections == 0 {
        return Err("数据库最大连接数不能为0".to_string());
    }

    if config.database.acquire_timeout_seconds == 0 {
        return Err("数据库连接获取超时不能为0".to_string());
    }

    if let Some(url) = &config.queue.url {
        if url.trim().is_empty() {
            return Err("队列URL不能为空字符串".to_string());
        }
    }

    if config.queue.region.trim().is_empty() {
        return Err("AWS区域不能为空".to_string());
    }

    if config.scheduler.tick_interval_seconds == 0 {
        return Err("调度间隔不能为0".to_string());
    }

    if !(1..=10).contains(&config.worker.batch_size) {
        return Err(format!(
            "无效的批量大小: {}，取值范围为 1..=10",
            config.worker.batch_size
        ));
    }

    if config.worker.wait_time_seconds > 20 {
        return Err(format!(
            "长轮询等待时间不能超过20秒: {}",
            config.worker.wait_time_seconds
        ));
    }

    if config.health.failure_threshold == 0 {
        return Err("失败阈值不能为0".to_string());
    }

    if config.health.success_threshold == 0 {
        return Err("成功阈值不能为0".to_string());
    }

    if config.notification.timeout_seconds == 0 {
        return Err("通知超时时间不能为0".to_string());
    }

    if config.api.bind_address.trim().is_empty() {
        return Err("API绑定地址不能为空".to_string());
    }

    Ok(())
}
