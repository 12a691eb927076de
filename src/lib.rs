//! Uptime Vitals - 队列驱动的HTTP可用性监控
//!
//! 调度器按检测间隔把到期的监控投递到消息队列，工作者消费队列、
//! 执行HTTP探测并以迟滞阈值更新监控状态，状态翻转时发送webhook通知。
//! 控制面API负责监控的增删改查。

pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod queue;
pub mod shutdown;
pub mod store;
pub mod web;

// 重新导出主要类型
pub use config::AppConfig;
pub use error::{Result, VitalsError};
pub use health::{HealthChecker, HealthPolicy, HealthState, MonitorStatus, ProbeResult};
pub use monitor::{CheckJob, Monitor, MonitorId, MonitorInput};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
