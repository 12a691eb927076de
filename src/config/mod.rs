//! 配置管理模块
//!
//! 提供配置文件解析、环境变量配置和验证功能

pub mod loader;
pub mod types;

// 重新导出主要类型
pub use loader::{load_from_env, load_from_lookup, ConfigLoader, TomlConfigLoader};
pub use types::{
    validate_config, ApiConfig, AppConfig, DatabaseConfig, HealthConfig, NotificationConfig,
    QueueConfig, SchedulerConfig, WorkerConfig,
};
