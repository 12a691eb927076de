//! 配置加载器实现
//!
//! 提供TOML配置文件解析、环境变量替换、纯环境变量配置和错误处理功能

use crate::config::types::{validate_config, AppConfig};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::str::FromStr;

/// 配置加载器trait，定义配置加载接口
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<AppConfig>` - 加载的配置或错误
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<AppConfig>;

    /// 从字符串加载配置
    ///
    /// # 参数
    /// * `content` - 配置文件内容
    ///
    /// # 返回
    /// * `Result<AppConfig>` - 加载的配置或错误
    async fn load_from_string(&self, content: &str) -> Result<AppConfig>;

    /// 验证配置
    fn validate(&self, config: &AppConfig) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }
}

/// TOML配置加载器实现
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl TomlConfigLoader {
    /// 创建新的TOML配置加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用 `${VAR}` 环境变量替换
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 替换字符串中的环境变量
    ///
    /// # 参数
    /// * `content` - 要处理的字符串
    ///
    /// # 返回
    /// * `Result<String>` - 替换后的字符串，变量未设置时返回错误
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        // 匹配 ${VAR_NAME} 格式的环境变量
        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {}", e)))?;

        let mut result = content.to_string();

        for captures in env_var_regex.captures_iter(content) {
            let full_match = &captures[0];
            let var_name = &captures[1];

            match std::env::var(var_name) {
                Ok(value) => {
                    result = result.replace(full_match, &value);
                }
                Err(_) => {
                    return Err(ConfigError::EnvVarError {
                        var: var_name.to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(result)
    }

    /// 解析TOML内容
    fn parse_toml(&self, content: &str) -> Result<AppConfig> {
        let processed_content = self.substitute_env_vars(content)?;

        let config: AppConfig = toml::from_str(&processed_content)
            .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {}", e)))?;

        Ok(config)
    }
}

impl Default for TomlConfigLoader {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<AppConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ParseError(format!("读取文件失败: {}", e)))?;

        let config = self.parse_toml(&content)?;
        self.validate(&config)?;

        log::info!("成功加载配置文件: {}", path.display());

        Ok(config)
    }

    async fn load_from_string(&self, content: &str) -> Result<AppConfig> {
        let config = self.parse_toml(content)?;
        self.validate(&config)?;

        log::debug!("成功解析配置字符串");

        Ok(config)
    }
}

/// 从进程环境变量构建配置
pub fn load_from_env() -> Result<AppConfig> {
    load_from_lookup(|key| std::env::var(key).ok())
}

/// 从任意键值来源构建配置
///
/// # 参数
/// * `lookup` - 按变量名查询取值，未设置时返回 `None`
///
/// # 返回
/// * `Result<AppConfig>` - 通过验证的配置，缺少 `DATABASE_URL` 或数值无法解析时返回错误
pub fn load_from_lookup<F>(lookup: F) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = AppConfig::default();

    config.database.url = lookup("DATABASE_URL")
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingSetting("DATABASE_URL".to_string()))?;

    config.queue.url = lookup("SQS_QUEUE_URL").filter(|url| !url.trim().is_empty());
    if let Some(region) = lookup("AWS_REGION") {
        config.queue.region = region;
    }
    config.queue.endpoint_url = lookup("SQS_ENDPOINT_URL").filter(|url| !url.trim().is_empty());

    if let Some(value) = parse_var(&lookup, "FAIL_THRESHOLD")? {
        config.health.failure_threshold = value;
    }
    if let Some(value) = parse_var(&lookup, "SUCCESS_THRESHOLD")? {
        config.health.success_threshold = value;
    }
    if let Some(value) = parse_var(&lookup, "SCHEDULER_TICK_SECONDS")? {
        config.scheduler.tick_interval_seconds = value;
    }
    if let Some(value) = parse_var(&lookup, "WORKER_BATCH_SIZE")? {
        config.worker.batch_size = value;
    }
    if let Some(value) = parse_var(&lookup, "WORKER_WAIT_SECONDS")? {
        config.worker.wait_time_seconds = value;
    }
    if let Some(address) = lookup("API_BIND_ADDRESS") {
        config.api.bind_address = address;
    }

    validate_config(&config).map_err(ConfigError::ValidationError)?;
    log::debug!("成功从环境变量构建配置");

    Ok(config)
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            ConfigError::ParseError(format!("环境变量 {} 的值 {:?} 无效: {}", key, raw, e)).into()
        }),
    }
}

impl AppConfig {
    /// 获取队列URL，调度器与工作者启动时调用
    pub fn require_queue_url(&self) -> Result<&str> {
        self.queue
            .url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingSetting("SQS_QUEUE_URL / [queue] url".to_string()).into())
    }
}
