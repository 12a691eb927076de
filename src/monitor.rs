//! 监控数据模型
//!
//! 定义持久化的监控记录、控制面提交的监控配置，以及调度器与工作者之间
//! 通过队列传递的检测任务。

use crate::error::JobError;
use crate::health::result::MonitorStatus;
use crate::health::state::HealthState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 监控ID类型
pub type MonitorId = i64;

/// 未指定时的探测超时（秒）
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 5;
/// 未指定时的期望状态码
pub const DEFAULT_EXPECTED_STATUS_CODE: u16 = 200;
/// 未指定时的检测间隔（秒）
pub const DEFAULT_CHECK_INTERVAL_SECONDS: u64 = 60;

/// 持久化的监控记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    /// 监控ID
    pub id: MonitorId,
    /// 监控名称
    pub name: String,
    /// 探测URL
    pub url: String,
    /// 检测间隔（秒）
    pub check_interval: u64,
    /// 探测超时（秒）
    pub timeout: u64,
    /// 期望的HTTP状态码
    pub expected_status_code: u16,
    /// 状态变化通知的webhook URL
    pub webhook_url: Option<String>,
    /// 是否启用
    pub enabled: bool,
    /// 当前状态
    pub status: MonitorStatus,
    /// 连续失败次数
    pub consecutive_failures: u32,
    /// 连续成功次数
    pub consecutive_successes: u32,
    /// 最后一次派发检测的时间
    pub last_checked_at: Option<DateTime<Utc>>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl Monitor {
    /// 判断在 `now` 时刻是否需要派发检测
    ///
    /// `check_interval` 为 0 时总是到期。
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        match self.last_checked_at {
            None => true,
            Some(last) => {
                let elapsed = (now - last).num_milliseconds() as f64 / 1000.0;
                elapsed >= self.check_interval as f64
            }
        }
    }

    /// 当前持久化的健康状态
    pub fn health_state(&self) -> HealthState {
        HealthState::new(
            self.status,
            self.consecutive_failures,
            self.consecutive_successes,
        )
    }

    /// 写回新的健康状态
    pub fn set_health_state(&mut self, state: HealthState) {
        self.status = state.status;
        self.consecutive_failures = state.consecutive_failures;
        self.consecutive_successes = state.consecutive_successes;
    }
}

/// 控制面提交的监控配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorInput {
    /// 监控名称
    pub name: String,
    /// 探测URL
    pub url: String,
    /// 检测间隔（秒）
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
    /// 探测超时（秒）
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// 期望的HTTP状态码
    #[serde(default = "default_expected_status_code")]
    pub expected_status_code: u16,
    /// 通知webhook URL
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// 是否启用
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECONDS
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}
fn default_expected_status_code() -> u16 {
    DEFAULT_EXPECTED_STATUS_CODE
}
fn default_enabled() -> bool {
    true
}

impl MonitorInput {
    /// 验证监控配置
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("监控名称不能为空".to_string());
        }

        let url = reqwest::Url::parse(&self.url).map_err(|e| format!("无效的URL {}: {}", self.url, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("URL 必须使用 http 或 https 协议: {}", self.url));
        }
        if url.host_str().is_none() {
            return Err(format!("URL 缺少主机名: {}", self.url));
        }

        // 存储列为 INTEGER
        let column_max = i32::MAX as u64;
        if self.check_interval > column_max {
            return Err(format!("检测间隔超出范围: {}", self.check_interval));
        }
        if self.timeout > column_max {
            return Err(format!("探测超时超出范围: {}", self.timeout));
        }

        if !(100..=599).contains(&self.expected_status_code) {
            return Err(format!("无效的期望状态码: {}", self.expected_status_code));
        }

        Ok(())
    }

    /// 以初始健康状态创建监控记录
    pub fn into_monitor(self, id: MonitorId, created_at: DateTime<Utc>) -> Monitor {
        Monitor {
            id,
            name: self.name,
            url: self.url,
            check_interval: self.check_interval,
            timeout: self.timeout,
            expected_status_code: self.expected_status_code,
            webhook_url: self.webhook_url,
            enabled: self.enabled,
            status: MonitorStatus::Unknown,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_checked_at: None,
            created_at,
        }
    }
}

/// 调度器发布到队列的检测任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckJob {
    /// 监控ID
    pub monitor_id: MonitorId,
    /// 探测URL
    pub url: String,
    /// 探测超时（秒）
    pub timeout: u64,
    /// 期望的HTTP状态码
    pub expected_status_code: u16,
    /// 通知webhook URL
    pub webhook_url: Option<String>,
    /// 发布时间
    pub sent_at: DateTime<Utc>,
}

/// 宽松的消息体结构，用于区分缺失字段与格式错误
#[derive(Debug, Deserialize)]
struct RawCheckJob {
    monitor_id: Option<MonitorId>,
    url: Option<String>,
    timeout: Option<u64>,
    expected_status_code: Option<u16>,
    webhook_url: Option<String>,
    sent_at: Option<DateTime<Utc>>,
}

impl CheckJob {
    /// 为到期的监控构造检测任务
    pub fn for_monitor(monitor: &Monitor, sent_at: DateTime<Utc>) -> Self {
        Self {
            monitor_id: monitor.id,
            url: monitor.url.clone(),
            timeout: monitor.timeout,
            expected_status_code: monitor.expected_status_code,
            webhook_url: monitor.webhook_url.clone(),
            sent_at,
        }
    }

    /// 序列化为队列消息体
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// 解析队列消息体
    ///
    /// `monitor_id` 和非空的 `url` 为必需字段；`timeout` 缺省为 5 秒，
    /// `expected_status_code` 缺省为 200。
    pub fn parse(body: &str) -> Result<Self, JobError> {
        let raw: RawCheckJob = serde_json::from_str(body)?;

        let monitor_id = raw.monitor_id.ok_or(JobError::MissingField("monitor_id"))?;
        let url = raw
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or(JobError::MissingField("url"))?;

        Ok(Self {
            monitor_id,
            url,
            timeout: raw.timeout.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            expected_status_code: raw
                .expected_status_code
                .unwrap_or(DEFAULT_EXPECTED_STATUS_CODE),
            webhook_url: raw.webhook_url,
            sent_at: raw.sent_at.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample_monitor() -> Monitor {
        MonitorInput {
            name: "api".to_string(),
            url: "https://example.com/health".to_string(),
            check_interval: 60,
            timeout: 5,
            expected_status_code: 200,
            webhook_url: Some("https://hooks.example.com/T000".to_string()),
            enabled: true,
        }
        .into_monitor(1, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_new_monitor_starts_unknown() {
        let monitor = sample_monitor();
        assert_eq!(monitor.status, MonitorStatus::Unknown);
        assert_eq!(monitor.consecutive_failures, 0);
        assert_eq!(monitor.consecutive_successes, 0);
        assert!(monitor.last_checked_at.is_none());
    }

    #[test]
    fn test_is_due() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut monitor = sample_monitor();
        assert!(monitor.is_due(now));

        monitor.last_checked_at = Some(now - Duration::seconds(59));
        assert!(!monitor.is_due(now));

        monitor.last_checked_at = Some(now - Duration::seconds(60));
        assert!(monitor.is_due(now));

        monitor.enabled = false;
        assert!(!monitor.is_due(now));
    }

    #[test]
    fn test_zero_interval_is_always_due() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut monitor = sample_monitor();
        monitor.check_interval = 0;
        monitor.last_checked_at = Some(now);
        assert!(monitor.is_due(now));
    }

    #[test]
    fn test_check_job_wire_format() {
        let sent_at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let job = CheckJob::for_monitor(&sample_monitor(), sent_at);
        let value: serde_json::Value = serde_json::from_str(&job.to_json().unwrap()).unwrap();

        assert_eq!(value["monitor_id"], 1);
        assert_eq!(value["url"], "https://example.com/health");
        assert_eq!(value["timeout"], 5);
        assert_eq!(value["expected_status_code"], 200);
        assert_eq!(value["webhook_url"], "https://hooks.example.com/T000");
        assert_eq!(value["sent_at"], "2024-01-01T12:00:00Z");
    }

    #[test]
    fn test_parse_applies_defaults() {
        let job = CheckJob::parse(r#"{"monitor_id": 9, "url": "http://svc/health"}"#).unwrap();
        assert_eq!(job.monitor_id, 9);
        assert_eq!(job.timeout, DEFAULT_TIMEOUT_SECONDS);
        assert_eq!(job.expected_status_code, DEFAULT_EXPECTED_STATUS_CODE);
        assert!(job.webhook_url.is_none());
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        assert!(matches!(
            CheckJob::parse(r#"{"url": "http://svc"}"#),
            Err(JobError::MissingField("monitor_id"))
        ));
        assert!(matches!(
            CheckJob::parse(r#"{"monitor_id": 3, "url": ""}"#),
            Err(JobError::MissingField("url"))
        ));
        assert!(matches!(
            CheckJob::parse("not json"),
            Err(JobError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_monitor_input_validation() {
        let mut input = MonitorInput {
            name: "api".to_string(),
            url: "ftp://example.com".to_string(),
            check_interval: 60,
            timeout: 5,
            expected_status_code: 200,
            webhook_url: None,
            enabled: true,
        };
        assert!(input.validate().is_err());

        input.url = "not a url".to_string();
        assert!(input.validate().is_err());

        input.url = "https://example.com".to_string();
        assert!(input.validate().is_ok());

        input.expected_status_code = 42;
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_monitor_input_rejects_oversized_intervals() {
        let mut input = MonitorInput {
            name: "api".to_string(),
            url: "https://example.com".to_string(),
            check_interval: i32::MAX as u64,
            timeout: 5,
            expected_status_code: 200,
            webhook_url: None,
            enabled: true,
        };
        assert!(input.validate().is_ok());

        input.check_interval = i32::MAX as u64 + 1;
        assert!(input.validate().unwrap_err().contains("检测间隔"));

        input.check_interval = 60;
        input.timeout = u64::MAX;
        assert!(input.validate().unwrap_err().contains("探测超时"));
    }

    #[test]
    fn test_monitor_input_defaults() {
        let input: MonitorInput =
            serde_json::from_str(r#"{"name": "api", "url": "https://example.com"}"#).unwrap();
        assert_eq!(input.check_interval, 60);
        assert_eq!(input.timeout, 5);
        assert_eq!(input.expected_status_code, 200);
        assert!(input.enabled);
    }
}
