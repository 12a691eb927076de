//! 健康检测结果数据结构
//!
//! 定义监控状态枚举和单次探测的结果类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// 监控状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MonitorStatus {
    /// 尚未达到任何阈值
    #[default]
    Unknown,
    /// 服务正常
    Up,
    /// 服务异常
    Down,
}

impl MonitorStatus {
    /// 存储中使用的文本表示
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorStatus::Unknown => "UNKNOWN",
            MonitorStatus::Up => "UP",
            MonitorStatus::Down => "DOWN",
        }
    }
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UNKNOWN" => Ok(MonitorStatus::Unknown),
            "UP" => Ok(MonitorStatus::Up),
            "DOWN" => Ok(MonitorStatus::Down),
            other => Err(format!("未知的监控状态: {other}")),
        }
    }
}

/// 单次HTTP探测的结果
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    /// 目标URL
    pub url: String,
    /// 探测是否判定为正常
    pub up: bool,
    /// HTTP状态码（收到响应时）
    pub status_code: Option<u16>,
    /// 响应时间
    pub response_time: Duration,
    /// 错误信息（如果有）
    pub error_message: Option<String>,
    /// 探测时间戳
    pub timestamp: DateTime<Utc>,
}

impl ProbeResult {
    /// 创建探测结果
    pub fn new(url: impl Into<String>, up: bool) -> Self {
        Self {
            url: url.into(),
            up,
            status_code: None,
            response_time: Duration::from_millis(0),
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    /// 设置HTTP状态码
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// 设置响应时间
    pub fn with_response_time(mut self, response_time: Duration) -> Self {
        self.response_time = response_time;
        self
    }

    /// 设置错误信息
    pub fn with_error(mut self, error_message: impl Into<String>) -> Self {
        self.error_message = Some(error_message.into());
        self
    }

    /// 获取响应时间（毫秒）
    pub fn response_time_ms(&self) -> u64 {
        self.response_time.as_millis() as u64
    }
}
