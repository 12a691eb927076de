//! HTTP健康检测器实现
//!
//! 对检测任务中的URL发起一次GET请求。响应状态码等于期望值时判定为正常，
//! 网络错误、超时或状态码不匹配均判定为异常。探测内部不做重试，重试由队列
//! 重新投递完成。

use crate::error::Result;
use crate::health::result::ProbeResult;
use crate::monitor::CheckJob;
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// 探测目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    /// 目标URL
    pub url: String,
    /// 超时时间
    pub timeout: Duration,
    /// 期望的HTTP状态码
    pub expected_status_code: u16,
}

impl From<&CheckJob> for ProbeTarget {
    fn from(job: &CheckJob) -> Self {
        Self {
            url: job.url.clone(),
            timeout: Duration::from_secs(job.timeout),
            expected_status_code: job.expected_status_code,
        }
    }
}

/// 健康检测器trait，定义探测接口
#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// 执行一次探测
    ///
    /// # 参数
    /// * `target` - 探测目标
    ///
    /// # 返回
    /// * `ProbeResult` - 探测结果，失败同样以结果而非错误的形式返回
    async fn probe(&self, target: &ProbeTarget) -> ProbeResult;
}

/// HTTP健康检测器实现
pub struct HttpHealthChecker {
    /// HTTP客户端
    client: Client,
}

impl HttpHealthChecker {
    /// 创建新的HTTP健康检测器
    ///
    /// 超时按每次探测单独设置，客户端本身不设全局超时。
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()?;

        Ok(Self { client })
    }

    /// 验证响应状态码
    fn validate_status_code(status_code: u16, expected: u16) -> bool {
        status_code == expected
    }

    /// 处理收到的HTTP响应
    fn process_response(
        target: &ProbeTarget,
        response: Response,
        response_time: Duration,
    ) -> ProbeResult {
        let status_code = response.status().as_u16();
        let up = Self::validate_status_code(status_code, target.expected_status_code);

        let result = ProbeResult::new(target.url.clone(), up)
            .with_status_code(status_code)
            .with_response_time(response_time);

        if up {
            result
        } else {
            result.with_error(format!(
                "HTTP {} {}，期望 {}",
                status_code,
                response.status().canonical_reason().unwrap_or("Unknown"),
                target.expected_status_code
            ))
        }
    }

    /// 格式化请求错误信息，使其更加清晰易读
    fn format_request_error(error: &reqwest::Error) -> String {
        if error.is_timeout() {
            "Request timeout".to_string()
        } else if error.is_connect() {
            "Connection refused".to_string()
        } else if error.is_builder() || error.is_request() {
            "Invalid request".to_string()
        } else if error.is_decode() {
            "Response decode error".to_string()
        } else {
            let error_str = error.to_string();
            if error_str.contains("dns") || error_str.contains("DNS") {
                "DNS resolution failed".to_string()
            } else if error_str.contains("certificate")
                || error_str.contains("tls")
                || error_str.contains("ssl")
            {
                "SSL/TLS certificate error".to_string()
            } else {
                format!("Request failed: {}", error_str)
            }
        }
    }
}

#[async_trait]
impl HealthChecker for HttpHealthChecker {
    async fn probe(&self, target: &ProbeTarget) -> ProbeResult {
        let start_time = Instant::now();

        let request = self.client.get(&target.url).timeout(target.timeout);
        let response_result = timeout(target.timeout, request.send()).await;

        let response_time = start_time.elapsed();

        match response_result {
            Ok(Ok(response)) => Self::process_response(target, response, response_time),
            Ok(Err(e)) => ProbeResult::new(target.url.clone(), false)
                .with_response_time(response_time)
                .with_error(Self::format_request_error(&e)),
            Err(_) => ProbeResult::new(target.url.clone(), false)
                .with_response_time(response_time)
                .with_error("Request timeout"),
        }
    }
}
