//! PostgreSQL 存储实现
//!
//! `record_probe` 在事务内用 `SELECT ... FOR UPDATE` 锁定监控行，
//! 同一监控的并发探测因此被串行化，不会丢失更新。

use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::health::result::MonitorStatus;
use crate::health::state::{HealthPolicy, HealthState};
use crate::monitor::{Monitor, MonitorId, MonitorInput};
use crate::store::{MonitorCatalog, MonitorStore, ProbeRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

/// 监控表结构
const SCHEMA_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS monitors (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    url TEXT NOT NULL,
    check_interval INTEGER NOT NULL DEFAULT 60,
    timeout INTEGER NOT NULL DEFAULT 5,
    expected_status_code INTEGER NOT NULL DEFAULT 200,
    webhook_url TEXT,
    enabled BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    last_checked_at TIMESTAMPTZ,
    status TEXT NOT NULL DEFAULT 'UNKNOWN',
    consecutive_failures INTEGER NOT NULL DEFAULT 0,
    consecutive_successes INTEGER NOT NULL DEFAULT 0
)
"#;

const SCHEMA_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS monitors_due_idx ON monitors (enabled, last_checked_at)
"#;

const MONITOR_COLUMNS: &str = "id, name, url, check_interval, timeout, expected_status_code, \
     webhook_url, enabled, status, consecutive_failures, consecutive_successes, \
     last_checked_at, created_at";

/// 数据库行
#[derive(Debug, sqlx::FromRow)]
struct MonitorRow {
    id: i64,
    name: String,
    url: String,
    check_interval: i32,
    timeout: i32,
    expected_status_code: i32,
    webhook_url: Option<String>,
    enabled: bool,
    status: String,
    consecutive_failures: i32,
    consecutive_successes: i32,
    last_checked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// 健康状态相关的列
#[derive(Debug, sqlx::FromRow)]
struct HealthRow {
    name: String,
    url: String,
    webhook_url: Option<String>,
    status: String,
    consecutive_failures: i32,
    consecutive_successes: i32,
}

fn parse_status(monitor_id: MonitorId, status: &str) -> MonitorStatus {
    status.parse().unwrap_or_else(|e| {
        warn!(monitor_id, error = %e, "存储中的状态无法识别，按 UNKNOWN 处理");
        MonitorStatus::Unknown
    })
}

fn non_negative(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn to_column(field: &str, value: u64) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::InvalidData(format!("{field} 超出范围: {value}")))
}

/// 转换到期监控行，跳过无法解释的行
fn dispatchable(rows: Vec<MonitorRow>) -> Vec<Monitor> {
    rows.into_iter()
        .filter_map(|row| {
            let monitor_id = row.id;
            match Monitor::try_from(row) {
                Ok(monitor) => Some(monitor),
                Err(e) => {
                    warn!(monitor_id, error = %e, "监控数据无效，跳过派发");
                    None
                }
            }
        })
        .collect()
}

impl TryFrom<MonitorRow> for Monitor {
    type Error = StoreError;

    fn try_from(row: MonitorRow) -> Result<Self, Self::Error> {
        let expected_status_code = u16::try_from(row.expected_status_code).map_err(|_| {
            StoreError::InvalidData(format!(
                "监控 {} 的期望状态码无效: {}",
                row.id, row.expected_status_code
            ))
        })?;

        Ok(Monitor {
            status: parse_status(row.id, &row.status),
            id: row.id,
            name: row.name,
            url: row.url,
            check_interval: u64::from(non_negative(row.check_interval)),
            timeout: u64::from(non_negative(row.timeout)),
            expected_status_code,
            webhook_url: row.webhook_url,
            enabled: row.enabled,
            consecutive_failures: non_negative(row.consecutive_failures),
            consecutive_successes: non_negative(row.consecutive_successes),
            last_checked_at: row.last_checked_at,
            created_at: row.created_at,
        })
    }
}

/// PostgreSQL 监控存储
#[derive(Debug, Clone)]
pub struct PgMonitorStore {
    pool: PgPool,
}

impl PgMonitorStore {
    /// 创建连接池
    ///
    /// 连接按需建立，数据库暂时不可达时由调用方的循环退避重试。
    ///
    /// # 参数
    /// * `config` - 数据库配置
    ///
    /// # 返回
    /// * `Result<Self, StoreError>` - URL 无法解析时返回错误
    pub fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_lazy(&config.url)?;
        Ok(Self { pool })
    }

    /// 创建监控表（幂等）
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA_DDL).execute(&self.pool).await?;
        sqlx::query(SCHEMA_INDEX).execute(&self.pool).await?;
        info!("monitors 表已就绪");
        Ok(())
    }
}

#[async_trait]
impl MonitorStore for PgMonitorStore {
    async fn due_monitors(&self, now: DateTime<Utc>) -> Result<Vec<Monitor>, StoreError> {
        let rows = sqlx::query_as::<_, MonitorRow>(&format!(
            "SELECT {MONITOR_COLUMNS} FROM monitors \
             WHERE enabled = true \
               AND (last_checked_at IS NULL \
                    OR EXTRACT(EPOCH FROM ($1 - last_checked_at)) >= check_interval) \
             ORDER BY id"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(dispatchable(rows))
    }

    async fn mark_dispatched(
        &self,
        monitor_id: MonitorId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE monitors SET last_checked_at = $2 WHERE id = $1")
            .bind(monitor_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_probe(
        &self,
        monitor_id: MonitorId,
        up: bool,
        policy: &HealthPolicy,
    ) -> Result<ProbeRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, HealthRow>(
            "SELECT name, url, webhook_url, status, consecutive_failures, consecutive_successes \
             FROM monitors WHERE id = $1 FOR UPDATE",
        )
        .bind(monitor_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound(monitor_id))?;

        let previous = HealthState::new(
            parse_status(monitor_id, &row.status),
            non_negative(row.consecutive_failures),
            non_negative(row.consecutive_successes),
        );
        let transition = previous.apply(up, policy);
        let next = transition.next;

        sqlx::query(
            "UPDATE monitors \
             SET status = $2, consecutive_failures = $3, consecutive_successes = $4 \
             WHERE id = $1",
        )
        .bind(monitor_id)
        .bind(next.status.as_str())
        .bind(i32::try_from(next.consecutive_failures).unwrap_or(i32::MAX))
        .bind(i32::try_from(next.consecutive_successes).unwrap_or(i32::MAX))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ProbeRecord {
            monitor_id,
            name: row.name,
            url: row.url,
            webhook_url: row.webhook_url,
            transition,
        })
    }
}

#[async_trait]
impl MonitorCatalog for PgMonitorStore {
    async fn create_monitor(&self, input: MonitorInput) -> Result<Monitor, StoreError> {
        let row = sqlx::query_as::<_, MonitorRow>(&format!(
            "INSERT INTO monitors \
             (name, url, check_interval, timeout, expected_status_code, webhook_url, enabled, \
              created_at, status, consecutive_failures, consecutive_successes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'UNKNOWN', 0, 0) \
             RETURNING {MONITOR_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.url)
        .bind(to_column("check_interval", input.check_interval)?)
        .bind(to_column("timeout", input.timeout)?)
        .bind(i32::from(input.expected_status_code))
        .bind(&input.webhook_url)
        .bind(input.enabled)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Monitor::try_from(row)
    }

    async fn list_monitors(&self) -> Result<Vec<Monitor>, StoreError> {
        let rows = sqlx::query_as::<_, MonitorRow>(&format!(
            "SELECT {MONITOR_COLUMNS} FROM monitors ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Monitor::try_from).collect()
    }

    async fn get_monitor(&self, monitor_id: MonitorId) -> Result<Monitor, StoreError> {
        let row = sqlx::query_as::<_, MonitorRow>(&format!(
            "SELECT {MONITOR_COLUMNS} FROM monitors WHERE id = $1"
        ))
        .bind(monitor_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(monitor_id))?;

        Monitor::try_from(row)
    }

    async fn update_monitor(
        &self,
        monitor_id: MonitorId,
        input: MonitorInput,
    ) -> Result<Monitor, StoreError> {
        let row = sqlx::query_as::<_, MonitorRow>(&format!(
            "UPDATE monitors \
             SET name = $2, url = $3, check_interval = $4, timeout = $5, \
                 expected_status_code = $6, webhook_url = $7, enabled = $8 \
             WHERE id = $1 \
             RETURNING {MONITOR_COLUMNS}"
        ))
        .bind(monitor_id)
        .bind(&input.name)
        .bind(&input.url)
        .bind(to_column("check_interval", input.check_interval)?)
        .bind(to_column("timeout", input.timeout)?)
        .bind(i32::from(input.expected_status_code))
        .bind(&input.webhook_url)
        .bind(input.enabled)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(monitor_id))?;

        Monitor::try_from(row)
    }

    async fn delete_monitor(&self, monitor_id: MonitorId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM monitors WHERE id = $1")
            .bind(monitor_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(monitor_id));
        }
        Ok(())
    }
}
