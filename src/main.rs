//! Uptime Vitals 主程序入口
//!
//! 按子命令运行调度器、工作者、控制面API或一次性工具命令

use anyhow::{Context, Result};
use uptime_vitals::cli::{command_for, Args};
use uptime_vitals::logging::{LogConfig, LoggingSystem};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse_args();

    // 初始化日志系统
    let log_config = LogConfig::new(args.log_level.into(), args.json_logs);
    let logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!(
        level = %logging_system.config().level,
        json = logging_system.config().json_format,
        "Uptime Vitals v{} 启动",
        uptime_vitals::VERSION
    );
    if args.needs_config() {
        match &args.config {
            Some(path) => info!("使用配置文件: {}", path.display()),
            None => info!("未指定配置文件，从环境变量读取配置"),
        }
    }

    // 执行命令
    if let Err(e) = command_for(&args.command).execute(&args).await {
        error!("命令执行失败: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
