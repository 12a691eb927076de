//! 关闭信号模块
//!
//! 将 SIGINT/SIGTERM（非Unix系统上为 Ctrl+C）转换为广播关闭信号，
//! 长期运行的循环订阅该信号后自行退出。

use crate::error::Result;
use tokio::sync::broadcast;
use tracing::{error, info};

#[cfg(unix)]
use signal_hook::consts::{SIGINT, SIGTERM};
#[cfg(unix)]
use signal_hook_tokio::Signals;

/// 创建关闭信号通道
pub fn shutdown_channel() -> (broadcast::Sender<()>, broadcast::Receiver<()>) {
    broadcast::channel(4)
}

/// 设置信号处理器
///
/// # 参数
/// * `shutdown_tx` - 收到信号后广播关闭的发送端
pub fn setup_signal_handlers(shutdown_tx: broadcast::Sender<()>) -> Result<()> {
    #[cfg(unix)]
    {
        setup_unix_signals(shutdown_tx)
    }
    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("接收到 Ctrl+C，开始优雅关闭...");
                    broadcast_shutdown(&shutdown_tx);
                }
                Err(e) => error!("监听 Ctrl+C 失败: {e}"),
            }
        });
        Ok(())
    }
}

/// Unix/Linux系统信号处理
#[cfg(unix)]
fn setup_unix_signals(shutdown_tx: broadcast::Sender<()>) -> Result<()> {
    use futures::stream::StreamExt;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let handle = signals.handle();

    tokio::spawn(async move {
        if let Some(signal) = signals.next().await {
            let name = if signal == SIGINT { "SIGINT" } else { "SIGTERM" };
            info!("接收到 {name} 信号，开始优雅关闭...");
            broadcast_shutdown(&shutdown_tx);
        }
        handle.close();
    });

    Ok(())
}

fn broadcast_shutdown(shutdown_tx: &broadcast::Sender<()>) {
    // 没有订阅者说明各循环都已退出
    if let Err(e) = shutdown_tx.send(()) {
        error!("发送关闭信号失败: {e}");
    }
}

/// 等待关闭信号
pub async fn wait_for_shutdown(mut shutdown_rx: broadcast::Receiver<()>) {
    match shutdown_rx.recv().await {
        Ok(()) => info!("接收到关闭信号，开始清理资源..."),
        Err(e) => error!("等待关闭信号时发生错误: {e}"),
    }
}
