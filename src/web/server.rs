//! Web服务器实现
//!
//! 绑定地址并运行API路由，收到关闭信号后优雅退出

use super::{create_router, ApiState};
use crate::error::Result;
use crate::shutdown::wait_for_shutdown;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

/// API服务器
pub struct ApiServer {
    /// 监听地址
    bind_address: String,
    /// 共享状态
    state: ApiState,
}

impl ApiServer {
    /// 创建新的API服务器
    pub fn new(bind_address: impl Into<String>, state: ApiState) -> Self {
        Self {
            bind_address: bind_address.into(),
            state,
        }
    }

    /// 启动服务器，直到收到关闭信号
    pub async fn serve(self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let listener = TcpListener::bind(&self.bind_address).await?;
        info!("API服务器已启动: http://{}", listener.local_addr()?);

        axum::serve(listener, create_router(self.state))
            .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
            .await?;

        info!("API服务器已关闭");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryMonitorStore;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        // 先占用一个空闲端口再释放，供服务器绑定
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = probe.local_addr().unwrap();
        drop(probe);

        let server = ApiServer::new(
            addr.to_string(),
            ApiState::new(Arc::new(InMemoryMonitorStore::new())),
        );
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(server.serve(shutdown_rx));

        let url = format!("http://{addr}/health");
        let mut body = None;
        for _ in 0..50 {
            if let Ok(response) = reqwest::get(&url).await {
                body = Some(response.text().await.unwrap());
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(body.as_deref(), Some(r#"{"status":"ok"}"#));

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
    }
}
