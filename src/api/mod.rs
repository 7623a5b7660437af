//! HTTP RPC 服务：把 [`Backend`](crate::backend::Backend) 暴露为 JSON 接口

pub mod handlers;
pub mod routes;

use std::net::SocketAddr;

use crate::error::Result;

pub use handlers::AppState;
pub use routes::create_router;

/// 默认监听地址
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// 绑定地址并运行到进程结束或任务被取消
pub async fn serve(addr: SocketAddr, backend: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "API 服务已启动");
    axum::serve(listener, create_router(backend)).await?;
    Ok(())
}
