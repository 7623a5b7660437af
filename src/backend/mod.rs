//! 后端调用面：档案增删改查、激活切换、连通性探测、系统环境与 Codex 全局设置。
//!
//! UI 会话只依赖 [`Backend`] trait；进程内实现见 [`LocalBackend`]，
//! HTTP 暴露见 `api` 模块。

mod http;
mod local;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CodexGlobalSettings, ConfigProfile, ConnectionStatus, Namespace, SystemEnvConfig};

pub use http::HttpProbe;
pub use local::LocalBackend;

#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_profiles(&self, ns: Namespace) -> Result<Vec<ConfigProfile>>;

    async fn create_profile(
        &self,
        ns: Namespace,
        title: &str,
        settings: serde_json::Value,
    ) -> Result<ConfigProfile>;

    async fn update_profile(
        &self,
        ns: Namespace,
        id: &str,
        title: &str,
        settings: serde_json::Value,
    ) -> Result<ConfigProfile>;

    async fn delete_profile(&self, ns: Namespace, id: &str) -> Result<()>;

    /// `None` 表示回到默认 / 原始配置
    async fn set_active_profile(&self, ns: Namespace, id: Option<&str>) -> Result<()>;

    async fn probe_connection(&self, url: &str, api_key: &str, model: &str)
        -> Result<ConnectionStatus>;

    /// 站点可达性，返回毫秒延迟
    async fn check_site_latency(&self, url: &str) -> Result<u64>;

    /// 请求返回纯文本 IP 的地址，例如 ipify
    async fn public_ip(&self, url: &str) -> Result<String>;

    /// 命令是否能在 PATH 中找到
    async fn command_exists(&self, command: &str) -> Result<bool>;

    async fn system_env_config(&self) -> Result<SystemEnvConfig>;

    async fn codex_global_settings(&self) -> Result<CodexGlobalSettings>;

    async fn update_codex_global_settings(&self, settings: CodexGlobalSettings) -> Result<()>;
}
