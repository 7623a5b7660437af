use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Backend, HttpProbe};
use crate::core::env::{command_in_path, read_system_env};
use crate::core::ProfileCenter;
use crate::error::Result;
use crate::models::{CodexGlobalSettings, ConfigProfile, ConnectionStatus, Namespace, SystemEnvConfig};

/// 进程内后端：JSON 文件存储 + reqwest 探测
pub struct LocalBackend {
    center: RwLock<ProfileCenter>,
    probe: HttpProbe,
    system_env: Option<SystemEnvConfig>,
}

impl LocalBackend {
    pub fn new(center: ProfileCenter, probe: HttpProbe) -> Self {
        Self {
            center: RwLock::new(center),
            probe,
            system_env: None,
        }
    }

    /// 固定系统环境配置，不再读取进程环境变量
    pub fn with_system_env(mut self, env: SystemEnvConfig) -> Self {
        self.system_env = Some(env);
        self
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn list_profiles(&self, ns: Namespace) -> Result<Vec<ConfigProfile>> {
        Ok(self.center.read().await.list_profiles(ns))
    }

    async fn create_profile(
        &self,
        ns: Namespace,
        title: &str,
        settings: serde_json::Value,
    ) -> Result<ConfigProfile> {
        self.center.write().await.create_profile(ns, title, settings)
    }

    async fn update_profile(
        &self,
        ns: Namespace,
        id: &str,
        title: &str,
        settings: serde_json::Value,
    ) -> Result<ConfigProfile> {
        self.center.write().await.update_profile(ns, id, title, settings)
    }

    async fn delete_profile(&self, ns: Namespace, id: &str) -> Result<()> {
        self.center.write().await.delete_profile(ns, id)
    }

    async fn set_active_profile(&self, ns: Namespace, id: Option<&str>) -> Result<()> {
        self.center.write().await.set_active(ns, id)
    }

    async fn probe_connection(
        &self,
        url: &str,
        api_key: &str,
        _model: &str,
    ) -> Result<ConnectionStatus> {
        self.probe.check_connection(url, api_key).await
    }

    async fn check_site_latency(&self, url: &str) -> Result<u64> {
        self.probe.site_latency(url).await
    }

    async fn public_ip(&self, url: &str) -> Result<String> {
        self.probe.public_ip(url).await
    }

    async fn command_exists(&self, command: &str) -> Result<bool> {
        Ok(command_in_path(command, std::env::var_os("PATH").as_deref()))
    }

    async fn system_env_config(&self) -> Result<SystemEnvConfig> {
        Ok(self.system_env.clone().unwrap_or_else(read_system_env))
    }

    async fn codex_global_settings(&self) -> Result<CodexGlobalSettings> {
        Ok(self.center.read().await.codex_settings())
    }

    async fn update_codex_global_settings(&self, settings: CodexGlobalSettings) -> Result<()> {
        self.center.write().await.update_codex_settings(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SwitchError;
    use crate::paths::Paths;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_backend(tmp: &TempDir) -> LocalBackend {
        let center = ProfileCenter::new(Paths::from_home(tmp.path()));
        LocalBackend::new(center, HttpProbe::new().unwrap())
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let tmp = TempDir::new().unwrap();
        let backend = test_backend(&tmp);
        backend.create_profile(Namespace::Claude, "Test1", json!({})).await.unwrap();

        let listed = backend.list_profiles(Namespace::Claude).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Test1");
        assert!(!listed[0].using);
    }

    #[tokio::test]
    async fn test_set_active_confirms_single_using() {
        let tmp = TempDir::new().unwrap();
        let backend = test_backend(&tmp);
        let a = backend.create_profile(Namespace::Claude, "a", json!({})).await.unwrap();
        let b = backend.create_profile(Namespace::Claude, "b", json!({})).await.unwrap();

        backend.set_active_profile(Namespace::Claude, Some(&a.id)).await.unwrap();
        backend.set_active_profile(Namespace::Claude, Some(&b.id)).await.unwrap();

        let listed = backend.list_profiles(Namespace::Claude).await.unwrap();
        let using: Vec<_> = listed.iter().filter(|p| p.using).map(|p| p.id.clone()).collect();
        assert_eq!(using, vec![b.id]);
    }

    #[tokio::test]
    async fn test_probe_empty_url_errors() {
        let tmp = TempDir::new().unwrap();
        let backend = test_backend(&tmp);
        let err = backend.probe_connection("", "", "").await.unwrap_err();
        assert!(matches!(err, SwitchError::Validation(_)));
    }

    #[tokio::test]
    async fn test_fixed_system_env() {
        let tmp = TempDir::new().unwrap();
        let env = SystemEnvConfig {
            has_config: true,
            base_url: Some("https://x".to_string()),
            auth_token: Some("t".to_string()),
            ..Default::default()
        };
        let backend = test_backend(&tmp).with_system_env(env.clone());
        assert_eq!(backend.system_env_config().await.unwrap(), env);
    }
}
