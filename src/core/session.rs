//! 单个命名空间的页面会话
//!
//! 组合选择器、探测器与列表投影。所有失败都转成提示，不向界面传播。

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::editor::{EditMode, EditorForm};
use super::env::system_env_settings;
use super::notice::{Notice, Notices};
use super::probe_target::ProbeTarget;
use super::projection::{self, ListEntry};
use super::prober::HealthProber;
use super::selector::{ActivationOutcome, ActivationPolicy, ActiveSelector, Selection};
use crate::backend::Backend;
use crate::error::SwitchError;
use crate::models::{ConfigProfile, ConnectionStatus, Namespace, SystemEnvConfig};

/// 导入系统环境变量时使用的档案名
pub const SYSTEM_ENV_TITLE: &str = "System Env";

pub struct NamespaceSession {
    ns: Namespace,
    backend: Arc<dyn Backend>,
    selector: ActiveSelector,
    prober: HealthProber,
    system_env: Option<SystemEnvConfig>,
    notices: Notices,
    auto_probe: bool,
}

impl NamespaceSession {
    pub fn new(
        ns: Namespace,
        backend: Arc<dyn Backend>,
        runtime: Handle,
        policy: ActivationPolicy,
    ) -> Self {
        Self {
            ns,
            selector: ActiveSelector::new(ns, Arc::clone(&backend), policy),
            prober: HealthProber::new(Arc::clone(&backend), runtime),
            backend,
            system_env: None,
            notices: Notices::default(),
            auto_probe: true,
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.ns
    }

    pub fn set_auto_probe(&mut self, enabled: bool) {
        self.auto_probe = enabled;
    }

    /// 进入页面：丢弃旧的探测状态后刷新
    pub async fn load(&mut self) -> Vec<JoinHandle<()>> {
        self.prober.clear();
        self.refresh().await
    }

    /// 拉取列表（Claude 同时读取系统环境），列表变化时触发探测
    pub async fn refresh(&mut self) -> Vec<JoinHandle<()>> {
        let profiles = match self.selector.refresh().await {
            Ok(profiles) => profiles,
            Err(e) => {
                self.notices
                    .push(Notice::error(format!("Failed to load configs: {}", e)));
                return Vec::new();
            }
        };

        if self.ns == Namespace::Claude {
            match self.backend.system_env_config().await {
                Ok(env) => self.system_env = Some(env),
                Err(e) => {
                    tracing::warn!("读取系统环境变量失败: {}", e);
                    self.system_env = None;
                }
            }
        }

        if self.auto_probe {
            self.prober.sync(self.ns, &profiles)
        } else {
            Vec::new()
        }
    }

    /// 离开页面时丢弃临时状态
    pub fn leave(&mut self) {
        self.prober.clear();
    }

    pub fn profiles(&self) -> Vec<ConfigProfile> {
        self.selector.profiles()
    }

    pub fn selection(&self) -> Selection {
        self.selector.selection()
    }

    pub fn system_env(&self) -> Option<&SystemEnvConfig> {
        self.system_env.as_ref()
    }

    pub fn entries(&self) -> Vec<ListEntry> {
        projection::project(
            self.ns,
            &self.selector.profiles(),
            self.system_env.as_ref(),
            &self.prober.statuses(),
        )
    }

    pub fn status(&self, id: &str) -> Option<ConnectionStatus> {
        self.prober.status(id)
    }

    pub fn is_checking(&self, id: &str) -> bool {
        self.prober.is_checking(id)
    }

    pub fn is_switching(&self) -> bool {
        self.selector.is_pending()
    }

    pub fn notices(&mut self) -> &mut Notices {
        &mut self.notices
    }

    pub fn latest_notice(&self) -> Option<&Notice> {
        self.notices.latest()
    }

    /// 切换激活项，成功返回 true
    pub async fn activate(&mut self, target: Selection) -> bool {
        match self.selector.activate(target).await {
            ActivationOutcome::Unchanged => false,
            ActivationOutcome::Activated(selection) => {
                let label = match &selection {
                    Selection::Default => "Original Config".to_string(),
                    Selection::Profile(id) => self
                        .selector
                        .profiles()
                        .into_iter()
                        .find(|p| &p.id == id)
                        .map(|p| p.title)
                        .unwrap_or_else(|| id.clone()),
                };
                tracing::info!(namespace = %self.ns, "已切换到 {}", label);
                self.notices
                    .push(Notice::success(format!("Switched to {}", label)));
                true
            }
            ActivationOutcome::Rejected(notice) => {
                self.notices.push(notice);
                false
            }
        }
    }

    /// 按列表项执行默认动作：默认项与档案项切换，系统环境项导入；新建入口由界面打开编辑器
    pub async fn activate_entry(&mut self, entry: &ListEntry) -> bool {
        match entry {
            ListEntry::Create => false,
            ListEntry::Default { .. } => self.activate(Selection::Default).await,
            ListEntry::SystemEnv { .. } => self.import_system_env().await,
            ListEntry::Profile { profile, .. } => {
                self.activate(Selection::Profile(profile.id.clone())).await
            }
        }
    }

    /// 删除不可恢复；删除激活项后命名空间回到默认项
    pub async fn delete(&mut self, id: &str) -> bool {
        match self.backend.delete_profile(self.ns, id).await {
            Ok(()) => {
                self.notices.push(Notice::success("Config deleted"));
                self.refresh().await;
                true
            }
            Err(e) => {
                self.notices
                    .push(Notice::error(format!("Failed to delete config: {}", e)));
                false
            }
        }
    }

    /// 提交编辑表单；校验失败只产生提示
    pub async fn submit(&mut self, form: &EditorForm) -> Option<ConfigProfile> {
        if form.namespace() != self.ns {
            self.notices.push(Notice::error(format!(
                "Form belongs to {}, not {}",
                form.namespace(),
                self.ns
            )));
            return None;
        }
        let creating = *form.mode() == EditMode::Create;
        match form.submit(self.backend.as_ref()).await {
            Ok(profile) => {
                let verb = if creating { "created" } else { "updated" };
                self.notices
                    .push(Notice::success(format!("Config {} {}", profile.title, verb)));
                self.refresh().await;
                Some(profile)
            }
            Err(SwitchError::Validation(msg)) => {
                self.notices.push(Notice::error(msg));
                None
            }
            Err(e) => {
                self.notices
                    .push(Notice::error(format!("Failed to save config: {}", e)));
                None
            }
        }
    }

    /// 把系统环境变量导入为新的已存储档案
    pub async fn import_system_env(&mut self) -> bool {
        let env = match self.system_env.as_ref() {
            Some(env) if env.has_config => env.clone(),
            _ => {
                self.notices
                    .push(Notice::warning("No system environment config detected"));
                return false;
            }
        };
        match self
            .backend
            .create_profile(self.ns, SYSTEM_ENV_TITLE, system_env_settings(&env))
            .await
        {
            Ok(_) => {
                self.notices
                    .push(Notice::success("Imported system environment config"));
                self.refresh().await;
                true
            }
            Err(e) => {
                self.notices
                    .push(Notice::error(format!("Failed to import: {}", e)));
                false
            }
        }
    }

    pub fn retest(&self, id: &str) -> Option<JoinHandle<()>> {
        let profile = self.selector.profiles().into_iter().find(|p| p.id == id)?;
        self.prober
            .probe(&profile.id, ProbeTarget::from_profile(self.ns, &profile))
    }

    pub fn retest_all(&self) -> Vec<JoinHandle<()>> {
        self.prober.probe_all(self.ns, &self.selector.profiles())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{profile, Call, MockBackend, ProbeScript};
    use crate::core::notice::NoticeLevel;
    use serde_json::json;

    fn claude(id: &str, using: bool, url: &str, token: &str) -> ConfigProfile {
        profile(
            id,
            id,
            using,
            json!({"env": {"ANTHROPIC_BASE_URL": url, "ANTHROPIC_AUTH_TOKEN": token}}),
        )
    }

    fn session(mock: &Arc<MockBackend>, ns: Namespace) -> NamespaceSession {
        NamespaceSession::new(ns, mock.clone(), Handle::current(), ActivationPolicy::default())
    }

    async fn join_all(handles: Vec<JoinHandle<()>>) {
        for h in handles {
            h.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_load_projects_and_probes() {
        let mock = Arc::new(MockBackend::new().with_profiles(
            Namespace::Claude,
            vec![claude("a", false, "https://a", "t"), claude("b", true, "https://b", "t")],
        ));
        mock.set_probe("https://a", ProbeScript::Status(ConnectionStatus::ok(30)));
        let mut s = session(&mock, Namespace::Claude);

        join_all(s.load().await).await;

        let entries = s.entries();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[1], ListEntry::Default { active: false });
        assert_eq!(s.status("a"), Some(ConnectionStatus::ok(30)));
        assert_eq!(s.status("b"), Some(ConnectionStatus::check_failed()));
        assert_eq!(s.selection(), Selection::Profile("b".to_string()));
    }

    #[tokio::test]
    async fn test_refresh_without_change_does_not_reprobe() {
        let mock = Arc::new(MockBackend::new().with_profiles(
            Namespace::Claude,
            vec![claude("a", false, "https://a", "t")],
        ));
        mock.set_probe("https://a", ProbeScript::Status(ConnectionStatus::ok(1)));
        let mut s = session(&mock, Namespace::Claude);

        join_all(s.load().await).await;
        assert!(s.refresh().await.is_empty());
        assert_eq!(mock.probe_calls("https://a"), 1);

        join_all(vec![s.retest("a").unwrap()]).await;
        join_all(s.retest_all()).await;
        assert_eq!(mock.probe_calls("https://a"), 3);
        assert!(s.retest("ghost").is_none());
    }

    #[tokio::test]
    async fn test_auto_probe_off() {
        let mock = Arc::new(MockBackend::new().with_profiles(
            Namespace::Claude,
            vec![claude("a", false, "https://a", "t")],
        ));
        let mut s = session(&mock, Namespace::Claude);
        s.set_auto_probe(false);

        assert!(s.load().await.is_empty());
        assert_eq!(mock.probe_calls("https://a"), 0);
    }

    #[tokio::test]
    async fn test_activate_pushes_notice() {
        let mock = Arc::new(MockBackend::new().with_profiles(
            Namespace::Claude,
            vec![claude("a", true, "https://a", "t"), claude("b", false, "https://b", "t")],
        ));
        let mut s = session(&mock, Namespace::Claude);
        s.set_auto_probe(false);
        s.load().await;

        assert!(s.activate(Selection::Profile("b".to_string())).await);
        assert_eq!(s.latest_notice().unwrap().level, NoticeLevel::Success);
        assert_eq!(s.selection(), Selection::Profile("b".to_string()));

        assert!(!s.activate(Selection::Profile("b".to_string())).await);
        assert_eq!(mock.set_active_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_codex_disabled_notice() {
        let mock = Arc::new(MockBackend::new().with_profiles(
            Namespace::Codex,
            vec![profile("c", "c", false, json!({"url": "https://c"}))],
        ));
        mock.set_codex_enabled(false);
        let mut s = session(&mock, Namespace::Codex);
        s.set_auto_probe(false);
        s.load().await;

        let entries = s.entries();
        assert!(!s.activate_entry(&entries[2]).await);
        assert_eq!(
            s.latest_notice().unwrap().message,
            "Please enable Codex in Global Settings first."
        );
    }

    #[tokio::test]
    async fn test_delete_active_falls_back_to_default() {
        let mock = Arc::new(MockBackend::new().with_profiles(
            Namespace::Claude,
            vec![claude("a", true, "https://a", "t")],
        ));
        let mut s = session(&mock, Namespace::Claude);
        s.set_auto_probe(false);
        s.load().await;

        assert!(s.delete("a").await);
        assert_eq!(s.selection(), Selection::Default);
        assert_eq!(s.entries()[1], ListEntry::Default { active: true });

        assert!(!s.delete("a").await);
        assert_eq!(s.latest_notice().unwrap().level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_submit_validation_stays_local() {
        let mock = Arc::new(MockBackend::new());
        let mut s = session(&mock, Namespace::Codex);
        s.set_auto_probe(false);

        let mut form = EditorForm::create(Namespace::Codex);
        *form.field_mut(0).unwrap() = "bad name".to_string();
        assert!(s.submit(&form).await.is_none());
        assert!(mock.calls().is_empty());

        *form.field_mut(0).unwrap() = "Good1".to_string();
        let created = s.submit(&form).await.unwrap();
        assert!(!created.using);
        assert!(s.profiles().iter().any(|p| p.title == "Good1"));
    }

    #[tokio::test]
    async fn test_create_test1_listed_inactive() {
        let mock = Arc::new(MockBackend::new());
        let mut s = session(&mock, Namespace::Claude);
        s.set_auto_probe(false);

        let mut form = EditorForm::create(Namespace::Claude);
        *form.field_mut(0).unwrap() = "Test1".to_string();
        s.submit(&form).await.unwrap();

        let listed: Vec<_> = s.profiles().into_iter().filter(|p| p.title == "Test1").collect();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].using);
    }

    #[tokio::test]
    async fn test_system_env_import_and_suppression() {
        let env = SystemEnvConfig {
            has_config: true,
            base_url: Some("https://sys".to_string()),
            auth_token: Some("tok".to_string()),
            ..Default::default()
        };
        let mock = Arc::new(MockBackend::new().with_system_env(env));
        let mut s = session(&mock, Namespace::Claude);
        s.set_auto_probe(false);
        s.load().await;

        let entries = s.entries();
        assert!(matches!(entries[2], ListEntry::SystemEnv { .. }));

        assert!(s.activate_entry(&entries[2]).await);
        assert_eq!(
            mock.calls().iter().filter(|c| matches!(c, Call::Create(..))).count(),
            1
        );
        let entries = s.entries();
        assert!(!entries.iter().any(|e| matches!(e, ListEntry::SystemEnv { .. })));
        assert_eq!(entries.last().unwrap().label(), SYSTEM_ENV_TITLE);
    }

    #[tokio::test]
    async fn test_import_without_env_warns() {
        let mock = Arc::new(MockBackend::new());
        let mut s = session(&mock, Namespace::Claude);
        s.set_auto_probe(false);
        s.load().await;

        assert!(!s.import_system_env().await);
        assert_eq!(s.latest_notice().unwrap().level, NoticeLevel::Warning);
    }
}
