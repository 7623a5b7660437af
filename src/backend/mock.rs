//! 测试用内存后端：记录调用、可脚本化探测结果与延迟

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::Backend;
use crate::error::{Result, SwitchError};
use crate::models::{CodexGlobalSettings, ConfigProfile, ConnectionStatus, Namespace, SystemEnvConfig};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List(Namespace),
    Create(Namespace, String),
    Update(Namespace, String),
    Delete(Namespace, String),
    SetActive(Namespace, Option<String>),
    Probe(String),
    Latency(String),
    PublicIp(String),
    CommandExists(String),
}

#[derive(Debug, Clone)]
pub enum ProbeScript {
    Status(ConnectionStatus),
    Fail,
}

#[derive(Default)]
struct MockState {
    profiles: HashMap<Namespace, Vec<ConfigProfile>>,
    calls: Vec<Call>,
    probes: HashMap<String, ProbeScript>,
    probe_delays: HashMap<String, Duration>,
    latencies: HashMap<String, u64>,
    ips: HashMap<String, String>,
    commands: HashSet<String>,
    activation_delays: HashMap<String, Duration>,
    reject_activation: bool,
    codex: Option<CodexGlobalSettings>,
    system_env: SystemEnvConfig,
    next_id: u64,
}

#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

pub fn profile(id: &str, title: &str, using: bool, settings: serde_json::Value) -> ConfigProfile {
    ConfigProfile {
        id: id.to_string(),
        title: title.to_string(),
        created_at: 0,
        settings,
        using,
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(self, ns: Namespace, profiles: Vec<ConfigProfile>) -> Self {
        self.state.lock().unwrap().profiles.insert(ns, profiles);
        self
    }

    pub fn with_system_env(self, env: SystemEnvConfig) -> Self {
        self.state.lock().unwrap().system_env = env;
        self
    }

    pub fn set_probe(&self, url: &str, script: ProbeScript) {
        self.state.lock().unwrap().probes.insert(url.to_string(), script);
    }

    pub fn set_probe_delay(&self, url: &str, delay: Duration) {
        self.state.lock().unwrap().probe_delays.insert(url.to_string(), delay);
    }

    pub fn set_latency(&self, url: &str, ms: u64) {
        self.state.lock().unwrap().latencies.insert(url.to_string(), ms);
    }

    pub fn set_public_ip(&self, url: &str, ip: &str) {
        self.state.lock().unwrap().ips.insert(url.to_string(), ip.to_string());
    }

    pub fn install_command(&self, command: &str) {
        self.state.lock().unwrap().commands.insert(command.to_string());
    }

    /// 激活目标的响应延迟，`"default"` 表示回到默认配置
    pub fn set_activation_delay(&self, target: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .activation_delays
            .insert(target.to_string(), delay);
    }

    pub fn reject_activation(&self, reject: bool) {
        self.state.lock().unwrap().reject_activation = reject;
    }

    pub fn set_codex_enabled(&self, enabled: bool) {
        self.state.lock().unwrap().codex = Some(CodexGlobalSettings {
            enabled,
            root_path: "/tmp/codex".to_string(),
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn set_active_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::SetActive(..)))
            .collect()
    }

    pub fn probe_calls(&self, url: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Probe(u) if u == url))
            .count()
    }

    pub fn profiles(&self, ns: Namespace) -> Vec<ConfigProfile> {
        self.state
            .lock()
            .unwrap()
            .profiles
            .get(&ns)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list_profiles(&self, ns: Namespace) -> Result<Vec<ConfigProfile>> {
        self.record(Call::List(ns));
        Ok(self.profiles(ns))
    }

    async fn create_profile(
        &self,
        ns: Namespace,
        title: &str,
        settings: serde_json::Value,
    ) -> Result<ConfigProfile> {
        self.record(Call::Create(ns, title.to_string()));
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let created = profile(&format!("m{}", state.next_id), title, false, settings);
        state.profiles.entry(ns).or_default().push(created.clone());
        Ok(created)
    }

    async fn update_profile(
        &self,
        ns: Namespace,
        id: &str,
        title: &str,
        settings: serde_json::Value,
    ) -> Result<ConfigProfile> {
        self.record(Call::Update(ns, id.to_string()));
        let mut state = self.state.lock().unwrap();
        let found = state
            .profiles
            .entry(ns)
            .or_default()
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| SwitchError::ProfileNotFound(id.to_string()))?;
        found.title = title.to_string();
        found.settings = settings;
        Ok(found.clone())
    }

    async fn delete_profile(&self, ns: Namespace, id: &str) -> Result<()> {
        self.record(Call::Delete(ns, id.to_string()));
        let mut state = self.state.lock().unwrap();
        let list = state.profiles.entry(ns).or_default();
        let before = list.len();
        list.retain(|p| p.id != id);
        if list.len() == before {
            return Err(SwitchError::ProfileNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn set_active_profile(&self, ns: Namespace, id: Option<&str>) -> Result<()> {
        self.record(Call::SetActive(ns, id.map(str::to_string)));
        let delay = {
            let state = self.state.lock().unwrap();
            state
                .activation_delays
                .get(id.unwrap_or("default"))
                .copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.reject_activation {
            return Err(SwitchError::FeatureDisabled("activation rejected".to_string()));
        }
        let list = state.profiles.entry(ns).or_default();
        if let Some(id) = id {
            if !list.iter().any(|p| p.id == id) {
                return Err(SwitchError::ProfileNotFound(id.to_string()));
            }
        }
        for p in list.iter_mut() {
            p.using = Some(p.id.as_str()) == id;
        }
        Ok(())
    }

    async fn probe_connection(
        &self,
        url: &str,
        _api_key: &str,
        _model: &str,
    ) -> Result<ConnectionStatus> {
        self.record(Call::Probe(url.to_string()));
        let (script, delay) = {
            let state = self.state.lock().unwrap();
            (
                state.probes.get(url).cloned(),
                state.probe_delays.get(url).copied(),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if url.is_empty() {
            return Err(SwitchError::Validation("endpoint url is empty".to_string()));
        }
        match script {
            Some(ProbeScript::Status(status)) => Ok(status),
            Some(ProbeScript::Fail) | None => Err(SwitchError::Probe("timed out".to_string())),
        }
    }

    /// 与连通性检查共用同一组按 URL 设置的延迟
    async fn check_site_latency(&self, url: &str) -> Result<u64> {
        self.record(Call::Latency(url.to_string()));
        let (latency, delay) = {
            let state = self.state.lock().unwrap();
            (
                state.latencies.get(url).copied(),
                state.probe_delays.get(url).copied(),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        latency.ok_or_else(|| SwitchError::Probe(format!("failed to connect: {}", url)))
    }

    async fn public_ip(&self, url: &str) -> Result<String> {
        self.record(Call::PublicIp(url.to_string()));
        self.state
            .lock()
            .unwrap()
            .ips
            .get(url)
            .cloned()
            .ok_or_else(|| SwitchError::Probe(format!("failed to request public ip: {}", url)))
    }

    async fn command_exists(&self, command: &str) -> Result<bool> {
        self.record(Call::CommandExists(command.to_string()));
        Ok(self.state.lock().unwrap().commands.contains(command))
    }

    async fn system_env_config(&self) -> Result<SystemEnvConfig> {
        Ok(self.state.lock().unwrap().system_env.clone())
    }

    async fn codex_global_settings(&self) -> Result<CodexGlobalSettings> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .codex
            .clone()
            .unwrap_or(CodexGlobalSettings {
                enabled: true,
                root_path: "/tmp/codex".to_string(),
            }))
    }

    async fn update_codex_global_settings(&self, settings: CodexGlobalSettings) -> Result<()> {
        self.state.lock().unwrap().codex = Some(settings);
        Ok(())
    }
}
