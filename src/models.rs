use serde::{Deserialize, Serialize};

pub const ENV_BASE_URL: &str = "ANTHROPIC_BASE_URL";
pub const ENV_AUTH_TOKEN: &str = "ANTHROPIC_AUTH_TOKEN";
pub const ENV_MODEL: &str = "ANTHROPIC_MODEL";
pub const ENV_HAIKU_MODEL: &str = "ANTHROPIC_DEFAULT_HAIKU_MODEL";
pub const ENV_SONNET_MODEL: &str = "ANTHROPIC_DEFAULT_SONNET_MODEL";
pub const ENV_OPUS_MODEL: &str = "ANTHROPIC_DEFAULT_OPUS_MODEL";

/// 配置命名空间：Claude 与 Codex 两套互不相交的配置集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Claude,
    Codex,
}

impl Namespace {
    pub const ALL: [Namespace; 2] = [Namespace::Claude, Namespace::Codex];

    pub fn label(self) -> &'static str {
        match self {
            Namespace::Claude => "Claude",
            Namespace::Codex => "Codex",
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Namespace::Claude => f.write_str("claude"),
            Namespace::Codex => f.write_str("codex"),
        }
    }
}

/// 一条已存储的配置档案
///
/// Codex 集合的旧文件用 `config` 作为设置字段名，读取时兼容。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigProfile {
    pub id: String,
    pub title: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: u64,
    #[serde(alias = "config", default = "empty_object")]
    pub settings: serde_json::Value,
    #[serde(default)]
    pub using: bool,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl ConfigProfile {
    /// 读取 `settings.env.<key>` 字符串值
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.settings
            .get("env")
            .and_then(|env| env.get(key))
            .and_then(|v| v.as_str())
    }

    /// 读取顶层 `settings.<key>` 字符串值（Codex 档案）
    pub fn setting_value(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(|v| v.as_str())
    }
}

/// 单个命名空间的持久化文件内容，未知的顶层字段原样保留
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoresFile {
    #[serde(default)]
    pub configs: Vec<ConfigProfile>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// 连通性探测结果（仅内存，不持久化）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub success: bool,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ConnectionStatus {
    pub fn ok(latency_ms: u64) -> Self {
        Self {
            success: true,
            latency_ms,
            message: None,
        }
    }

    /// 所有探测失败统一降级为这一条记录
    pub fn check_failed() -> Self {
        Self {
            success: false,
            latency_ms: 0,
            message: Some("Check failed".to_string()),
        }
    }
}

/// 宿主环境变量中的 Claude 连接配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemEnvConfig {
    pub has_config: bool,
    pub base_url: Option<String>,
    pub auth_token: Option<String>,
    pub main_model: Option<String>,
    pub haiku_model: Option<String>,
    pub sonnet_model: Option<String>,
    pub opus_model: Option<String>,
}

/// Codex 全局设置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodexGlobalSettings {
    pub enabled: bool,
    pub root_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_reads_legacy_config_field() {
        let raw = json!({
            "id": "x1",
            "title": "TVC",
            "createdAt": 5,
            "config": {"url": "https://example.com/v1"},
            "using": true
        });
        let profile: ConfigProfile = serde_json::from_value(raw).unwrap();
        assert_eq!(profile.setting_value("url"), Some("https://example.com/v1"));
        assert!(profile.using);
    }

    #[test]
    fn test_stores_file_keeps_unknown_fields() {
        let raw = json!({
            "configs": [],
            "distinct_id": "abc",
            "notification": {"enable": true, "enabled_hooks": ["Notification"]}
        });
        let file: StoresFile = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(file.extra.len(), 2);
        assert_eq!(serde_json::to_value(&file).unwrap(), raw);
    }

    #[test]
    fn test_namespace_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Namespace::Codex).unwrap(), json!("codex"));
        assert_eq!(Namespace::Claude.to_string(), "claude");
    }

    #[test]
    fn test_check_failed_shape() {
        let status = ConnectionStatus::check_failed();
        assert!(!status.success);
        assert_eq!(status.latency_ms, 0);
        assert_eq!(status.message.as_deref(), Some("Check failed"));
    }
}
