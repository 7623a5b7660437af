use crate::models::{ConfigProfile, Namespace, ENV_AUTH_TOKEN, ENV_BASE_URL, ENV_MODEL};

/// 探测所需的 (url, api_key, model)，缺失字段为空串
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeTarget {
    pub url: String,
    pub api_key: String,
    pub model: String,
}

impl ProbeTarget {
    pub fn from_profile(ns: Namespace, profile: &ConfigProfile) -> Self {
        let (url, api_key, model) = match ns {
            Namespace::Claude => (
                profile.env_value(ENV_BASE_URL),
                profile.env_value(ENV_AUTH_TOKEN),
                profile.env_value(ENV_MODEL),
            ),
            Namespace::Codex => (
                profile.setting_value("url"),
                profile.setting_value("api_key"),
                profile.setting_value("model"),
            ),
        };
        Self {
            url: url.unwrap_or_default().to_string(),
            api_key: api_key.unwrap_or_default().to_string(),
            model: model.unwrap_or_default().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile(settings: serde_json::Value) -> ConfigProfile {
        ConfigProfile {
            id: "p".to_string(),
            title: "p".to_string(),
            created_at: 0,
            settings,
            using: false,
        }
    }

    #[test]
    fn test_claude_target_reads_env() {
        let p = profile(json!({"env": {
            "ANTHROPIC_BASE_URL": "https://a",
            "ANTHROPIC_AUTH_TOKEN": "t",
            "ANTHROPIC_MODEL": "m"
        }}));
        let target = ProbeTarget::from_profile(Namespace::Claude, &p);
        assert_eq!(target.url, "https://a");
        assert_eq!(target.api_key, "t");
        assert_eq!(target.model, "m");
    }

    #[test]
    fn test_codex_target_missing_fields_are_empty() {
        let p = profile(json!({"url": "https://c/v1"}));
        let target = ProbeTarget::from_profile(Namespace::Codex, &p);
        assert_eq!(target.url, "https://c/v1");
        assert!(target.api_key.is_empty());
        assert!(target.model.is_empty());
    }
}
