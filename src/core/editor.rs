//! 档案编辑表单
//!
//! 校验在本地完成，失败的表单不会触达后端。

use serde_json::{json, Map, Value};

use crate::backend::Backend;
use crate::error::{Result, SwitchError};
use crate::models::{
    ConfigProfile, Namespace, ENV_AUTH_TOKEN, ENV_BASE_URL, ENV_HAIKU_MODEL, ENV_MODEL,
    ENV_OPUS_MODEL, ENV_SONNET_MODEL,
};

pub const MSG_NAME_REQUIRED: &str = "Please enter a configuration name";
pub const MSG_URL_REQUIRED: &str = "Please enter API endpoint";
pub const MSG_NAME_ALNUM: &str = "Configuration name must contain only letters and numbers";

pub const CODEX_DEFAULT_MODEL: &str = "gpt-5-codex";
const CODEX_APPROVAL_POLICY: &str = "on-request";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditMode {
    Create,
    Edit(String),
}

// ========== Claude ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaudeProvider {
    Zhipu,
    Tvc,
    Kimi,
    Custom,
}

pub struct ClaudePreset {
    pub name: &'static str,
    pub url: &'static str,
    pub main_model: &'static str,
    pub haiku_model: &'static str,
    pub sonnet_model: &'static str,
    pub opus_model: &'static str,
}

impl ClaudeProvider {
    pub const ALL: [ClaudeProvider; 4] = [
        ClaudeProvider::Zhipu,
        ClaudeProvider::Tvc,
        ClaudeProvider::Kimi,
        ClaudeProvider::Custom,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ClaudeProvider::Zhipu => "Zhipu",
            ClaudeProvider::Tvc => "TVC",
            ClaudeProvider::Kimi => "Kimi",
            ClaudeProvider::Custom => "Custom",
        }
    }

    pub fn preset(&self) -> ClaudePreset {
        match self {
            ClaudeProvider::Zhipu => ClaudePreset {
                name: "智谱",
                url: "https://open.bigmodel.cn/api/anthropic",
                main_model: "glm-4.6",
                haiku_model: "glm-4.5-air",
                sonnet_model: "glm-4.6",
                opus_model: "glm-4.6",
            },
            ClaudeProvider::Tvc => ClaudePreset {
                name: "TVC",
                url: "https://claude.tvc-mall.com/api",
                main_model: "claude-sonnet-4-5-20250929",
                haiku_model: "claude-haiku-4-5-20251001",
                sonnet_model: "claude-sonnet-4-5-20250929",
                opus_model: "claude-opus-4-1-20250805",
            },
            ClaudeProvider::Kimi => ClaudePreset {
                name: "Kimi k2",
                url: "https://api.moonshot.cn/anthropic",
                main_model: "kimi-k2-thinking",
                haiku_model: "kimi-k2-thinking",
                sonnet_model: "kimi-k2-thinking",
                opus_model: "kimi-k2-thinking",
            },
            ClaudeProvider::Custom => ClaudePreset {
                name: "",
                url: "",
                main_model: "",
                haiku_model: "",
                sonnet_model: "",
                opus_model: "",
            },
        }
    }

    /// 编辑已有档案时按 base_url 识别供应商
    pub fn detect(url: &str) -> Self {
        if url.contains("bigmodel.cn") {
            ClaudeProvider::Zhipu
        } else if url.contains("tvc-mall.com") {
            ClaudeProvider::Tvc
        } else if url.contains("moonshot.cn") {
            ClaudeProvider::Kimi
        } else {
            ClaudeProvider::Custom
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaudeForm {
    pub mode: EditMode,
    pub provider: ClaudeProvider,
    pub name: String,
    pub url: String,
    pub api_key: String,
    pub main_model: String,
    pub haiku_model: String,
    pub sonnet_model: String,
    pub opus_model: String,
}

impl Default for ClaudeForm {
    fn default() -> Self {
        let preset = ClaudeProvider::Zhipu.preset();
        Self {
            mode: EditMode::Create,
            provider: ClaudeProvider::Zhipu,
            name: String::new(),
            url: preset.url.to_string(),
            api_key: String::new(),
            main_model: preset.main_model.to_string(),
            haiku_model: preset.haiku_model.to_string(),
            sonnet_model: preset.sonnet_model.to_string(),
            opus_model: preset.opus_model.to_string(),
        }
    }
}

impl ClaudeForm {
    pub fn edit(profile: &ConfigProfile) -> Self {
        let env = |key| profile.env_value(key).unwrap_or_default().to_string();
        let url = env(ENV_BASE_URL);
        Self {
            mode: EditMode::Edit(profile.id.clone()),
            provider: ClaudeProvider::detect(&url),
            name: profile.title.clone(),
            url,
            api_key: env(ENV_AUTH_TOKEN),
            main_model: env(ENV_MODEL),
            haiku_model: env(ENV_HAIKU_MODEL),
            sonnet_model: env(ENV_SONNET_MODEL),
            opus_model: env(ENV_OPUS_MODEL),
        }
    }

    /// 仅在新建时套用预设，编辑模式只切换供应商标记
    pub fn select_provider(&mut self, provider: ClaudeProvider) {
        self.provider = provider;
        if self.mode != EditMode::Create {
            return;
        }
        let preset = provider.preset();
        self.name = preset.name.to_string();
        self.url = preset.url.to_string();
        self.main_model = preset.main_model.to_string();
        self.haiku_model = preset.haiku_model.to_string();
        self.sonnet_model = preset.sonnet_model.to_string();
        self.opus_model = preset.opus_model.to_string();
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SwitchError::Validation(MSG_NAME_REQUIRED.to_string()));
        }
        if self.url.trim().is_empty() {
            return Err(SwitchError::Validation(MSG_URL_REQUIRED.to_string()));
        }
        Ok(())
    }

    pub fn to_settings(&self) -> Value {
        let mut env = Map::new();
        env.insert(ENV_BASE_URL.to_string(), json!(self.url));
        for (key, value) in [
            (ENV_AUTH_TOKEN, &self.api_key),
            (ENV_MODEL, &self.main_model),
            (ENV_HAIKU_MODEL, &self.haiku_model),
            (ENV_SONNET_MODEL, &self.sonnet_model),
            (ENV_OPUS_MODEL, &self.opus_model),
        ] {
            if !value.is_empty() {
                env.insert(key.to_string(), json!(value));
            }
        }
        json!({ "env": env })
    }
}

// ========== Codex ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodexPlatform {
    Tvc,
    LightAi,
    Custom,
}

impl CodexPlatform {
    pub const ALL: [CodexPlatform; 3] = [CodexPlatform::Tvc, CodexPlatform::LightAi, CodexPlatform::Custom];

    pub fn key(&self) -> &'static str {
        match self {
            CodexPlatform::Tvc => "tvc",
            CodexPlatform::LightAi => "lightai",
            CodexPlatform::Custom => "custom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CodexPlatform::Tvc => "TVC",
            CodexPlatform::LightAi => "LightAI",
            CodexPlatform::Custom => "Custom",
        }
    }

    pub fn from_key(key: &str) -> Self {
        match key {
            "tvc" => CodexPlatform::Tvc,
            "lightai" => CodexPlatform::LightAi,
            _ => CodexPlatform::Custom,
        }
    }

    pub fn default_url(&self) -> &'static str {
        match self {
            CodexPlatform::Tvc => "https://claude.tvc-mall.com/openai",
            CodexPlatform::LightAi => "https://api.lightai.io/v1",
            CodexPlatform::Custom => "",
        }
    }

    fn default_name(&self) -> Option<&'static str> {
        match self {
            CodexPlatform::Tvc => Some("TVC 配置"),
            CodexPlatform::LightAi => Some("LightAI 配置"),
            CodexPlatform::Custom => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodexForm {
    pub mode: EditMode,
    pub platform: CodexPlatform,
    pub name: String,
    pub url: String,
    pub model: String,
    pub api_key: String,
}

impl Default for CodexForm {
    fn default() -> Self {
        Self {
            mode: EditMode::Create,
            platform: CodexPlatform::Tvc,
            name: String::new(),
            url: CodexPlatform::Tvc.default_url().to_string(),
            model: CODEX_DEFAULT_MODEL.to_string(),
            api_key: String::new(),
        }
    }
}

impl CodexForm {
    pub fn edit(profile: &ConfigProfile) -> Self {
        let field = |key| profile.setting_value(key).unwrap_or_default().to_string();
        Self {
            mode: EditMode::Edit(profile.id.clone()),
            platform: CodexPlatform::from_key(profile.setting_value("platform").unwrap_or_default()),
            name: profile.title.clone(),
            url: field("url"),
            model: field("model"),
            api_key: field("api_key"),
        }
    }

    /// 切换平台总是重置地址与模型；新建且名称为空时填入默认名称
    pub fn select_platform(&mut self, platform: CodexPlatform) {
        self.platform = platform;
        if self.mode == EditMode::Create && self.name.is_empty() {
            if let Some(name) = platform.default_name() {
                self.name = name.to_string();
            }
        }
        self.url = platform.default_url().to_string();
        self.model = CODEX_DEFAULT_MODEL.to_string();
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(SwitchError::Validation(MSG_NAME_REQUIRED.to_string()));
        }
        if !self.name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SwitchError::Validation(MSG_NAME_ALNUM.to_string()));
        }
        Ok(())
    }

    pub fn to_settings(&self) -> Value {
        let mut settings = Map::new();
        settings.insert("platform".to_string(), json!(self.platform.key()));
        settings.insert("url".to_string(), json!(self.url));
        settings.insert("model".to_string(), json!(self.model));
        if !self.api_key.is_empty() {
            settings.insert("api_key".to_string(), json!(self.api_key));
        }
        settings.insert("approval_policy".to_string(), json!(CODEX_APPROVAL_POLICY));
        Value::Object(settings)
    }
}

// ========== 统一入口 ==========

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorForm {
    Claude(ClaudeForm),
    Codex(CodexForm),
}

impl EditorForm {
    pub fn create(ns: Namespace) -> Self {
        match ns {
            Namespace::Claude => EditorForm::Claude(ClaudeForm::default()),
            Namespace::Codex => EditorForm::Codex(CodexForm::default()),
        }
    }

    pub fn edit(ns: Namespace, profile: &ConfigProfile) -> Self {
        match ns {
            Namespace::Claude => EditorForm::Claude(ClaudeForm::edit(profile)),
            Namespace::Codex => EditorForm::Codex(CodexForm::edit(profile)),
        }
    }

    pub fn namespace(&self) -> Namespace {
        match self {
            EditorForm::Claude(_) => Namespace::Claude,
            EditorForm::Codex(_) => Namespace::Codex,
        }
    }

    pub fn mode(&self) -> &EditMode {
        match self {
            EditorForm::Claude(f) => &f.mode,
            EditorForm::Codex(f) => &f.mode,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EditorForm::Claude(f) => &f.name,
            EditorForm::Codex(f) => &f.name,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            EditorForm::Claude(f) => f.validate(),
            EditorForm::Codex(f) => f.validate(),
        }
    }

    pub fn to_settings(&self) -> Value {
        match self {
            EditorForm::Claude(f) => f.to_settings(),
            EditorForm::Codex(f) => f.to_settings(),
        }
    }

    /// 当前供应商 / 平台的显示名
    pub fn preset_label(&self) -> &'static str {
        match self {
            EditorForm::Claude(f) => f.provider.label(),
            EditorForm::Codex(f) => f.platform.label(),
        }
    }

    /// 循环切换到下一个供应商 / 平台
    pub fn cycle_preset(&mut self) {
        match self {
            EditorForm::Claude(f) => {
                let idx = ClaudeProvider::ALL.iter().position(|p| *p == f.provider).unwrap_or(0);
                f.select_provider(ClaudeProvider::ALL[(idx + 1) % ClaudeProvider::ALL.len()]);
            }
            EditorForm::Codex(f) => {
                let idx = CodexPlatform::ALL.iter().position(|p| *p == f.platform).unwrap_or(0);
                f.select_platform(CodexPlatform::ALL[(idx + 1) % CodexPlatform::ALL.len()]);
            }
        }
    }

    /// 可编辑的文本字段，(标签, 值)
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            EditorForm::Claude(f) => vec![
                ("Name", f.name.as_str()),
                ("Base URL", f.url.as_str()),
                ("Auth Token", f.api_key.as_str()),
                ("Main Model", f.main_model.as_str()),
                ("Haiku Model", f.haiku_model.as_str()),
                ("Sonnet Model", f.sonnet_model.as_str()),
                ("Opus Model", f.opus_model.as_str()),
            ],
            EditorForm::Codex(f) => vec![
                ("Name", f.name.as_str()),
                ("URL", f.url.as_str()),
                ("Model", f.model.as_str()),
                ("API Key", f.api_key.as_str()),
            ],
        }
    }

    pub fn field_mut(&mut self, index: usize) -> Option<&mut String> {
        match self {
            EditorForm::Claude(f) => match index {
                0 => Some(&mut f.name),
                1 => Some(&mut f.url),
                2 => Some(&mut f.api_key),
                3 => Some(&mut f.main_model),
                4 => Some(&mut f.haiku_model),
                5 => Some(&mut f.sonnet_model),
                6 => Some(&mut f.opus_model),
                _ => None,
            },
            EditorForm::Codex(f) => match index {
                0 => Some(&mut f.name),
                1 => Some(&mut f.url),
                2 => Some(&mut f.model),
                3 => Some(&mut f.api_key),
                _ => None,
            },
        }
    }

    /// 校验后创建或更新；校验失败时不发出任何后端调用
    pub async fn submit(&self, backend: &dyn Backend) -> Result<ConfigProfile> {
        self.validate()?;
        let ns = self.namespace();
        let settings = self.to_settings();
        match self.mode() {
            EditMode::Create => backend.create_profile(ns, self.name(), settings).await,
            EditMode::Edit(id) => backend.update_profile(ns, id, self.name(), settings).await,
        }
    }
}
