use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

use crate::error::{Result, SwitchError};

const DEFAULT_CODEX_MODEL: &str = "gpt-5-codex";
const DEFAULT_CODEX_URL: &str = "https://api.lightai.io/v1";

/// 把档案设置合并进 Claude 的 settings.json：只覆盖档案中出现的顶层键
pub fn apply_claude_settings(settings_path: &Path, settings: &Value) -> Result<()> {
    let mut existing = read_json_or_empty(settings_path)?;

    match (settings.as_object(), existing.as_object_mut()) {
        (Some(incoming), Some(current)) => {
            for (key, value) in incoming {
                current.insert(key.clone(), value.clone());
            }
        }
        // 任一方不是对象时整体替换
        _ => existing = settings.clone(),
    }

    write_json(settings_path, &existing)
}

/// 回到默认配置：清空 settings.json 的 env 字段，其余键保留
pub fn reset_claude_settings(settings_path: &Path) -> Result<()> {
    let mut existing = read_json_or_empty(settings_path)?;
    if let Some(obj) = existing.as_object_mut() {
        obj.insert("env".to_string(), json!({}));
    }
    write_json(settings_path, &existing)
}

/// 写入 Codex 的 auth.json（有 api_key 时）与 config.toml
pub fn apply_codex_profile(root: &Path, title: &str, config: &Value) -> Result<()> {
    let config = config
        .as_object()
        .ok_or_else(|| SwitchError::Validation("invalid codex config format".to_string()))?;

    std::fs::create_dir_all(root)?;

    if let Some(api_key) = config.get("api_key").and_then(|v| v.as_str()) {
        write_json(&root.join("auth.json"), &json!({ "OPENAI_API_KEY": api_key }))?;
    }

    let model = str_or(config, "model", DEFAULT_CODEX_MODEL);
    let url = str_or(config, "url", DEFAULT_CODEX_URL);
    std::fs::write(root.join("config.toml"), codex_config_toml(title, model, url))?;

    Ok(())
}

fn codex_config_toml(name: &str, model: &str, url: &str) -> String {
    format!(
        r#"model_provider = "{name}"
model = "{model}"
model_reasoning_effort = "high"
disable_response_storage = true
windows_wsl_setup_acknowledged = true

[model_providers.{name}]
name = "{name}"
base_url = "{url}"
wire_api = "responses"
requires_openai_auth = true
"#
    )
}

/// 工具配置文件切换前的原始内容；`None` 表示文件原本不存在
pub struct FileSnapshot {
    files: Vec<(PathBuf, Option<Vec<u8>>)>,
}

impl FileSnapshot {
    pub fn capture(paths: Vec<PathBuf>) -> Result<Self> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let content = match std::fs::read(&path) {
                Ok(bytes) => Some(bytes),
                Err(e) if e.kind() == ErrorKind::NotFound => None,
                Err(e) => return Err(e.into()),
            };
            files.push((path, content));
        }
        Ok(Self { files })
    }

    /// 逐个写回原始内容，原本不存在的文件被删除
    pub fn restore(&self) -> Result<()> {
        for (path, content) in &self.files {
            match content {
                Some(bytes) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(path, bytes)?;
                }
                None => match std::fs::remove_file(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                },
            }
        }
        Ok(())
    }
}

/// 首次运行时把 `.claude` 目录下的文件备份一次。已有备份则跳过，返回是否执行了备份。
pub fn backup_claude_dir(claude_dir: &Path, backup_dir: &Path) -> Result<bool> {
    if !claude_dir.exists() || backup_dir.exists() {
        return Ok(false);
    }

    std::fs::create_dir_all(backup_dir)?;
    for entry in std::fs::read_dir(claude_dir)? {
        let source = entry?.path();
        if !source.is_file() {
            continue;
        }
        if let Some(name) = source.file_name() {
            std::fs::copy(&source, backup_dir.join(name))?;
        }
    }
    Ok(true)
}

fn str_or<'a>(config: &'a Map<String, Value>, key: &str, default: &'a str) -> &'a str {
    config.get(key).and_then(|v| v.as_str()).unwrap_or(default)
}

fn read_json_or_empty(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    Ok(serde_json::from_str(&content)?)
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
