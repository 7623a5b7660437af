use std::ffi::OsStr;
use std::path::Path;

use crate::models::{
    SystemEnvConfig, ENV_AUTH_TOKEN, ENV_BASE_URL, ENV_HAIKU_MODEL, ENV_MODEL, ENV_OPUS_MODEL,
    ENV_SONNET_MODEL,
};

/// 从进程环境变量读取 Claude 连接配置
pub fn read_system_env() -> SystemEnvConfig {
    system_env_from(|key| std::env::var(key).ok())
}

/// 以任意查找函数构造，`has_config` 仅在 base_url 与 auth_token 同时存在时为真
pub fn system_env_from<F>(lookup: F) -> SystemEnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let base_url = lookup(ENV_BASE_URL);
    let auth_token = lookup(ENV_AUTH_TOKEN);

    SystemEnvConfig {
        has_config: base_url.is_some() && auth_token.is_some(),
        base_url,
        auth_token,
        main_model: lookup(ENV_MODEL),
        haiku_model: lookup(ENV_HAIKU_MODEL),
        sonnet_model: lookup(ENV_SONNET_MODEL),
        opus_model: lookup(ENV_OPUS_MODEL),
    }
}

/// 把系统环境配置转换成可存储的 Claude 档案设置
pub fn system_env_settings(env: &SystemEnvConfig) -> serde_json::Value {
    let mut vars = serde_json::Map::new();
    let pairs = [
        (ENV_BASE_URL, &env.base_url),
        (ENV_AUTH_TOKEN, &env.auth_token),
        (ENV_MODEL, &env.main_model),
        (ENV_HAIKU_MODEL, &env.haiku_model),
        (ENV_SONNET_MODEL, &env.sonnet_model),
        (ENV_OPUS_MODEL, &env.opus_model),
    ];
    for (key, value) in pairs {
        if let Some(v) = value {
            vars.insert(key.to_string(), serde_json::Value::String(v.clone()));
        }
    }
    serde_json::json!({ "env": vars })
}

/// 在 PATH 的各个目录中查找可执行文件（Windows 下同时尝试常见扩展名）
pub fn command_in_path(command: &str, path_var: Option<&OsStr>) -> bool {
    let command = command.trim();
    if command.is_empty() {
        return false;
    }
    let Some(path_var) = path_var else {
        return false;
    };

    let names: Vec<String> = if cfg!(windows) {
        ["", ".exe", ".cmd", ".bat"]
            .iter()
            .map(|ext| format!("{}{}", command, ext))
            .collect()
    } else {
        vec![command.to_string()]
    };

    std::env::split_paths(path_var)
        .any(|dir| names.iter().any(|name| is_executable(&dir.join(name))))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_has_config_needs_url_and_token() {
        let env = system_env_from(lookup(&[(ENV_BASE_URL, "https://x")]));
        assert!(!env.has_config);

        let env = system_env_from(lookup(&[(ENV_BASE_URL, "https://x"), (ENV_AUTH_TOKEN, "t")]));
        assert!(env.has_config);
        assert_eq!(env.base_url.as_deref(), Some("https://x"));
    }

    #[test]
    fn test_settings_skip_missing_models() {
        let env = system_env_from(lookup(&[
            (ENV_BASE_URL, "https://x"),
            (ENV_AUTH_TOKEN, "t"),
            (ENV_MODEL, "m"),
        ]));
        let settings = system_env_settings(&env);
        assert_eq!(
            settings,
            serde_json::json!({"env": {ENV_BASE_URL: "https://x", ENV_AUTH_TOKEN: "t", ENV_MODEL: "m"}})
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_command_in_path() {
        use std::os::unix::fs::PermissionsExt;
        let bin = tempfile::TempDir::new().unwrap();
        let other = tempfile::TempDir::new().unwrap();
        let tool = bin.path().join("codex");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(bin.path().join("notes"), "").unwrap();

        let path_var = std::env::join_paths([other.path(), bin.path()]).unwrap();
        assert!(command_in_path("codex", Some(&path_var)));
        // 没有执行权限的文件不算
        assert!(!command_in_path("notes", Some(&path_var)));
        assert!(!command_in_path("missing", Some(&path_var)));
        assert!(!command_in_path("", Some(&path_var)));
        assert!(!command_in_path("codex", None));
    }
}
