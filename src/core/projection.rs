use std::collections::HashMap;

use crate::models::{
    ConfigProfile, ConnectionStatus, Namespace, SystemEnvConfig, ENV_AUTH_TOKEN, ENV_BASE_URL,
};

/// 列表中的一项
#[derive(Debug, Clone, PartialEq)]
pub enum ListEntry {
    /// 新建入口
    Create,
    /// 合成的默认 / 原始配置项
    Default { active: bool },
    /// 合成的系统环境变量项（仅 Claude）
    SystemEnv { base_url: String },
    Profile {
        profile: ConfigProfile,
        active: bool,
        status: Option<ConnectionStatus>,
    },
}

impl ListEntry {
    pub fn is_active(&self) -> bool {
        match self {
            ListEntry::Default { active } | ListEntry::Profile { active, .. } => *active,
            _ => false,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ListEntry::Create => "+ New config".to_string(),
            ListEntry::Default { .. } => "Original Config".to_string(),
            ListEntry::SystemEnv { base_url } => format!("System Env ({})", base_url),
            ListEntry::Profile { profile, .. } => profile.title.clone(),
        }
    }
}

/// 合并后端档案列表与合成项：新建入口、默认项、系统环境项，随后是后端顺序的档案
pub fn project(
    ns: Namespace,
    profiles: &[ConfigProfile],
    system_env: Option<&SystemEnvConfig>,
    statuses: &HashMap<String, ConnectionStatus>,
) -> Vec<ListEntry> {
    let mut entries = Vec::with_capacity(profiles.len() + 3);
    entries.push(ListEntry::Create);
    entries.push(ListEntry::Default {
        active: !profiles.iter().any(|p| p.using),
    });

    if ns == Namespace::Claude {
        if let Some(env) = system_env.filter(|env| show_system_env(env, profiles)) {
            entries.push(ListEntry::SystemEnv {
                base_url: env.base_url.clone().unwrap_or_default(),
            });
        }
    }

    entries.extend(profiles.iter().map(|p| ListEntry::Profile {
        profile: p.clone(),
        active: p.using,
        status: statuses.get(&p.id).cloned(),
    }));
    entries
}

/// 系统环境项在 has_config 时显示，但若已有档案的 base_url 与 auth_token 与之完全相同则隐藏
pub fn show_system_env(env: &SystemEnvConfig, profiles: &[ConfigProfile]) -> bool {
    if !env.has_config {
        return false;
    }
    !profiles.iter().any(|p| {
        p.env_value(ENV_BASE_URL) == env.base_url.as_deref()
            && p.env_value(ENV_AUTH_TOKEN) == env.auth_token.as_deref()
    })
}
