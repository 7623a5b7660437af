use std::path::{Path, PathBuf};

use crate::error::{Result, SwitchError};
use crate::models::CodexGlobalSettings;

/// 应用配置目录名（位于 home 下）
pub const APP_DIR_NAME: &str = ".ccconfig";

/// 覆盖 home 目录的环境变量，主要用于测试和便携部署
pub const HOME_OVERRIDE_ENV: &str = "CONFIG_SWITCHER_HOME";

/// 所有落盘文件的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    home: PathBuf,
    app_dir: PathBuf,
    claude_dir: PathBuf,
}

impl Paths {
    /// 优先使用 `CONFIG_SWITCHER_HOME`，否则取系统 home 目录
    pub fn discover() -> Result<Self> {
        if let Ok(home) = std::env::var(HOME_OVERRIDE_ENV) {
            if !home.trim().is_empty() {
                return Ok(Self::from_home(Path::new(&home)));
            }
        }
        let home = dirs::home_dir()
            .ok_or_else(|| SwitchError::StorageError("could not find home directory".to_string()))?;
        Ok(Self::from_home(&home))
    }

    pub fn from_home(home: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
            app_dir: home.join(APP_DIR_NAME),
            claude_dir: home.join(".claude"),
        }
    }

    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    pub fn claude_dir(&self) -> &Path {
        &self.claude_dir
    }

    pub fn claude_stores(&self) -> PathBuf {
        self.app_dir.join("stores.json")
    }

    pub fn codex_stores(&self) -> PathBuf {
        self.app_dir.join("codexcc.json")
    }

    pub fn codex_settings(&self) -> PathBuf {
        self.app_dir.join("codex_settings.json")
    }

    pub fn preferences(&self) -> PathBuf {
        self.app_dir.join("preferences.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.app_dir.join("config-switcher.log")
    }

    pub fn claude_settings(&self) -> PathBuf {
        self.claude_dir.join("settings.json")
    }

    pub fn claude_backup(&self) -> PathBuf {
        self.app_dir.join("claude_backup")
    }

    /// Codex 全局设置缺省值，root_path 指向该 home 下的 `.codex`
    pub fn default_codex_settings(&self) -> CodexGlobalSettings {
        CodexGlobalSettings {
            enabled: true,
            root_path: self.home.join(".codex").to_string_lossy().to_string(),
        }
    }
}
