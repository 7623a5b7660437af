pub mod apply;
pub mod diagnostics;
pub mod editor;
pub mod env;
pub mod notice;
pub mod probe_target;
pub mod prober;
pub mod profile;
pub mod projection;
pub mod selector;
pub mod session;

use std::path::{Path, PathBuf};

use crate::error::{Result, SwitchError};
use crate::models::{CodexGlobalSettings, ConfigProfile, Namespace};
use crate::paths::Paths;
use crate::storage::JsonFile;

use profile::ProfileFile;

/// 配置中心：两个命名空间的档案文件 + Codex 全局设置，负责把激活档案落到工具配置中
pub struct ProfileCenter {
    paths: Paths,
    claude: ProfileFile,
    codex: ProfileFile,
    codex_settings: JsonFile<Option<CodexGlobalSettings>>,
}

impl ProfileCenter {
    pub fn new(paths: Paths) -> Self {
        let claude = JsonFile::load(&paths.claude_stores());
        let codex = JsonFile::load(&paths.codex_stores());
        let codex_settings = JsonFile::load(&paths.codex_settings());
        Self {
            paths,
            claude,
            codex,
            codex_settings,
        }
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// 创建应用目录，并在首次运行时备份 `.claude`
    pub fn initialize(&self) -> Result<()> {
        std::fs::create_dir_all(self.paths.app_dir())?;
        if apply::backup_claude_dir(self.paths.claude_dir(), &self.paths.claude_backup())? {
            tracing::info!(backup = %self.paths.claude_backup().display(), "已备份 Claude 配置目录");
        }
        Ok(())
    }

    fn store(&self, ns: Namespace) -> &ProfileFile {
        match ns {
            Namespace::Claude => &self.claude,
            Namespace::Codex => &self.codex,
        }
    }

    fn store_mut(&mut self, ns: Namespace) -> &mut ProfileFile {
        match ns {
            Namespace::Claude => &mut self.claude,
            Namespace::Codex => &mut self.codex,
        }
    }

    pub fn list_profiles(&self, ns: Namespace) -> Vec<ConfigProfile> {
        profile::list_profiles(self.store(ns))
    }

    pub fn get_profile(&self, ns: Namespace, id: &str) -> Result<ConfigProfile> {
        profile::get_profile(self.store(ns), id).cloned()
    }

    pub fn current_profile(&self, ns: Namespace) -> Option<ConfigProfile> {
        profile::active_profile(self.store(ns)).cloned()
    }

    pub fn create_profile(
        &mut self,
        ns: Namespace,
        title: &str,
        settings: serde_json::Value,
    ) -> Result<ConfigProfile> {
        let created = profile::create_profile(self.store_mut(ns), title, settings)?;
        tracing::info!(namespace = %ns, id = %created.id, "创建档案");
        Ok(created)
    }

    /// 更新档案；若它正处于激活状态，同时重新写入工具配置
    pub fn update_profile(
        &mut self,
        ns: Namespace,
        id: &str,
        title: &str,
        settings: serde_json::Value,
    ) -> Result<ConfigProfile> {
        let updated = profile::update_profile(self.store_mut(ns), id, title, settings)?;
        if updated.using {
            self.apply(ns, Some(&updated))?;
        }
        Ok(updated)
    }

    pub fn delete_profile(&mut self, ns: Namespace, id: &str) -> Result<()> {
        let removed = profile::delete_profile(self.store_mut(ns), id)?;
        tracing::info!(namespace = %ns, id = %removed.id, was_active = removed.using, "删除档案");
        Ok(())
    }

    /// 设置激活档案，`None` 表示回到默认配置。
    /// 先写工具配置，成功后再持久化 `using` 标志。
    pub fn set_active(&mut self, ns: Namespace, id: Option<&str>) -> Result<()> {
        if ns == Namespace::Codex && id.is_some() && !self.codex_settings().enabled {
            return Err(SwitchError::FeatureDisabled(
                "codex is disabled in global settings".to_string(),
            ));
        }

        let target = match id {
            Some(id) => Some(self.get_profile(ns, id)?),
            None => None,
        };

        // 工具配置与 using 标志要么都生效，要么都还原
        let snapshot = apply::FileSnapshot::capture(self.tool_files(ns))?;
        let result = self
            .apply(ns, target.as_ref())
            .and_then(|()| profile::set_active(self.store_mut(ns), id).map(|_| ()));
        if let Err(e) = result {
            if let Err(restore_err) = snapshot.restore() {
                tracing::error!(namespace = %ns, "还原工具配置失败: {}", restore_err);
            }
            return Err(e);
        }

        tracing::info!(namespace = %ns, target = id.unwrap_or("default"), "切换激活档案");
        Ok(())
    }

    /// 切换时可能被改写的工具配置文件
    fn tool_files(&self, ns: Namespace) -> Vec<PathBuf> {
        match ns {
            Namespace::Claude => vec![self.paths.claude_settings()],
            Namespace::Codex => {
                let root = PathBuf::from(self.codex_settings().root_path);
                vec![root.join("auth.json"), root.join("config.toml")]
            }
        }
    }

    fn apply(&self, ns: Namespace, target: Option<&ConfigProfile>) -> Result<()> {
        match (ns, target) {
            (Namespace::Claude, Some(p)) => {
                apply::apply_claude_settings(&self.paths.claude_settings(), &p.settings)
            }
            (Namespace::Claude, None) => apply::reset_claude_settings(&self.paths.claude_settings()),
            (Namespace::Codex, Some(p)) => {
                let settings = self.codex_settings();
                if !settings.enabled {
                    return Ok(());
                }
                apply::apply_codex_profile(Path::new(&settings.root_path), &p.title, &p.settings)
            }
            // Codex 没有可回退的原始文件
            (Namespace::Codex, None) => Ok(()),
        }
    }

    pub fn codex_settings(&self) -> CodexGlobalSettings {
        self.codex_settings
            .state()
            .clone()
            .unwrap_or_else(|| self.paths.default_codex_settings())
    }

    /// 写时持久化，失败回滚
    pub fn update_codex_settings(&mut self, settings: CodexGlobalSettings) -> Result<()> {
        if settings.root_path.trim().is_empty() {
            return Err(SwitchError::Validation("root path cannot be empty".to_string()));
        }
        let previous = self.codex_settings.state_mut().replace(settings);
        if let Err(e) = self.codex_settings.save() {
            *self.codex_settings.state_mut() = previous;
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_center(tmp: &TempDir) -> ProfileCenter {
        ProfileCenter::new(Paths::from_home(tmp.path()))
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let tmp = TempDir::new().unwrap();
        let mut center = test_center(&tmp);
        center.create_profile(Namespace::Claude, "c", json!({})).unwrap();

        assert_eq!(center.list_profiles(Namespace::Claude).len(), 1);
        assert!(center.list_profiles(Namespace::Codex).is_empty());
    }

    #[test]
    fn test_activate_claude_writes_settings() {
        let tmp = TempDir::new().unwrap();
        let mut center = test_center(&tmp);
        let p = center
            .create_profile(
                Namespace::Claude,
                "glm",
                json!({"env": {"ANTHROPIC_BASE_URL": "https://open.bigmodel.cn/api/anthropic"}}),
            )
            .unwrap();

        center.set_active(Namespace::Claude, Some(&p.id)).unwrap();

        let settings = read_json(&tmp.path().join(".claude/settings.json"));
        assert_eq!(
            settings["env"]["ANTHROPIC_BASE_URL"],
            "https://open.bigmodel.cn/api/anthropic"
        );
        assert_eq!(center.current_profile(Namespace::Claude).unwrap().id, p.id);
    }

    #[test]
    fn test_reset_claude_clears_env() {
        let tmp = TempDir::new().unwrap();
        let mut center = test_center(&tmp);
        let p = center
            .create_profile(Namespace::Claude, "a", json!({"env": {"ANTHROPIC_BASE_URL": "u"}}))
            .unwrap();
        center.set_active(Namespace::Claude, Some(&p.id)).unwrap();
        center.set_active(Namespace::Claude, None).unwrap();

        let settings = read_json(&tmp.path().join(".claude/settings.json"));
        assert_eq!(settings["env"], json!({}));
        assert!(center.current_profile(Namespace::Claude).is_none());
    }

    #[test]
    fn test_update_active_profile_reapplies() {
        let tmp = TempDir::new().unwrap();
        let mut center = test_center(&tmp);
        let p = center
            .create_profile(Namespace::Claude, "a", json!({"env": {"ANTHROPIC_BASE_URL": "u1"}}))
            .unwrap();
        center.set_active(Namespace::Claude, Some(&p.id)).unwrap();
        center
            .update_profile(Namespace::Claude, &p.id, "a", json!({"env": {"ANTHROPIC_BASE_URL": "u2"}}))
            .unwrap();

        let settings = read_json(&tmp.path().join(".claude/settings.json"));
        assert_eq!(settings["env"]["ANTHROPIC_BASE_URL"], "u2");
    }

    #[test]
    fn test_codex_activation_rejected_when_disabled() {
        let tmp = TempDir::new().unwrap();
        let mut center = test_center(&tmp);
        let p = center.create_profile(Namespace::Codex, "w", json!({"url": "u"})).unwrap();
        let mut settings = center.codex_settings();
        settings.enabled = false;
        center.update_codex_settings(settings).unwrap();

        let err = center.set_active(Namespace::Codex, Some(&p.id)).unwrap_err();
        assert!(matches!(err, SwitchError::FeatureDisabled(_)));
        assert!(center.current_profile(Namespace::Codex).is_none());
    }

    #[test]
    fn test_codex_activation_writes_root_files() {
        let tmp = TempDir::new().unwrap();
        let mut center = test_center(&tmp);
        let p = center
            .create_profile(Namespace::Codex, "Work", json!({"url": "https://x/v1", "api_key": "k"}))
            .unwrap();

        center.set_active(Namespace::Codex, Some(&p.id)).unwrap();

        assert!(tmp.path().join(".codex/auth.json").exists());
        assert!(tmp.path().join(".codex/config.toml").exists());
    }

    #[test]
    fn test_codex_settings_default_and_persist() {
        let tmp = TempDir::new().unwrap();
        let mut center = test_center(&tmp);
        assert!(center.codex_settings().enabled);

        center
            .update_codex_settings(CodexGlobalSettings {
                enabled: false,
                root_path: "/tmp/codex".to_string(),
            })
            .unwrap();

        let reloaded = test_center(&tmp);
        assert!(!reloaded.codex_settings().enabled);
        assert_eq!(reloaded.codex_settings().root_path, "/tmp/codex");
    }

    #[test]
    fn test_codex_settings_empty_root_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut center = test_center(&tmp);
        let err = center
            .update_codex_settings(CodexGlobalSettings {
                enabled: true,
                root_path: " ".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, SwitchError::Validation(_)));
    }

    #[test]
    fn test_initialize_creates_app_dir() {
        let tmp = TempDir::new().unwrap();
        let center = test_center(&tmp);
        center.initialize().unwrap();
        assert!(tmp.path().join(".ccconfig").is_dir());
    }

    #[test]
    fn test_failed_flag_save_restores_live_settings() {
        let tmp = TempDir::new().unwrap();
        let mut center = test_center(&tmp);
        let settings_path = tmp.path().join(".claude/settings.json");
        std::fs::create_dir_all(settings_path.parent().unwrap()).unwrap();
        let original = r#"{"env": {"ANTHROPIC_BASE_URL": "https://old"}, "model": "opus"}"#;
        std::fs::write(&settings_path, original).unwrap();
        let p = center
            .create_profile(Namespace::Claude, "new", json!({"env": {"ANTHROPIC_BASE_URL": "https://new"}}))
            .unwrap();

        // 应用目录被同名文件占据，保存 using 标志必然失败
        let app_dir = tmp.path().join(".ccconfig");
        std::fs::remove_dir_all(&app_dir).unwrap();
        std::fs::write(&app_dir, "").unwrap();

        assert!(center.set_active(Namespace::Claude, Some(&p.id)).is_err());
        assert!(center.current_profile(Namespace::Claude).is_none());
        assert_eq!(std::fs::read_to_string(&settings_path).unwrap(), original);
    }

    #[test]
    fn test_failed_codex_switch_removes_new_files() {
        let tmp = TempDir::new().unwrap();
        let mut center = test_center(&tmp);
        let p = center
            .create_profile(Namespace::Codex, "Work", json!({"url": "https://x/v1", "api_key": "k"}))
            .unwrap();

        let app_dir = tmp.path().join(".ccconfig");
        std::fs::remove_dir_all(&app_dir).unwrap();
        std::fs::write(&app_dir, "").unwrap();

        assert!(center.set_active(Namespace::Codex, Some(&p.id)).is_err());
        assert!(!tmp.path().join(".codex/auth.json").exists());
        assert!(!tmp.path().join(".codex/config.toml").exists());
    }
}
