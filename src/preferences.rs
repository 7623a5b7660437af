//! 界面偏好：启动时加载，修改时立即保存

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::selector::ActivationPolicy;
use crate::error::Result;
use crate::storage::JsonFile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// 加载列表后自动探测连通性
    pub auto_probe: bool,
    /// 切换未完成时拒绝新的切换
    pub exclusive_switch: bool,
    pub last_panel: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            auto_probe: true,
            exclusive_switch: false,
            last_panel: None,
        }
    }
}

impl Preferences {
    pub fn activation_policy(&self) -> ActivationPolicy {
        if self.exclusive_switch {
            ActivationPolicy::Exclusive
        } else {
            ActivationPolicy::Overlapping
        }
    }
}

pub struct PreferenceStore {
    file: JsonFile<Preferences>,
}

impl PreferenceStore {
    pub fn load(path: &Path) -> Self {
        Self {
            file: JsonFile::load(path),
        }
    }

    pub fn get(&self) -> &Preferences {
        self.file.state()
    }

    /// 修改并持久化，保存失败时回滚
    pub fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Preferences),
    {
        let snapshot = self.file.state().clone();
        f(self.file.state_mut());
        if let Err(e) = self.file.save() {
            *self.file.state_mut() = snapshot;
            return Err(e);
        }
        Ok(())
    }
}
