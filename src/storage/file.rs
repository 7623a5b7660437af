use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, SwitchError};

/// 存储引擎：内存状态 + JSON 文件持久化
pub struct JsonFile<T> {
    state: T,
    file_path: PathBuf,
}

impl<T> JsonFile<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// 从 JSON 文件加载状态。文件不存在则初始化默认状态，文件损坏则记录警告并初始化默认状态。
    pub fn load(file_path: &Path) -> Self {
        let state = if file_path.exists() {
            match std::fs::read_to_string(file_path) {
                Ok(content) if content.trim().is_empty() => T::default(),
                Ok(content) => match serde_json::from_str::<T>(&content) {
                    Ok(state) => state,
                    Err(e) => {
                        tracing::warn!(path = %file_path.display(), "配置文件损坏，初始化默认状态: {}", e);
                        T::default()
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %file_path.display(), "无法读取配置文件，初始化默认状态: {}", e);
                    T::default()
                }
            }
        } else {
            T::default()
        };

        Self {
            state,
            file_path: file_path.to_path_buf(),
        }
    }

    /// 将内存状态序列化为 JSON 写入文件
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.state)
            .map_err(|e| SwitchError::StorageError(e.to_string()))?;

        // 确保父目录存在
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(&self.file_path, json)?;
        Ok(())
    }

    pub fn state(&self) -> &T {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut T {
        &mut self.state
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}
