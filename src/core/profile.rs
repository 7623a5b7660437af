use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Result, SwitchError};
use crate::models::{ConfigProfile, StoresFile};
use crate::storage::JsonFile;

pub type ProfileFile = JsonFile<StoresFile>;

/// 创建档案。新档案总是非激活状态。
/// 写时持久化：先修改内存，保存成功则完成，失败则回滚。
pub fn create_profile(
    store: &mut ProfileFile,
    title: &str,
    settings: serde_json::Value,
) -> Result<ConfigProfile> {
    let title = title.trim();
    if title.is_empty() {
        return Err(SwitchError::Validation("title cannot be empty".to_string()));
    }

    let profile = ConfigProfile {
        id: uuid::Uuid::new_v4().to_string(),
        title: title.to_string(),
        created_at: now_millis(),
        settings,
        using: false,
    };

    store.state_mut().configs.push(profile.clone());

    if let Err(e) = store.save() {
        store.state_mut().configs.pop();
        return Err(e);
    }

    Ok(profile)
}

/// 按创建时间升序列出档案（时间相同保持插入顺序）
pub fn list_profiles(store: &ProfileFile) -> Vec<ConfigProfile> {
    let mut profiles = store.state().configs.clone();
    profiles.sort_by_key(|p| p.created_at);
    profiles
}

pub fn get_profile<'a>(store: &'a ProfileFile, id: &str) -> Result<&'a ConfigProfile> {
    store
        .state()
        .configs
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| SwitchError::ProfileNotFound(id.to_string()))
}

/// 当前激活的档案
pub fn active_profile(store: &ProfileFile) -> Option<&ConfigProfile> {
    store.state().configs.iter().find(|p| p.using)
}

/// 更新标题与设置，`using` 标志保持不变。
/// 写时持久化，失败回滚。
pub fn update_profile(
    store: &mut ProfileFile,
    id: &str,
    title: &str,
    settings: serde_json::Value,
) -> Result<ConfigProfile> {
    let title = title.trim();
    if title.is_empty() {
        return Err(SwitchError::Validation("title cannot be empty".to_string()));
    }

    let pos = position(store, id)?;
    let previous = store.state().configs[pos].clone();

    {
        let profile = &mut store.state_mut().configs[pos];
        profile.title = title.to_string();
        profile.settings = settings;
    }

    if let Err(e) = store.save() {
        store.state_mut().configs[pos] = previous;
        return Err(e);
    }

    Ok(store.state().configs[pos].clone())
}

/// 删除档案，返回被删除的记录。不可恢复。
/// 写时持久化，失败回滚。
pub fn delete_profile(store: &mut ProfileFile, id: &str) -> Result<ConfigProfile> {
    let pos = position(store, id)?;
    let removed = store.state_mut().configs.remove(pos);

    if let Err(e) = store.save() {
        store.state_mut().configs.insert(pos, removed);
        return Err(e);
    }

    Ok(removed)
}

/// 设置激活档案：`Some(id)` 激活该档案并取消其余档案，`None` 全部取消（回到默认配置）。
/// 返回新激活的档案。写时持久化，失败回滚。
pub fn set_active(store: &mut ProfileFile, id: Option<&str>) -> Result<Option<ConfigProfile>> {
    if let Some(id) = id {
        position(store, id)?;
    }

    let snapshot: Vec<bool> = store.state().configs.iter().map(|p| p.using).collect();

    for profile in &mut store.state_mut().configs {
        profile.using = Some(profile.id.as_str()) == id;
    }

    if let Err(e) = store.save() {
        for (profile, using) in store.state_mut().configs.iter_mut().zip(snapshot) {
            profile.using = using;
        }
        return Err(e);
    }

    Ok(active_profile(store).cloned())
}

fn position(store: &ProfileFile, id: &str) -> Result<usize> {
    store
        .state()
        .configs
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| SwitchError::ProfileNotFound(id.to_string()))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
