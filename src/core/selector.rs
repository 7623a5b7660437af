//! 激活档案选择器：保证命名空间内至多一个激活项。
//!
//! 状态为 `Default` 或 `Profile(id)`，只有在后端确认（重新拉取列表）后才迁移。
//! 重叠的激活请求默认不加锁，以最后返回的列表为准；`Exclusive` 策略下
//! 第二个请求在第一个未完成前被拒绝。

use std::sync::{Arc, Mutex, MutexGuard};

use super::notice::Notice;
use crate::backend::Backend;
use crate::error::{Result, SwitchError};
use crate::models::{ConfigProfile, Namespace};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Default,
    Profile(String),
}

impl Selection {
    /// 没有档案处于 using 状态时即为默认项
    pub fn of(profiles: &[ConfigProfile]) -> Self {
        profiles
            .iter()
            .find(|p| p.using)
            .map(|p| Selection::Profile(p.id.clone()))
            .unwrap_or(Selection::Default)
    }

    fn as_id(&self) -> Option<&str> {
        match self {
            Selection::Default => None,
            Selection::Profile(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationPolicy {
    #[default]
    Overlapping,
    Exclusive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// 目标已是激活项，未发出命令
    Unchanged,
    Activated(Selection),
    Rejected(Notice),
}

#[derive(Default)]
struct SelectorState {
    profiles: Vec<ConfigProfile>,
    in_flight: usize,
}

fn lock_state(state: &Mutex<SelectorState>) -> MutexGuard<'_, SelectorState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// 在途计数的占位，drop 时归还（包括 future 被取消的情况）
struct InFlight {
    state: Arc<Mutex<SelectorState>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut state = lock_state(&self.state);
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

#[derive(Clone)]
pub struct ActiveSelector {
    ns: Namespace,
    backend: Arc<dyn Backend>,
    policy: ActivationPolicy,
    state: Arc<Mutex<SelectorState>>,
}

impl ActiveSelector {
    pub fn new(ns: Namespace, backend: Arc<dyn Backend>, policy: ActivationPolicy) -> Self {
        Self {
            ns,
            backend,
            policy,
            state: Arc::new(Mutex::new(SelectorState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SelectorState> {
        lock_state(&self.state)
    }

    pub fn namespace(&self) -> Namespace {
        self.ns
    }

    /// 从后端重新拉取列表，后端是唯一可信来源
    pub async fn refresh(&self) -> Result<Vec<ConfigProfile>> {
        let profiles = self.backend.list_profiles(self.ns).await?;
        self.lock().profiles = profiles.clone();
        Ok(profiles)
    }

    pub fn profiles(&self) -> Vec<ConfigProfile> {
        self.lock().profiles.clone()
    }

    pub fn selection(&self) -> Selection {
        Selection::of(&self.lock().profiles)
    }

    pub fn is_pending(&self) -> bool {
        self.lock().in_flight > 0
    }

    pub async fn activate(&self, target: Selection) -> ActivationOutcome {
        let _in_flight = {
            let mut state = self.lock();
            if Selection::of(&state.profiles) == target {
                return ActivationOutcome::Unchanged;
            }
            if let Selection::Profile(id) = &target {
                if !state.profiles.iter().any(|p| &p.id == id) {
                    return ActivationOutcome::Rejected(Notice::error(format!(
                        "Config not found: {}",
                        id
                    )));
                }
            }
            if self.policy == ActivationPolicy::Exclusive && state.in_flight > 0 {
                return ActivationOutcome::Rejected(Notice::warning(
                    SwitchError::ActivationPending(self.ns.to_string()).to_string(),
                ));
            }
            state.in_flight += 1;
            InFlight {
                state: Arc::clone(&self.state),
            }
        };

        self.issue(&target).await
    }

    async fn issue(&self, target: &Selection) -> ActivationOutcome {
        if self.ns == Namespace::Codex && target.as_id().is_some() {
            match self.backend.codex_global_settings().await {
                Ok(settings) if !settings.enabled => {
                    return ActivationOutcome::Rejected(Notice::error(
                        "Please enable Codex in Global Settings first.",
                    ));
                }
                Ok(_) => {}
                Err(e) => {
                    return ActivationOutcome::Rejected(Notice::error(format!(
                        "Failed to read Codex settings: {}",
                        e
                    )));
                }
            }
        }

        if let Err(e) = self.backend.set_active_profile(self.ns, target.as_id()).await {
            tracing::warn!(namespace = %self.ns, "切换失败: {}", e);
            return ActivationOutcome::Rejected(Notice::error(format!(
                "Failed to switch config: {}",
                e
            )));
        }

        match self.refresh().await {
            Ok(profiles) => ActivationOutcome::Activated(Selection::of(&profiles)),
            Err(e) => ActivationOutcome::Rejected(Notice::warning(format!(
                "Config switched, but refreshing the list failed: {}",
                e
            ))),
        }
    }
}
