//! 连通性探测：对列表中每个档案并发发起独立探测，结果按 id 写入各自的槽位。
//!
//! 任何失败（后端错误、超时、空地址）都降级为 [`ConnectionStatus::check_failed`]，
//! 不向调用方传播。同一 id 已在探测中时不会重复发起。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::probe_target::ProbeTarget;
use crate::backend::Backend;
use crate::models::{ConfigProfile, ConnectionStatus, Namespace};

#[derive(Default)]
struct ProbeBoard {
    checking: HashSet<String>,
    statuses: HashMap<String, ConnectionStatus>,
    /// 上一次触发探测时的列表指纹
    seen: Option<Vec<(String, ProbeTarget)>>,
    /// 每次 clear 递增，之前发起的探测结果不再写入
    epoch: u64,
}

impl ProbeBoard {
    /// 结果只写给仍在列表中的档案
    fn accepts(&self, id: &str, epoch: u64) -> bool {
        self.epoch == epoch
            && self
                .seen
                .as_ref()
                .map_or(true, |seen| seen.iter().any(|(seen_id, _)| seen_id == id))
    }
}

#[derive(Clone)]
pub struct HealthProber {
    backend: Arc<dyn Backend>,
    runtime: Handle,
    board: Arc<Mutex<ProbeBoard>>,
}

fn lock(board: &Mutex<ProbeBoard>) -> MutexGuard<'_, ProbeBoard> {
    board.lock().unwrap_or_else(|e| e.into_inner())
}

impl HealthProber {
    pub fn new(backend: Arc<dyn Backend>, runtime: Handle) -> Self {
        Self {
            backend,
            runtime,
            board: Arc::new(Mutex::new(ProbeBoard::default())),
        }
    }

    /// 为单个档案发起探测；该 id 已在探测中则返回 `None`
    pub fn probe(&self, id: &str, target: ProbeTarget) -> Option<JoinHandle<()>> {
        let epoch = {
            let mut board = lock(&self.board);
            if !board.checking.insert(id.to_string()) {
                return None;
            }
            board.epoch
        };

        let id = id.to_string();
        let backend = Arc::clone(&self.backend);
        let board = Arc::clone(&self.board);

        Some(self.runtime.spawn(async move {
            let status = match backend
                .probe_connection(&target.url, &target.api_key, &target.model)
                .await
            {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!(id = %id, url = %target.url, "探测失败: {}", e);
                    ConnectionStatus::check_failed()
                }
            };
            tracing::debug!(id = %id, success = status.success, latency_ms = status.latency_ms, "探测完成");

            let mut board = lock(&board);
            board.checking.remove(&id);
            if board.accepts(&id, epoch) {
                board.statuses.insert(id, status);
            } else {
                tracing::debug!(id = %id, "档案已移除，丢弃探测结果");
            }
        }))
    }

    /// 对列表中所有档案扇出探测，彼此独立完成
    pub fn probe_all(&self, ns: Namespace, profiles: &[ConfigProfile]) -> Vec<JoinHandle<()>> {
        profiles
            .iter()
            .filter_map(|p| self.probe(&p.id, ProbeTarget::from_profile(ns, p)))
            .collect()
    }

    /// 列表变化（增删档案或探测目标改变）时重新探测全部，并丢弃已消失档案的结果
    pub fn sync(&self, ns: Namespace, profiles: &[ConfigProfile]) -> Vec<JoinHandle<()>> {
        let fingerprint: Vec<(String, ProbeTarget)> = profiles
            .iter()
            .map(|p| (p.id.clone(), ProbeTarget::from_profile(ns, p)))
            .collect();

        {
            let mut board = lock(&self.board);
            if board.seen.as_ref() == Some(&fingerprint) {
                return Vec::new();
            }
            let live: HashSet<&str> = fingerprint.iter().map(|(id, _)| id.as_str()).collect();
            board.statuses.retain(|id, _| live.contains(id.as_str()));
            board.seen = Some(fingerprint);
        }

        self.probe_all(ns, profiles)
    }

    pub fn status(&self, id: &str) -> Option<ConnectionStatus> {
        lock(&self.board).statuses.get(id).cloned()
    }

    pub fn statuses(&self) -> HashMap<String, ConnectionStatus> {
        lock(&self.board).statuses.clone()
    }

    pub fn is_checking(&self, id: &str) -> bool {
        lock(&self.board).checking.contains(id)
    }

    /// 离开页面时丢弃全部临时状态
    pub fn clear(&self) {
        let mut board = lock(&self.board);
        board.statuses.clear();
        board.seen = None;
        board.epoch += 1;
    }
}
