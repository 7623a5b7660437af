//! 代理诊断：对固定站点列表并发测延迟，同时查询本机出口 IP。
//!
//! 每个站点一个独立任务，结果到达即写入，界面按 tick 轮询。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::backend::Backend;

/// 诊断站点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestSite {
    pub id: &'static str,
    pub name: &'static str,
    pub url: &'static str,
}

pub const TEST_SITES: &[TestSite] = &[
    TestSite { id: "github", name: "GitHub", url: "https://github.com" },
    TestSite { id: "gitlab", name: "GitLab", url: "https://gitlab.com" },
    TestSite { id: "google", name: "Google", url: "https://www.google.com" },
    TestSite { id: "facebook", name: "Facebook", url: "https://www.facebook.com" },
    TestSite { id: "x", name: "X (Twitter)", url: "https://twitter.com" },
];

/// Google 连通性单独展示
const GOOGLE_SITE_ID: &str = "google";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteResult {
    Latency(u64),
    Unreachable,
}

/// 出口 IP 查询来源：本地运营商出口与境外访问出口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpSource {
    Public,
    Foreign,
}

impl IpSource {
    pub const ALL: [IpSource; 2] = [IpSource::Public, IpSource::Foreign];

    pub fn url(self) -> &'static str {
        match self {
            IpSource::Public => "https://api.ipify.org?format=text",
            IpSource::Foreign => "https://ifconfig.me/ip",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IpSource::Public => "Public IP",
            IpSource::Foreign => "Foreign IP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpLookup {
    Found(String),
    Failed,
}

#[derive(Default)]
struct DiagnosticsBoard {
    sites: HashMap<&'static str, SiteResult>,
    ips: HashMap<IpSource, IpLookup>,
    pending: usize,
}

fn lock(board: &Mutex<DiagnosticsBoard>) -> MutexGuard<'_, DiagnosticsBoard> {
    board.lock().unwrap_or_else(|e| e.into_inner())
}

/// 任务结束（含 panic）时归还计数
struct Pending(Arc<Mutex<DiagnosticsBoard>>);

impl Drop for Pending {
    fn drop(&mut self) {
        let mut board = lock(&self.0);
        board.pending = board.pending.saturating_sub(1);
    }
}

pub struct SiteDiagnostics {
    backend: Arc<dyn Backend>,
    runtime: Handle,
    board: Arc<Mutex<DiagnosticsBoard>>,
}

impl SiteDiagnostics {
    pub fn new(backend: Arc<dyn Backend>, runtime: Handle) -> Self {
        Self {
            backend,
            runtime,
            board: Arc::new(Mutex::new(DiagnosticsBoard::default())),
        }
    }

    /// 清空上次结果后发起全部检测；上一轮未结束时不重复发起
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        {
            let mut board = lock(&self.board);
            if board.pending > 0 {
                return Vec::new();
            }
            *board = DiagnosticsBoard {
                pending: TEST_SITES.len() + IpSource::ALL.len(),
                ..Default::default()
            };
        }

        let mut handles = Vec::with_capacity(TEST_SITES.len() + IpSource::ALL.len());
        for site in TEST_SITES {
            let backend = Arc::clone(&self.backend);
            let pending = Pending(Arc::clone(&self.board));
            handles.push(self.runtime.spawn(async move {
                let result = match backend.check_site_latency(site.url).await {
                    Ok(ms) => SiteResult::Latency(ms),
                    Err(e) => {
                        tracing::debug!(site = site.id, "站点不可达: {}", e);
                        SiteResult::Unreachable
                    }
                };
                lock(&pending.0).sites.insert(site.id, result);
            }));
        }

        for source in IpSource::ALL {
            let backend = Arc::clone(&self.backend);
            let pending = Pending(Arc::clone(&self.board));
            handles.push(self.runtime.spawn(async move {
                let lookup = match backend.public_ip(source.url()).await {
                    Ok(ip) => IpLookup::Found(ip),
                    Err(e) => {
                        tracing::debug!(source = source.url(), "查询出口 IP 失败: {}", e);
                        IpLookup::Failed
                    }
                };
                lock(&pending.0).ips.insert(source, lookup);
            }));
        }
        handles
    }

    pub fn result(&self, id: &str) -> Option<SiteResult> {
        lock(&self.board).sites.get(id).copied()
    }

    pub fn ip(&self, source: IpSource) -> Option<IpLookup> {
        lock(&self.board).ips.get(&source).cloned()
    }

    /// "Connected (N ms)" / "Disconnected"，尚无结果时为 `None`
    pub fn google_status(&self) -> Option<String> {
        self.result(GOOGLE_SITE_ID).map(|r| match r {
            SiteResult::Latency(ms) => format!("Connected ({}ms)", ms),
            SiteResult::Unreachable => "Disconnected".to_string(),
        })
    }

    pub fn is_running(&self) -> bool {
        lock(&self.board).pending > 0
    }

    /// 按目录顺序返回 (站点, 结果)
    pub fn rows(&self) -> Vec<(&'static TestSite, Option<SiteResult>)> {
        let board = lock(&self.board);
        TEST_SITES
            .iter()
            .map(|s| (s, board.sites.get(s.id).copied()))
            .collect()
    }
}
