use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Terminal;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::api;
use crate::backend::Backend;
use crate::core::diagnostics::{IpLookup, IpSource, SiteDiagnostics, SiteResult};
use crate::core::editor::{EditMode, EditorForm};
use crate::core::notice::{Notice, NoticeLevel};
use crate::core::projection::ListEntry;
use crate::core::session::NamespaceSession;
use crate::models::{CodexGlobalSettings, Namespace};
use crate::preferences::{PreferenceStore, Preferences};

/// 无按键时的重绘间隔，用于刷新异步探测结果
const TICK: Duration = Duration::from_millis(250);

/// 菜单面板
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuPanel {
    Claude,
    Codex,
    Diagnostics,
    Settings,
    Server,
}

impl MenuPanel {
    const ALL: [MenuPanel; 5] = [
        MenuPanel::Claude,
        MenuPanel::Codex,
        MenuPanel::Diagnostics,
        MenuPanel::Settings,
        MenuPanel::Server,
    ];

    fn label(self) -> &'static str {
        match self {
            MenuPanel::Claude => "Claude",
            MenuPanel::Codex => "Codex",
            MenuPanel::Diagnostics => "Diagnostics",
            MenuPanel::Settings => "Settings",
            MenuPanel::Server => "Server",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.label() == label)
    }

    fn namespace(self) -> Option<Namespace> {
        match self {
            MenuPanel::Claude => Some(Namespace::Claude),
            MenuPanel::Codex => Some(Namespace::Codex),
            _ => None,
        }
    }
}

/// 焦点区域：菜单 or 内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Menu,
    Content,
}

/// 内容区域的输入模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// 浏览列表
    Normal,
    /// 填写档案表单或设置项
    Editing,
    /// 确认删除
    Deleting,
}

/// 编辑中的内容
enum Draft {
    Profile(EditorForm),
    CodexRoot(String),
}

// Settings 面板条目
const SETTING_CODEX_ENABLED: usize = 0;
const SETTING_CODEX_ROOT: usize = 1;
const SETTING_AUTO_PROBE: usize = 2;
const SETTING_EXCLUSIVE: usize = 3;

/// TUI 应用状态
pub struct App {
    runtime: Handle,
    backend: Arc<dyn Backend>,
    claude: NamespaceSession,
    codex: NamespaceSession,
    diagnostics: SiteDiagnostics,
    /// 本轮诊断结果是否已汇总到状态栏
    diagnostics_reported: bool,
    /// Codex CLI 是否在 PATH 中，进入 Codex 面板时检查
    codex_cli: Option<bool>,
    preferences: PreferenceStore,
    codex_settings: Option<CodexGlobalSettings>,
    selected_menu: usize,
    focus: Focus,
    status_message: String,
    running: bool,
    content_selected: usize,
    input_mode: InputMode,
    /// 当前编辑的字段索引
    input_field: usize,
    draft: Option<Draft>,
    server_addr: SocketAddr,
    server: Option<JoinHandle<()>>,
}

fn build_session(
    ns: Namespace,
    backend: &Arc<dyn Backend>,
    runtime: &Handle,
    prefs: &Preferences,
) -> NamespaceSession {
    let mut session = NamespaceSession::new(
        ns,
        Arc::clone(backend),
        runtime.clone(),
        prefs.activation_policy(),
    );
    session.set_auto_probe(prefs.auto_probe);
    session
}

fn notice_status(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Error => format!("Error: {}", notice.message),
        NoticeLevel::Warning => format!("Warning: {}", notice.message),
        _ => notice.message.clone(),
    }
}

impl App {
    /// 创建 App 实例；`runtime` 必须是多线程运行时的句柄，且调用方不在异步上下文中
    pub fn new(backend: Arc<dyn Backend>, preferences: PreferenceStore, runtime: Handle) -> Self {
        let prefs = preferences.get().clone();
        let claude = build_session(Namespace::Claude, &backend, &runtime, &prefs);
        let codex = build_session(Namespace::Codex, &backend, &runtime, &prefs);
        let selected_menu = prefs
            .last_panel
            .as_deref()
            .and_then(MenuPanel::from_label)
            .and_then(|panel| MenuPanel::ALL.iter().position(|p| *p == panel))
            .unwrap_or(0);

        let mut app = Self {
            diagnostics: SiteDiagnostics::new(Arc::clone(&backend), runtime.clone()),
            diagnostics_reported: true,
            codex_cli: None,
            runtime,
            backend,
            claude,
            codex,
            preferences,
            codex_settings: None,
            selected_menu,
            focus: Focus::Menu,
            status_message: "Ready".to_string(),
            running: true,
            content_selected: 0,
            input_mode: InputMode::Normal,
            input_field: 0,
            draft: None,
            server_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            server: None,
        };
        app.enter_panel();
        app
    }

    pub fn with_server_addr(mut self, addr: SocketAddr) -> Self {
        self.server_addr = addr;
        self
    }

    pub fn selected_panel(&self) -> MenuPanel {
        MenuPanel::ALL[self.selected_menu]
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    pub fn content_selected(&self) -> usize {
        self.content_selected
    }

    pub fn input_field(&self) -> usize {
        self.input_field
    }

    pub fn form(&self) -> Option<&EditorForm> {
        match &self.draft {
            Some(Draft::Profile(form)) => Some(form),
            _ => None,
        }
    }

    pub fn codex_cli_installed(&self) -> Option<bool> {
        self.codex_cli
    }

    pub fn diagnostics_running(&self) -> bool {
        self.diagnostics.is_running()
    }

    pub fn server_running(&self) -> bool {
        self.server.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn session(&self) -> Option<&NamespaceSession> {
        match self.selected_panel().namespace()? {
            Namespace::Claude => Some(&self.claude),
            Namespace::Codex => Some(&self.codex),
        }
    }

    fn session_mut(&mut self) -> Option<&mut NamespaceSession> {
        match self.selected_panel().namespace()? {
            Namespace::Claude => Some(&mut self.claude),
            Namespace::Codex => Some(&mut self.codex),
        }
    }

    fn entries(&self) -> Vec<ListEntry> {
        self.session().map(|s| s.entries()).unwrap_or_default()
    }

    fn selected_entry(&self) -> Option<ListEntry> {
        self.entries().into_iter().nth(self.content_selected)
    }

    /// 把当前会话积压的提示转到状态栏，只显示最新一条
    fn sync_notices(&mut self) {
        let latest = self
            .session_mut()
            .and_then(|s| s.notices().drain().pop());
        if let Some(notice) = latest {
            self.status_message = notice_status(&notice);
        }
    }

    /// 当前面板的内容行
    pub fn content_items(&self) -> Vec<String> {
        match self.selected_panel() {
            MenuPanel::Claude | MenuPanel::Codex => {
                let Some(session) = self.session() else {
                    return Vec::new();
                };
                session
                    .entries()
                    .iter()
                    .map(|entry| match entry {
                        ListEntry::Create => entry.label(),
                        ListEntry::Profile { profile, active, status } => {
                            let marker = if *active { "●" } else { "○" };
                            let health = if session.is_checking(&profile.id) {
                                " [checking]".to_string()
                            } else {
                                match status {
                                    Some(s) if s.success => format!(" [ok {}ms]", s.latency_ms),
                                    Some(s) => format!(
                                        " [{}]",
                                        s.message.as_deref().unwrap_or("failed")
                                    ),
                                    None => String::new(),
                                }
                            };
                            format!("{} {}{}", marker, profile.title, health)
                        }
                        other => {
                            let marker = if other.is_active() { "●" } else { "○" };
                            format!("{} {}", marker, other.label())
                        }
                    })
                    .collect()
            }
            MenuPanel::Diagnostics => {
                let mut items: Vec<String> = IpSource::ALL
                    .iter()
                    .map(|source| {
                        let shown = match (self.diagnostics.ip(*source), source) {
                            (Some(IpLookup::Found(ip)), _) => ip,
                            (Some(IpLookup::Failed), IpSource::Public) => "Error".to_string(),
                            (Some(IpLookup::Failed), IpSource::Foreign) => "Unreachable".to_string(),
                            (None, _) => "-".to_string(),
                        };
                        format!("{}: {}", source.label(), shown)
                    })
                    .collect();
                items.push(format!(
                    "Google: {}",
                    self.diagnostics.google_status().unwrap_or_else(|| "-".to_string())
                ));
                items.extend(self.diagnostics.rows().into_iter().map(|(site, result)| {
                    let shown = match result {
                        Some(SiteResult::Latency(ms)) => format!("{}ms", ms),
                        Some(SiteResult::Unreachable) => "unreachable".to_string(),
                        None => "-".to_string(),
                    };
                    format!("{:<12} {:<26} {}", site.name, site.url, shown)
                }));
                items
            }
            MenuPanel::Settings => {
                let prefs = self.preferences.get();
                let on_off = |b: bool| if b { "on" } else { "off" };
                let (enabled, root) = match &self.codex_settings {
                    Some(s) => (on_off(s.enabled).to_string(), s.root_path.clone()),
                    None => ("unknown".to_string(), "unknown".to_string()),
                };
                vec![
                    format!("Codex enabled: {}", enabled),
                    format!("Codex root: {}", root),
                    format!("Auto probe: {}", on_off(prefs.auto_probe)),
                    format!("Exclusive switch: {}", on_off(prefs.exclusive_switch)),
                ]
            }
            MenuPanel::Server => {
                if self.server_running() {
                    vec![format!("Server: Running on {}", self.server_addr)]
                } else {
                    vec!["Server: Stopped".to_string()]
                }
            }
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.content_items().len();
        if len == 0 {
            self.content_selected = 0;
        } else if self.content_selected >= len {
            self.content_selected = len - 1;
        }
    }

    /// 进入面板时加载数据
    fn enter_panel(&mut self) {
        match self.selected_panel() {
            MenuPanel::Claude | MenuPanel::Codex => {
                let runtime = self.runtime.clone();
                if let Some(session) = self.session_mut() {
                    runtime.block_on(session.load());
                }
                self.sync_notices();
                if self.selected_panel() == MenuPanel::Codex {
                    self.check_codex_cli();
                }
            }
            MenuPanel::Settings => self.reload_codex_settings(),
            _ => {}
        }
        self.clamp_selection();
    }

    fn leave_panel(&mut self) {
        if let Some(session) = self.session_mut() {
            session.leave();
        }
    }

    fn check_codex_cli(&mut self) {
        let installed = match self.runtime.block_on(self.backend.command_exists("codex")) {
            Ok(installed) => installed,
            Err(e) => {
                tracing::warn!("检查 codex 命令失败: {}", e);
                false
            }
        };
        self.codex_cli = Some(installed);
    }

    fn reload_codex_settings(&mut self) {
        match self.runtime.block_on(self.backend.codex_global_settings()) {
            Ok(settings) => self.codex_settings = Some(settings),
            Err(e) => {
                self.codex_settings = None;
                self.set_status(format!("Error: {}", e));
            }
        }
    }

    /// 偏好变化后按新的策略重建会话
    fn rebuild_sessions(&mut self) {
        let prefs = self.preferences.get().clone();
        self.claude = build_session(Namespace::Claude, &self.backend, &self.runtime, &prefs);
        self.codex = build_session(Namespace::Codex, &self.backend, &self.runtime, &prefs);
    }

    /// 启动 TUI 事件循环
    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        self.shutdown();
        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        while self.running {
            self.on_tick();
            terminal.draw(|frame| self.render(frame))?;

            if !event::poll(TICK)? {
                continue;
            }
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                self.handle_key(key.code);
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        self.leave_panel();
        if let Some(server) = self.server.take() {
            server.abort();
        }
    }

    /// 处理键盘输入
    fn handle_key(&mut self, code: KeyCode) {
        // 编辑/删除模式下优先处理
        match self.input_mode {
            InputMode::Editing => {
                self.handle_edit_key(code);
                return;
            }
            InputMode::Deleting => {
                self.handle_delete_key(code);
                return;
            }
            InputMode::Normal => {}
        }

        match code {
            KeyCode::Char('q') => self.running = false,
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Menu => Focus::Content,
                    Focus::Content => Focus::Menu,
                };
            }
            _ if self.focus == Focus::Menu => self.handle_menu_key(code),
            _ if self.focus == Focus::Content => self.handle_content_key(code),
            _ => {}
        }
    }

    /// 菜单区域按键处理
    fn handle_menu_key(&mut self, code: KeyCode) {
        let prev = self.selected_menu;
        let next = match code {
            KeyCode::Up => prev.saturating_sub(1),
            KeyCode::Down => (prev + 1).min(MenuPanel::ALL.len() - 1),
            KeyCode::Enter => {
                let panel = self.selected_panel();
                self.set_status(format!("Selected: {}", panel.label()));
                prev
            }
            _ => prev,
        };
        if next == prev {
            return;
        }

        // 面板切换时释放旧面板状态并加载新面板
        self.leave_panel();
        self.selected_menu = next;
        self.content_selected = 0;
        let label = self.selected_panel().label().to_string();
        if let Err(e) = self.preferences.update(|p| p.last_panel = Some(label)) {
            tracing::warn!("保存偏好失败: {}", e);
        }
        self.enter_panel();
    }

    /// 内容区域 Normal 模式按键处理
    fn handle_content_key(&mut self, code: KeyCode) {
        let panel = self.selected_panel();
        match code {
            KeyCode::Up => {
                self.content_selected = self.content_selected.saturating_sub(1);
            }
            KeyCode::Down => {
                let len = self.content_items().len();
                if len > 0 && self.content_selected < len - 1 {
                    self.content_selected += 1;
                }
            }
            KeyCode::Enter => match panel {
                MenuPanel::Claude | MenuPanel::Codex => self.activate_selected(),
                MenuPanel::Diagnostics => self.run_diagnostics(),
                MenuPanel::Settings => self.toggle_setting(),
                MenuPanel::Server => self.toggle_server(),
            },
            KeyCode::Char('n') if panel.namespace().is_some() => self.start_creating(),
            KeyCode::Char('e') if panel.namespace().is_some() => self.start_editing(),
            KeyCode::Char('d') => {
                if let Some(ListEntry::Profile { .. }) = self.selected_entry() {
                    self.input_mode = InputMode::Deleting;
                    self.set_status("Delete? y=confirm, n/Esc=cancel");
                }
            }
            KeyCode::Char('t') => {
                if let Some(ListEntry::Profile { profile, .. }) = self.selected_entry() {
                    if let Some(session) = self.session() {
                        if session.retest(&profile.id).is_some() {
                            self.set_status(format!("Testing {}...", profile.title));
                        }
                    }
                }
            }
            KeyCode::Char('T') => {
                if let Some(session) = self.session() {
                    let started = session.retest_all().len();
                    self.set_status(format!("Testing {} configs...", started));
                }
            }
            KeyCode::Char('r') => match panel {
                MenuPanel::Claude | MenuPanel::Codex => {
                    let runtime = self.runtime.clone();
                    if let Some(session) = self.session_mut() {
                        runtime.block_on(session.refresh());
                    }
                    self.set_status("Refreshed");
                    self.sync_notices();
                    self.clamp_selection();
                }
                MenuPanel::Diagnostics => self.run_diagnostics(),
                _ => {}
            },
            KeyCode::Char('s') if panel == MenuPanel::Server => self.toggle_server(),
            _ => {}
        }
    }

    /// 列表项的默认动作：新建入口打开表单，其余交给会话切换或导入
    fn activate_selected(&mut self) {
        let Some(entry) = self.selected_entry() else {
            return;
        };
        if entry == ListEntry::Create {
            self.start_creating();
            return;
        }
        let runtime = self.runtime.clone();
        if let Some(session) = self.session_mut() {
            runtime.block_on(session.activate_entry(&entry));
        }
        self.sync_notices();
        self.clamp_selection();
    }

    fn open_form(&mut self, form: EditorForm, status: &str) {
        self.draft = Some(Draft::Profile(form));
        self.input_field = 0;
        self.input_mode = InputMode::Editing;
        self.set_status(status.to_string());
    }

    /// 开始创建流程，表单带有默认供应商预设
    fn start_creating(&mut self) {
        let Some(ns) = self.selected_panel().namespace() else {
            return;
        };
        self.open_form(
            EditorForm::create(ns),
            "Creating... Tab=next field, ←/→=provider, Enter=confirm, Esc=cancel",
        );
    }

    fn start_editing(&mut self) {
        let Some(ns) = self.selected_panel().namespace() else {
            return;
        };
        if let Some(ListEntry::Profile { profile, .. }) = self.selected_entry() {
            self.open_form(
                EditorForm::edit(ns, &profile),
                "Editing... Tab=next field, ←/→=provider, Enter=confirm, Esc=cancel",
            );
        }
    }

    fn field_count(&self) -> usize {
        match &self.draft {
            Some(Draft::Profile(form)) => form.fields().len(),
            Some(Draft::CodexRoot(_)) => 1,
            None => 0,
        }
    }

    fn current_field_mut(&mut self) -> Option<&mut String> {
        let index = self.input_field;
        match self.draft.as_mut()? {
            Draft::Profile(form) => form.field_mut(index),
            Draft::CodexRoot(path) => Some(path),
        }
    }

    /// 编辑模式按键处理
    fn handle_edit_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.draft = None;
                self.set_status("Cancelled");
            }
            KeyCode::Tab | KeyCode::BackTab => {
                let count = self.field_count();
                if count > 0 {
                    if code == KeyCode::BackTab && self.input_field > 0 {
                        self.input_field -= 1;
                    } else if code == KeyCode::Tab {
                        self.input_field = (self.input_field + 1) % count;
                    }
                }
            }
            KeyCode::Left | KeyCode::Right => {
                if let Some(Draft::Profile(form)) = self.draft.as_mut() {
                    form.cycle_preset();
                    let label = form.preset_label();
                    self.set_status(format!("Provider: {}", label));
                }
            }
            KeyCode::Enter => self.confirm_edit(),
            KeyCode::Backspace => {
                if let Some(value) = self.current_field_mut() {
                    value.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(value) = self.current_field_mut() {
                    value.push(c);
                }
            }
            _ => {}
        }
    }

    /// 确认编辑；失败时保留表单以便修改
    fn confirm_edit(&mut self) {
        let Some(draft) = self.draft.take() else {
            self.input_mode = InputMode::Normal;
            return;
        };
        let done = match &draft {
            Draft::Profile(form) => self.submit_form(form),
            Draft::CodexRoot(path) => self.save_codex_root(path.trim()),
        };
        if done {
            self.input_mode = InputMode::Normal;
            self.clamp_selection();
        } else {
            self.draft = Some(draft);
        }
    }

    fn submit_form(&mut self, form: &EditorForm) -> bool {
        let runtime = self.runtime.clone();
        let session = match form.namespace() {
            Namespace::Claude => &mut self.claude,
            Namespace::Codex => &mut self.codex,
        };
        let saved = runtime.block_on(session.submit(form)).is_some();
        if let Some(notice) = session.notices().drain().pop() {
            self.status_message = notice_status(&notice);
        }
        saved
    }

    fn save_codex_root(&mut self, path: &str) -> bool {
        let Some(mut settings) = self.codex_settings.clone() else {
            self.set_status("Error: Codex settings unavailable");
            return false;
        };
        settings.root_path = path.to_string();
        match self
            .runtime
            .block_on(self.backend.update_codex_global_settings(settings.clone()))
        {
            Ok(()) => {
                self.codex_settings = Some(settings);
                self.set_status("Codex root updated");
                true
            }
            Err(e) => {
                self.set_status(format!("Error: {}", e));
                false
            }
        }
    }

    /// 删除模式按键处理
    fn handle_delete_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('y') => self.confirm_delete(),
            KeyCode::Char('n') | KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.set_status("Cancelled");
            }
            _ => {}
        }
    }

    fn confirm_delete(&mut self) {
        if let Some(ListEntry::Profile { profile, .. }) = self.selected_entry() {
            let runtime = self.runtime.clone();
            if let Some(session) = self.session_mut() {
                runtime.block_on(session.delete(&profile.id));
            }
            self.sync_notices();
        }
        self.input_mode = InputMode::Normal;
        self.clamp_selection();
    }

    /// 诊断在后台运行，结果随重绘出现
    fn run_diagnostics(&mut self) {
        if self.diagnostics.start().is_empty() {
            return;
        }
        self.diagnostics_reported = false;
        self.set_status("Testing sites...");
    }

    /// 每次重绘前调用：诊断全部返回后汇总一次
    pub fn on_tick(&mut self) {
        if self.diagnostics_reported || self.diagnostics.is_running() {
            return;
        }
        self.diagnostics_reported = true;
        let rows = self.diagnostics.rows();
        let reachable = rows
            .iter()
            .filter(|(_, r)| matches!(r, Some(SiteResult::Latency(_))))
            .count();
        self.set_status(format!(
            "Diagnostics done: {}/{} reachable",
            reachable,
            rows.len()
        ));
    }

    fn toggle_setting(&mut self) {
        match self.content_selected {
            SETTING_CODEX_ENABLED => {
                let Some(mut settings) = self.codex_settings.clone() else {
                    return;
                };
                settings.enabled = !settings.enabled;
                let enabled = settings.enabled;
                match self
                    .runtime
                    .block_on(self.backend.update_codex_global_settings(settings.clone()))
                {
                    Ok(()) => {
                        self.codex_settings = Some(settings);
                        self.set_status(if enabled { "Codex enabled" } else { "Codex disabled" });
                    }
                    Err(e) => self.set_status(format!("Error: {}", e)),
                }
            }
            SETTING_CODEX_ROOT => {
                let root = self
                    .codex_settings
                    .as_ref()
                    .map(|s| s.root_path.clone())
                    .unwrap_or_default();
                self.draft = Some(Draft::CodexRoot(root));
                self.input_field = 0;
                self.input_mode = InputMode::Editing;
                self.set_status("Editing Codex root... Enter=confirm, Esc=cancel");
            }
            SETTING_AUTO_PROBE => {
                match self.preferences.update(|p| p.auto_probe = !p.auto_probe) {
                    Ok(()) => {
                        let on = self.preferences.get().auto_probe;
                        self.claude.set_auto_probe(on);
                        self.codex.set_auto_probe(on);
                        self.set_status(format!("Auto probe {}", if on { "on" } else { "off" }));
                    }
                    Err(e) => self.set_status(format!("Error: {}", e)),
                }
            }
            SETTING_EXCLUSIVE => {
                match self
                    .preferences
                    .update(|p| p.exclusive_switch = !p.exclusive_switch)
                {
                    Ok(()) => {
                        self.rebuild_sessions();
                        let on = self.preferences.get().exclusive_switch;
                        self.set_status(format!(
                            "Exclusive switch {}",
                            if on { "on" } else { "off" }
                        ));
                    }
                    Err(e) => self.set_status(format!("Error: {}", e)),
                }
            }
            _ => {}
        }
    }

    fn toggle_server(&mut self) {
        if let Some(server) = self.server.take() {
            server.abort();
            self.set_status("Server stopped");
            return;
        }
        let backend = Arc::clone(&self.backend);
        let addr = self.server_addr;
        self.server = Some(self.runtime.spawn(async move {
            if let Err(e) = api::serve(addr, backend).await {
                tracing::error!(addr = %addr, "API 服务异常退出: {}", e);
            }
        }));
        self.set_status(format!("Server started on {}", addr));
    }

    /// 渲染整个界面
    fn render(&self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(3),
            ])
            .split(area);

        self.render_title(frame, outer[0]);
        self.render_body(frame, outer[1]);
        self.render_status(frame, outer[2]);
    }

    fn render_title(&self, frame: &mut ratatui::Frame, area: Rect) {
        let title = Paragraph::new("Config Switcher - Claude / Codex")
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(title, area);
    }

    fn render_body(&self, frame: &mut ratatui::Frame, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(20), Constraint::Min(1)])
            .split(area);

        self.render_menu(frame, cols[0]);
        self.render_content(frame, cols[1]);
    }

    fn render_menu(&self, frame: &mut ratatui::Frame, area: Rect) {
        let items: Vec<ListItem> = MenuPanel::ALL
            .iter()
            .enumerate()
            .map(|(i, panel)| {
                let style = if i == self.selected_menu {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                let prefix = if i == self.selected_menu { "> " } else { "  " };
                ListItem::new(format!("{}{}", prefix, panel.label())).style(style)
            })
            .collect();

        let border_style = if self.focus == Focus::Menu {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let menu = List::new(items).block(
            Block::default()
                .title(" Menu ")
                .borders(Borders::ALL)
                .border_style(border_style),
        );
        frame.render_widget(menu, area);
    }

    fn render_content(&self, frame: &mut ratatui::Frame, area: Rect) {
        let panel = self.selected_panel();
        let border_style = if self.focus == Focus::Content {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let block = Block::default()
            .title(self.content_title(panel))
            .borders(Borders::ALL)
            .border_style(border_style);

        match self.input_mode {
            InputMode::Normal => {
                let entries = self.entries();
                let items: Vec<ListItem> = self
                    .content_items()
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let active = entries.get(i).is_some_and(|e| e.is_active());
                        let style = if i == self.content_selected {
                            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                        } else if active {
                            Style::default().fg(Color::Green)
                        } else {
                            Style::default()
                        };
                        let prefix = if i == self.content_selected { "> " } else { "  " };
                        ListItem::new(format!("{}{}", prefix, item)).style(style)
                    })
                    .collect();
                frame.render_widget(List::new(items).block(block), area);
            }
            InputMode::Editing => {
                let mut lines: Vec<Line> = Vec::new();
                let fields: Vec<(&str, &str)> = match &self.draft {
                    Some(Draft::Profile(form)) => {
                        let heading = match form.mode() {
                            EditMode::Create => "New config",
                            EditMode::Edit(_) => "Edit config",
                        };
                        lines.push(Line::from(Span::styled(
                            format!("{} [{}]", heading, form.namespace().label()),
                            Style::default().add_modifier(Modifier::BOLD),
                        )));
                        lines.push(Line::from(format!("  Provider: < {} >", form.preset_label())));
                        form.fields()
                    }
                    Some(Draft::CodexRoot(path)) => {
                        lines.push(Line::from(Span::styled(
                            "Codex root path",
                            Style::default().add_modifier(Modifier::BOLD),
                        )));
                        vec![("Root", path.as_str())]
                    }
                    None => Vec::new(),
                };
                lines.push(Line::from(""));

                for (i, (label, value)) in fields.into_iter().enumerate() {
                    let is_active = i == self.input_field;
                    let indicator = if is_active { "▶ " } else { "  " };
                    let label_style = if is_active {
                        Style::default().fg(Color::Cyan)
                    } else {
                        Style::default().fg(Color::DarkGray)
                    };
                    lines.push(Line::from(vec![
                        Span::raw(indicator),
                        Span::styled(format!("{}: ", label), label_style),
                        Span::styled(value.to_string(), Style::default().fg(Color::White)),
                        if is_active {
                            Span::styled("█", Style::default().fg(Color::Cyan))
                        } else {
                            Span::raw("")
                        },
                    ]));
                }

                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Tab=next field  ←/→=provider  Enter=confirm  Esc=cancel",
                    Style::default().fg(Color::DarkGray),
                )));
                frame.render_widget(Paragraph::new(lines).block(block), area);
            }
            InputMode::Deleting => {
                let item_name = self
                    .selected_entry()
                    .map(|e| e.label())
                    .unwrap_or_default();
                let lines = vec![
                    Line::from(Span::styled(
                        "Confirm delete? This cannot be undone.",
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(""),
                    Line::from(format!("  {}", item_name)),
                    Line::from(""),
                    Line::from(Span::styled(
                        "y=confirm  n/Esc=cancel",
                        Style::default().fg(Color::DarkGray),
                    )),
                ];
                frame.render_widget(Paragraph::new(lines).block(block), area);
            }
        }
    }

    /// 构建内容面板标题（含快捷键提示）
    fn content_title(&self, panel: MenuPanel) -> String {
        match panel {
            MenuPanel::Claude | MenuPanel::Codex => {
                let switching = self
                    .session()
                    .is_some_and(|s| s.is_switching());
                let cli = match (panel, self.codex_cli) {
                    (MenuPanel::Codex, Some(true)) => " [CLI: installed]",
                    (MenuPanel::Codex, Some(false)) => " [CLI: not installed]",
                    _ => "",
                };
                format!(
                    " {} Configs{}{} (Enter=switch n=new e=edit d=delete t/T=test r=refresh) ",
                    panel.label(),
                    cli,
                    if switching { " [switching]" } else { "" }
                )
            }
            MenuPanel::Diagnostics if self.diagnostics.is_running() => {
                " Proxy Diagnostics [running] ".to_string()
            }
            MenuPanel::Diagnostics => " Proxy Diagnostics (Enter/r=run) ".to_string(),
            MenuPanel::Settings => " Settings (Enter=toggle/edit) ".to_string(),
            MenuPanel::Server => " Server (s=toggle) ".to_string(),
        }
    }

    fn render_status(&self, frame: &mut ratatui::Frame, area: Rect) {
        let color = if self.status_message.starts_with("Error") {
            Color::Red
        } else {
            Color::Green
        };
        let status = Line::from(vec![
            Span::styled("Status: ", Style::default().fg(Color::DarkGray)),
            Span::styled(&self.status_message, Style::default().fg(color)),
            Span::raw(" | "),
            Span::styled(
                "q:Quit  Tab:Switch  ↑↓:Navigate  Enter:Select",
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        let bar = Paragraph::new(status).block(Block::default().borders(Borders::ALL));
        frame.render_widget(bar, area);
    }
}
