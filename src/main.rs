pub mod api;
pub mod backend;
pub mod core;
pub mod error;
pub mod models;
pub mod paths;
pub mod preferences;
pub mod storage;
pub mod tui;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use crate::backend::{Backend, HttpProbe, LocalBackend};
use crate::core::ProfileCenter;
use crate::paths::Paths;
use crate::preferences::PreferenceStore;

const USAGE: &str = "usage: config-switcher [serve [ADDR]]";

#[derive(Debug, PartialEq, Eq)]
enum Mode {
    Tui,
    Serve(SocketAddr),
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<Mode, String> {
    match args.next().as_deref() {
        None => Ok(Mode::Tui),
        Some("serve") => {
            let raw = args.next().unwrap_or_else(|| api::DEFAULT_ADDR.to_string());
            raw.parse()
                .map(Mode::Serve)
                .map_err(|e| format!("invalid address {}: {}", raw, e))
        }
        Some(other) => Err(format!("unknown command: {}\n{}", other, USAGE)),
    }
}

/// TUI 模式日志写文件，避免破坏终端画面；serve 模式写 stderr
fn init_tracing(paths: &Paths, mode: &Mode) {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if *mode == Mode::Tui {
        let file = std::fs::create_dir_all(paths.app_dir())
            .and_then(|_| {
                std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(paths.log_file())
            });
        if let Ok(file) = file {
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
            return;
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let mode = match parse_args(std::env::args().skip(1)) {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let paths = match Paths::discover() {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("Failed to initialize: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(&paths, &mode);

    let center = ProfileCenter::new(paths.clone());
    if let Err(e) = center.initialize() {
        eprintln!("Failed to initialize: {}", e);
        std::process::exit(1);
    }
    let probe = match HttpProbe::new() {
        Ok(probe) => probe,
        Err(e) => {
            eprintln!("Failed to initialize: {}", e);
            std::process::exit(1);
        }
    };
    let backend: Arc<dyn Backend> = Arc::new(LocalBackend::new(center, probe));

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    match mode {
        Mode::Tui => {
            let preferences = PreferenceStore::load(&paths.preferences());
            let mut app = tui::App::new(backend, preferences, runtime.handle().clone());
            if let Err(e) = app.run() {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Mode::Serve(addr) => {
            if let Err(e) = runtime.block_on(api::serve(addr, backend)) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
