use anyhow::{Context, Result};
use crossterm::tty::IsTty;
use std::io;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use termnotify::app::{self, Config, Orchestrator, ParseOutcome, EXIT_FAILURE};
use termnotify::notify::{DesktopBackend, NotificationEngine};
use termnotify::terminal::{self, TerminalSignaler};

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run() -> Result<u8> {
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("warning: {:#}; using default settings", e);
        Config::default()
    });

    // パイプ入力があればメッセージとして扱う
    let args = app::prepare_args(
        std::env::args().skip(1).collect(),
        io::stdin().is_tty(),
        terminal::read_piped_input,
    );
    let parsed = app::parse(&args);

    // ログ初期化
    let level = match &parsed {
        Ok(ParseOutcome::Run(options)) => options.log_level.as_deref(),
        _ => None,
    }
    .unwrap_or(config.log_level.as_str());
    if let Err(e) = init_logging(level) {
        eprintln!("warning: logging disabled: {:#}", e);
    }

    let backend = DesktopBackend::new(
        config.backend.ledger_path(),
        config.backend.retention(),
        env!("CARGO_PKG_NAME"),
    );
    let engine = NotificationEngine::new(backend).with_timing(config.delivery.timing());
    let signaler = TerminalSignaler::stdout(terminal::detect_from_process())
        .with_pause(config.terminal.flash_pause())
        .with_app_id(config.terminal.app_id.clone());
    let mut orchestrator = Orchestrator::new(engine, signaler);

    // 1回の起動で1つの処理しか行わないので current_thread で十分
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let code = runtime.block_on(orchestrator.handle(parsed, &mut io::stdout(), &mut io::stderr()));
    info!("Exiting with status {}", code);
    Ok(code)
}

fn init_logging(level: &str) -> Result<()> {
    let log_dir = directories::ProjectDirs::from("", "", "termnotify")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("termnotify"));

    std::fs::create_dir_all(&log_dir)?;
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("termnotify.log"))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(log_file),
        )
        .try_init()?;

    info!("termnotify {} starting", env!("CARGO_PKG_VERSION"));
    Ok(())
}
