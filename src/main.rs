use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use huntd::{
    achievements::{DocumentLedgerStore, UnlockReconciler},
    auth,
    config::DaemonConfig,
    ipc::event::EventBroadcaster,
    progress::ProgressTracker,
    storage::Storage,
    AppContext,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "huntd",
    about = "HuntLog Host — always-on progress & achievement daemon",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// JSON-RPC WebSocket server port
    #[arg(long, env = "HUNTD_PORT")]
    port: Option<u16>,

    /// Data directory for config, auth token, and SQLite database
    #[arg(long, env = "HUNTD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "HUNTD_LOG")]
    log: Option<String>,

    /// Bind address for the WebSocket server (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "HUNTD_BIND")]
    bind_address: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "HUNTD_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daemon server (default when no subcommand given).
    ///
    /// Runs huntd in the foreground.
    ///
    /// Examples:
    ///   huntd serve
    ///   huntd
    Serve,
    /// Show daemon status (running, version, uptime).
    ///
    /// Queries the running daemon's health endpoint and prints a summary line.
    /// Exits 0 if healthy, 1 if stopped or unresponsive.
    ///
    /// Examples:
    ///   huntd status
    ///   huntd status --json
    Status {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ── Logging setup ────────────────────────────────────────────────────────
    // Init once — must happen before any tracing calls.
    let log_level = args.log.as_deref().unwrap_or("info").to_owned();
    let log_format = std::env::var("HUNTD_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let _file_guard = setup_logging(&log_level, args.log_file.as_deref(), &log_format);

    match args.command {
        Some(Command::Status { json }) => {
            let config = DaemonConfig::new(None, args.data_dir, Some("error".to_string()), None);
            let exit_code = run_status(&config, json).await;
            std::process::exit(exit_code);
        }
        None | Some(Command::Serve) => {
            run_server(args.port, args.data_dir, args.log, args.bind_address).await?;
        }
    }

    Ok(())
}

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs go to both stdout and a daily-rolling file.
/// Returns a `WorkerGuard` that must stay alive for the process lifetime.
///
/// `log_format` may be `"pretty"` (default, human-readable compact format) or
/// `"json"` (structured JSON for log aggregators).
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("huntd.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            // Fall back to stdout-only — don't panic on a bad log path.
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt().json().with_env_filter(log_level).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        None
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}

// ── Panic hook + crash log ──────────────────────────────────────────────────────

/// Install a custom panic hook that writes panic info + backtrace to `{data_dir}/crash.log`.
///
/// The crash log is checked and removed on the next startup (`check_crash_log`).
fn install_panic_hook(data_dir: std::path::PathBuf) {
    let original = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        // Call the original hook first (prints to stderr).
        original(info);

        let crash_path = data_dir.join("crash.log");
        let msg = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("unknown panic");

        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());

        let backtrace = std::backtrace::Backtrace::capture();
        let content = format!(
            "huntd panic at {location}\n\
             message: {msg}\n\
             version: {}\n\
             backtrace:\n{backtrace:#}\n",
            env!("CARGO_PKG_VERSION")
        );

        // Best-effort write — if this fails, we can't do much.
        let _ = std::fs::write(&crash_path, &content);
    }));
}

/// Check for a crash log from the previous run, log it at error level, then delete it.
///
/// Called early in `run_server()` after logging is initialized.
fn check_crash_log(data_dir: &std::path::Path) {
    let crash_path = data_dir.join("crash.log");
    match std::fs::read_to_string(&crash_path) {
        Ok(content) => {
            tracing::error!(
                crash_report = %content.trim(),
                "previous daemon run ended with a panic — see crash report above"
            );
            let _ = std::fs::remove_file(&crash_path);
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(err = %e, "could not read crash.log");
        }
    }
}

// ── huntd status ──────────────────────────────────────────────────────────────

/// Returns exit code: 0 = healthy, 1 = stopped/unresponsive.
async fn run_status(config: &DaemonConfig, json: bool) -> i32 {
    match fetch_health(config.port).await {
        Ok(health) => {
            let version = health["version"].as_str().unwrap_or("?");
            let uptime_str = format_uptime(health["uptime"].as_u64().unwrap_or(0));

            if json {
                println!("{}", serde_json::to_string(&health).unwrap_or_default());
            } else {
                println!("huntd {version} — Running (uptime {uptime_str})");
            }
            0
        }
        Err(_) => {
            if json {
                println!(r#"{{"status":"not_running"}}"#);
            } else {
                println!("huntd: not running");
            }
            1
        }
    }
}

/// Fetch `GET /health` from the daemon's shared WebSocket/HTTP port.
async fn fetch_health(port: u16) -> Result<serde_json::Value> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = tokio::time::timeout(
        std::time::Duration::from_secs(2),
        tokio::net::TcpStream::connect(("127.0.0.1", port)),
    )
    .await
    .context("connect timed out")??;

    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n")
        .await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let text = String::from_utf8_lossy(&buf);
    let body = text
        .split("\r\n\r\n")
        .nth(1)
        .context("malformed health response")?;
    Ok(serde_json::from_str(body.trim())?)
}

/// Format uptime seconds as "2h 14m" or "45m 3s".
fn format_uptime(secs: u64) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{h}h {m}m")
    } else if m > 0 {
        format!("{m}m {s}s")
    } else {
        format!("{s}s")
    }
}

// ── huntd serve ───────────────────────────────────────────────────────────────

async fn run_server(
    port: Option<u16>,
    data_dir: Option<std::path::PathBuf>,
    log: Option<String>,
    bind_address: Option<String>,
) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "huntd starting");

    let config = Arc::new(DaemonConfig::new(port, data_dir, log, bind_address));
    info!(
        data_dir = %config.data_dir.display(),
        port = config.port,
        "config loaded"
    );

    // ── Panic hook: write crash.log on panic ─────────────────────────────────
    install_panic_hook(config.data_dir.clone());
    // If previous run panicked, log the crash report and delete it.
    check_crash_log(&config.data_dir);

    let storage = Arc::new(Storage::new(&config.data_dir).await?);
    let broadcaster = Arc::new(EventBroadcaster::new());
    let progress = Arc::new(ProgressTracker::new());

    // Load the unlock ledger before accepting RPC traffic, so the first
    // progress.update cannot re-announce achievements unlocked last week.
    let store = Arc::new(DocumentLedgerStore::new(storage.clone()));
    let mut reconciler = UnlockReconciler::new(store);
    reconciler.load().await;
    info!(unlocked = reconciler.unlocked_count(), "unlock ledger ready");

    let auth_token = match auth::get_or_create_token(&config.data_dir) {
        Ok(t) => {
            info!("auth token ready");
            t
        }
        Err(e) => {
            // Auth token is required — running without it leaves the daemon fully open.
            // This is a startup configuration error, not a recoverable condition.
            eprintln!("FATAL: failed to generate auth token: {e:#}");
            std::process::exit(1);
        }
    };

    let ctx = Arc::new(AppContext {
        config,
        storage,
        broadcaster,
        progress,
        reconciler: Arc::new(tokio::sync::Mutex::new(reconciler)),
        started_at: std::time::Instant::now(),
        auth_token,
    });

    huntd::ipc::run(ctx).await
}
