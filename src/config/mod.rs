use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::error;

pub const DEFAULT_PORT: u16 = 4747;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// WebSocket server port (default: 4747).
    port: Option<u16>,
    /// Log level filter string, e.g. "debug", "info,huntd=trace" (default: "info").
    log: Option<String>,
    /// Bind address for the WebSocket server (default: "127.0.0.1"; use "0.0.0.0" for LAN access).
    bind_address: Option<String>,
    /// Log output format: "pretty" (default, human-readable) | "json" (structured for log aggregators).
    log_format: Option<String>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── DaemonConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub log: String,
    /// Bind address for the WebSocket server (HUNTD_BIND env var, default: "127.0.0.1").
    pub bind_address: String,
    /// Log output format: "pretty" (default) | "json" (structured for log aggregators).
    pub log_format: String,
}

impl DaemonConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let bind_address = bind_address
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let log_format = std::env::var("HUNTD_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        Self {
            port,
            data_dir,
            log,
            bind_address,
            log_format,
        }
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/huntd
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("huntd");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/huntd or ~/.local/share/huntd
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("huntd");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("huntd");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\huntd
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("huntd");
        }
    }
    // Fallback
    PathBuf::from(".huntd")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = DaemonConfig::new(None, Some(dir.path().to_path_buf()), None, None);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.log, "info");
        assert_eq!(config.bind_address, "127.0.0.1");
    }

    #[test]
    fn toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "port = 5555\nlog = \"debug\"\nbind_address = \"0.0.0.0\"\n",
        )
        .unwrap();

        let config = DaemonConfig::new(None, Some(dir.path().to_path_buf()), None, None);
        assert_eq!(config.port, 5555);
        assert_eq!(config.log, "debug");
        assert_eq!(config.bind_address, "0.0.0.0");
    }

    #[test]
    fn cli_args_beat_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "port = 5555\n").unwrap();

        let config = DaemonConfig::new(
            Some(6001),
            Some(dir.path().to_path_buf()),
            Some("trace".to_string()),
            None,
        );
        assert_eq!(config.port, 6001);
        assert_eq!(config.log, "trace");
    }

    #[test]
    fn malformed_toml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "port = \"not a number").unwrap();

        let config = DaemonConfig::new(None, Some(dir.path().to_path_buf()), None, None);
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
