//! Configuration loading and resolution
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal: a warning is logged
//! and compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding the ledger base URL
pub const LEDGER_URL_ENV: &str = "WHS_LEDGER_URL";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "WHS_CONFIG";

/// Compiled default ledger base URL
pub const DEFAULT_LEDGER_URL: &str = "http://localhost:8000";

/// Grace periods governing scan debouncing and in-flight expiry
///
/// All values in milliseconds so they read naturally in TOML:
///
/// ```toml
/// [timing]
/// recency_window_ms = 5000
/// error_latch_ms = 1000
/// success_latch_ms = 4000
/// in_flight_expiry_ms = 5000
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Identical decoded value within this window is camera noise
    pub recency_window_ms: u64,
    /// Processing latch hold after a wrong-type or unrecognized scan
    pub error_latch_ms: u64,
    /// Processing latch hold after an accepted scan
    pub success_latch_ms: u64,
    /// In-flight box entries expire after this long
    pub in_flight_expiry_ms: u64,
    /// Dashboard counters refresh interval
    pub stats_refresh_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            recency_window_ms: 5000,
            error_latch_ms: 1000,
            success_latch_ms: 4000,
            in_flight_expiry_ms: 5000,
            stats_refresh_ms: 9000,
        }
    }
}

impl TimingConfig {
    pub fn recency_window(&self) -> Duration {
        Duration::from_millis(self.recency_window_ms)
    }

    pub fn error_latch(&self) -> Duration {
        Duration::from_millis(self.error_latch_ms)
    }

    pub fn success_latch(&self) -> Duration {
        Duration::from_millis(self.success_latch_ms)
    }

    pub fn in_flight_expiry(&self) -> Duration {
        Duration::from_millis(self.in_flight_expiry_ms)
    }

    pub fn stats_refresh(&self) -> Duration {
        Duration::from_millis(self.stats_refresh_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
    /// Optional log file (stderr when absent)
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
        }
    }
}

/// TOML configuration file contents
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Ledger service base URL
    pub ledger_url: Option<String>,
    /// Per-request timeout for ledger calls (seconds)
    pub request_timeout_secs: Option<u64>,
    /// Identifies this handset in logs
    pub station_id: Option<String>,
    pub timing: TimingConfig,
    pub logging: LoggingConfig,
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub ledger_url: String,
    pub request_timeout: Duration,
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let config_dir = dirs::config_dir()
            .map(|d| d.join("whs"))
            .unwrap_or_else(|| PathBuf::from("./whs_config"));
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("whs"))
            .unwrap_or_else(|| PathBuf::from("./whs_data"));

        Self {
            ledger_url: DEFAULT_LEDGER_URL.to_string(),
            request_timeout: Duration::from_secs(15),
            config_dir,
            data_dir,
        }
    }
}

/// Default TOML path for a module, e.g. `~/.config/whs/whs-scan.toml`
pub fn default_config_path(module_name: &str) -> PathBuf {
    CompiledDefaults::for_current_platform()
        .config_dir
        .join(format!("{}.toml", module_name))
}

/// Resolve which config file to read
///
/// CLI path → `WHS_CONFIG` → platform default.
pub fn resolve_config_path(cli_arg: Option<&Path>, module_name: &str) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    default_config_path(module_name)
}

/// Parse TOML config text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    Ok(toml::from_str(content)?)
}

/// Load TOML config, degrading to defaults when missing or invalid
pub fn load_toml_config(path: &Path) -> TomlConfig {
    if !path.exists() {
        warn!(
            "Config file not found: {} (using compiled defaults)",
            path.display()
        );
        return TomlConfig::default();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read config {}: {} (using defaults)", path.display(), e);
            return TomlConfig::default();
        }
    };

    match parse_toml_config(&content) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{} in {} (using defaults)", e, path.display());
            TomlConfig::default()
        }
    }
}

/// Write TOML config (creates parent directory)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Resolve ledger base URL: CLI → `WHS_LEDGER_URL` → TOML → default
///
/// Trailing slashes are removed so paths can be appended directly.
pub fn resolve_ledger_url(cli_arg: Option<&str>, toml_config: &TomlConfig) -> Result<String> {
    let candidate = cli_arg
        .map(str::to_string)
        .or_else(|| std::env::var(LEDGER_URL_ENV).ok())
        .or_else(|| toml_config.ledger_url.clone())
        .unwrap_or_else(|| DEFAULT_LEDGER_URL.to_string());

    let trimmed = candidate.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::Config(format!(
            "Ledger URL must start with http:// or https://: {}",
            candidate
        )));
    }
    Ok(trimmed.to_string())
}

/// Request timeout: TOML → default
pub fn resolve_request_timeout(toml_config: &TomlConfig) -> Duration {
    toml_config
        .request_timeout_secs
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| CompiledDefaults::for_current_platform().request_timeout)
}
