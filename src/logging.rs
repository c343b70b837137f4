//! Logging
//!
//! `tracing` subscriber setup. Operation records ("Create file: /a",
//! "Moving: /a to /b") are emitted at `info`, failed operations at `warn`, and
//! lock-protocol detail at `debug`/`trace`.
//!
//! Settings are resolved per field: CLI flags (merged into the config by the
//! caller), then `TREEFS_LOG*` environment variables, then the config file,
//! then defaults.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const ENV_FILTER: &str = "TREEFS_LOG";
const ENV_MODULES: &str = "TREEFS_LOG_MODULES";
const ENV_FORMAT: &str = "TREEFS_LOG_FORMAT";
const ENV_OUTPUT: &str = "TREEFS_LOG_OUTPUT";
const ENV_FILE: &str = "TREEFS_LOG_FILE";

/// Logging section of the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// trace, debug, info, warn, error or off
    #[serde(default = "default_level")]
    pub level: String,

    /// text or json
    #[serde(default = "default_format")]
    pub format: String,

    /// stdout, stderr, file, file+stderr or both
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file when `output` includes a file; platform state dir otherwise
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// ANSI colors for text written to a terminal stream
    #[serde(default = "default_true")]
    pub color: bool,

    /// Per-module levels, e.g. `treefs::tree = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: true,
            modules: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ApiError::ConfigError(format!(
                "Invalid log format: {} (must be 'json' or 'text')",
                other
            ))),
        }
    }
}

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Destinations {
    stdout: bool,
    stderr: bool,
    file: bool,
}

impl FromStr for Destinations {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (stdout, stderr, file) = match s {
            "stdout" => (true, false, false),
            "stderr" => (false, true, false),
            "both" => (true, true, false),
            "file" => (false, false, true),
            "file+stderr" => (false, true, true),
            other => {
                return Err(ApiError::ConfigError(format!(
                    "Invalid log output: {} (must be 'stdout', 'stderr', 'both', 'file' or 'file+stderr')",
                    other
                )))
            }
        };
        Ok(Self {
            stdout,
            stderr,
            file,
        })
    }
}

/// Log file location: explicit path, then `TREEFS_LOG_FILE`, then the
/// configured file, then `<state dir>/treefs.log`.
pub fn resolve_log_file_path(
    cli_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
) -> Result<PathBuf, ApiError> {
    let from_env = std::env::var(ENV_FILE).ok().map(PathBuf::from);
    [cli_file, from_env, config_file]
        .into_iter()
        .flatten()
        .find(|path| !path.as_os_str().is_empty())
        .map(Ok)
        .unwrap_or_else(default_log_file_path)
}

fn default_log_file_path() -> Result<PathBuf, ApiError> {
    let dirs = directories::ProjectDirs::from("", "treefs", "treefs").ok_or_else(|| {
        ApiError::ConfigError("Could not determine a state directory for the log file".to_string())
    })?;
    let dir = dirs.state_dir().unwrap_or_else(|| dirs.cache_dir());
    Ok(dir.join("treefs.log"))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ApiError> {
    let defaults = LoggingConfig::default();
    let config = config.unwrap_or(&defaults);

    let installed = if !config.enabled {
        Registry::default()
            .with(EnvFilter::new("off"))
            .with(fmt::layer().with_writer(std::io::sink))
            .try_init()
    } else {
        let filter = build_env_filter(config)?;
        let format = env_or(ENV_FORMAT, &config.format).parse::<LogFormat>()?;
        let destinations = env_or(ENV_OUTPUT, &config.output).parse::<Destinations>()?;
        let writer = make_writer(destinations, config)?;
        let registry = Registry::default().with(filter);

        match format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_thread_ids(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_writer(writer),
                )
                .try_init(),
            LogFormat::Text => registry
                .with(
                    fmt::layer()
                        .with_thread_ids(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(config.color && !destinations.file)
                        .with_writer(writer),
                )
                .try_init(),
        }
    };
    installed.map_err(|e| ApiError::ConfigError(format!("Failed to install logger: {}", e)))
}

/// A set, non-empty environment variable wins over the configured value.
/// Invalid values are reported by the caller's parse.
fn env_or(var: &str, configured: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| configured.to_string())
}

fn make_writer(destinations: Destinations, config: &LoggingConfig) -> Result<BoxMakeWriter, ApiError> {
    let writer = match destinations {
        Destinations { file: true, stderr, .. } => {
            let file = open_log_file(&resolve_log_file_path(None, config.file.clone())?)?;
            if stderr {
                BoxMakeWriter::new(file.and(std::io::stderr))
            } else {
                BoxMakeWriter::new(file)
            }
        }
        Destinations {
            stdout: true,
            stderr: true,
            ..
        } => BoxMakeWriter::new(std::io::stdout.and(std::io::stderr)),
        Destinations { stdout: true, .. } => BoxMakeWriter::new(std::io::stdout),
        _ => BoxMakeWriter::new(std::io::stderr),
    };
    Ok(writer)
}

fn open_log_file(path: &Path) -> Result<Mutex<File>, ApiError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ApiError::ConfigError(format!("Failed to create log directory {}: {}", parent.display(), e))
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ApiError::ConfigError(format!("Failed to open log file {}: {}", path.display(), e)))?;
    Ok(Mutex::new(file))
}

/// `TREEFS_LOG` replaces the filter outright. Otherwise the configured level
/// is the base, refined by configured module levels and then by
/// `TREEFS_LOG_MODULES=module=level,...`.
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, ApiError> {
    if let Ok(filter) = EnvFilter::try_from_env(ENV_FILTER) {
        return Ok(filter);
    }
    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let env_modules = std::env::var(ENV_MODULES).unwrap_or_default();
    let overrides = config
        .modules
        .iter()
        .map(|(module, level)| (module.as_str(), level.as_str()))
        .chain(
            env_modules
                .split(',')
                .filter_map(|pair| pair.split_once('='))
                .map(|(module, level)| (module.trim(), level.trim())),
        );

    let mut filter = EnvFilter::new(&config.level);
    for (module, level) in overrides {
        let directive = format!("{}={}", module, level)
            .parse()
            .map_err(|e| ApiError::ConfigError(format!("Invalid log directive {}={}: {}", module, level, e)))?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}
