//! Command-line arguments for the `conductor` binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Conductor: executes planned actions across built-in modules and webhook executors.
#[derive(Parser, Debug)]
#[command(name = "conductor", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Priority: --config flag > CONDUCTOR_CONFIG env var > ~/.conductor/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("CONDUCTOR_CONFIG") {
            return PathBuf::from(p);
        }
        conductor_home().join("config.toml")
    }

    /// Priority: --port flag > CONDUCTOR_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        std::env::var("CONDUCTOR_PORT")
            .ok()
            .and_then(|val| val.parse::<u16>().ok())
            .unwrap_or(config_port)
    }

    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Per-user state directory, `~/.conductor`.
pub fn conductor_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    let home = std::env::var("USERPROFILE");
    #[cfg(not(target_os = "windows"))]
    let home = std::env::var("HOME");

    match home {
        Ok(home) => PathBuf::from(home).join(".conductor"),
        Err(_) => PathBuf::from(".conductor"),
    }
}
