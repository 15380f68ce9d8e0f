//! Core configuration types.
//! - Config holds runtime settings with sensible defaults.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::paths;
use super::xml;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration used by the relocator and CLI.
#[derive(Debug, Clone)]
pub struct Config {
    /// Preferred Steam install root, prepended to the built-in search table
    pub steam_root: Option<PathBuf>,
    /// Preferred Rockstar install root
    pub rockstar_root: Option<PathBuf>,
    /// Preferred Epic install root
    pub epic_root: Option<PathBuf>,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
    /// If true, preserve file modification times on the copy path
    pub preserve_mtimes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            steam_root: None,
            rockstar_root: None,
            epic_root: None,
            log_level: LogLevel::Normal,
            // paths::default_log_path() returns Result<PathBuf>; store Some(path) on success.
            log_file: paths::default_log_path().ok(),
            preserve_mtimes: false,
        }
    }
}

impl Config {
    /// Defaults merged with whatever the XML config file provides.
    pub fn load() -> Self {
        let mut cfg = Self::default();
        if let Some(settings) = xml::load_config_from_xml() {
            if settings.steam_root.is_some() {
                cfg.steam_root = settings.steam_root;
            }
            if settings.rockstar_root.is_some() {
                cfg.rockstar_root = settings.rockstar_root;
            }
            if settings.epic_root.is_some() {
                cfg.epic_root = settings.epic_root;
            }
            if let Some(level) = settings.log_level {
                cfg.log_level = level;
            }
            if settings.log_file.is_some() {
                cfg.log_file = settings.log_file;
            }
            if let Some(preserve) = settings.preserve_mtimes {
                cfg.preserve_mtimes = preserve;
            }
        }
        cfg
    }
}
