//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - CLI flags override config values (which are loaded from XML if present).
//! - --debug is a shorthand for --log-level debug.

use clap::{Parser, ValueHint};
use std::path::PathBuf;

use crate::config::{Config, LogLevel};
use crate::discovery::Platform;

/// CLI wrapper for the game_move library.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Relocate a GTA V installation between launcher platforms (Rust)"
)]
pub struct Args {
    /// Target platform to move the installation to: steam, rockstar or epic.
    #[arg(long = "to", short = 't', value_name = "PLATFORM")]
    pub target: Option<Platform>,

    /// List detected installations and exit.
    #[arg(long, short = 'l', help = "List detected installations and exit")]
    pub list: bool,

    /// Show what would be moved, but do not modify files/directories.
    #[arg(long, help = "Show what would be done, but do not modify files/directories")]
    pub dry_run: bool,

    /// Always copy+delete instead of attempting an atomic rename first.
    #[arg(
        long,
        help = "Always copy then delete, even on the same volume (slower, shows progress)"
    )]
    pub force_copy: bool,

    /// Preserve file modification times on the copy path. Off by default.
    #[arg(long, help = "Preserve file modification times on the copy path; slower")]
    pub preserve_mtimes: bool,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Append logs to this file in addition to stdout.
    #[arg(long, value_hint = ValueHint::FilePath, help = "Append logs to this file")]
    pub log_file: Option<PathBuf>,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, help = "Emit logs in structured JSON")]
    pub json: bool,

    /// Print where game_move will look for the config file (or GAME_MOVE_CONFIG if set), then exit.
    #[arg(long, help = "Print the config file location used by game_move and exit")]
    pub print_config: bool,
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(path) = &self.log_file {
            cfg.log_file = Some(path.clone());
        }
        if self.preserve_mtimes {
            cfg.preserve_mtimes = true;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
