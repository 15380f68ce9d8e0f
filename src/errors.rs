//! Typed error definitions for game_move.
//! Provides a small set of well-known failure modes for better logs and tests.
//! Callers branch on the variant (or `code()`), never on message text.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::discovery::Platform;

#[derive(Debug, Error)]
pub enum GameMoveError {
    #[error("No installation found at {0}")]
    InstallationMissing(PathBuf),

    #[error("Installation is already on {0}")]
    AlreadyOnPlatform(Platform),

    #[error("{0} launcher is not installed on this system")]
    LauncherNotInstalled(Platform),

    #[error("Process '{name}' is running; close it before moving the installation")]
    ProcessRunning { name: String },

    #[error("Could not determine a target path for {0}")]
    TargetUnresolvable(Platform),

    #[error("Target directory already exists: {0}")]
    TargetExists(PathBuf),

    #[error(
        "Insufficient disk space for destination {dest}: need {required_with_margin} bytes \
         (including safety margin), have {available} bytes ({shortfall} bytes short)"
    )]
    InsufficientSpace {
        required_with_margin: u64,
        available: u64,
        shortfall: u64,
        dest: PathBuf,
    },

    #[error("Another relocation is already in progress")]
    Busy,

    #[error("Source directory unreadable: {path}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to {op}: {path}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Copy completed but removing the source failed: {path}")]
    SourceCleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Destination failed verification: {missing} missing, {mismatched} size-mismatched")]
    VerificationFailed { missing: usize, mismatched: usize },
}

impl GameMoveError {
    /// Stable numeric code for structured logs and scripting.
    pub fn code(&self) -> i32 {
        match self {
            GameMoveError::InstallationMissing(_) => 10,
            GameMoveError::AlreadyOnPlatform(_) => 11,
            GameMoveError::LauncherNotInstalled(_) => 12,
            GameMoveError::ProcessRunning { .. } => 13,
            GameMoveError::TargetUnresolvable(_) => 14,
            GameMoveError::TargetExists(_) => 15,
            GameMoveError::InsufficientSpace { .. } => 16,
            GameMoveError::Busy => 17,
            GameMoveError::SourceUnreadable { .. } => 20,
            GameMoveError::Io { .. } => 21,
            GameMoveError::SourceCleanup { .. } => 22,
            GameMoveError::Cancelled => 30,
            GameMoveError::VerificationFailed { .. } => 40,
        }
    }

    /// True for failures detected before any filesystem mutation.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            GameMoveError::InstallationMissing(_)
                | GameMoveError::AlreadyOnPlatform(_)
                | GameMoveError::LauncherNotInstalled(_)
                | GameMoveError::ProcessRunning { .. }
                | GameMoveError::TargetUnresolvable(_)
                | GameMoveError::TargetExists(_)
                | GameMoveError::InsufficientSpace { .. }
                | GameMoveError::Busy
        )
    }
}
