//! Core library for `game_move`.
//!
//! Relocates a large game installation between launcher platforms while
//! preserving byte-for-byte integrity. The flow is: snapshot the source tree,
//! move it (atomic rename when the volumes match, recursive copy plus delete
//! when they do not), verify the destination against the snapshot, and roll
//! back on failure. Progress is reported through a callback at a bounded
//! cadence and the copy path honors cooperative cancellation.
//!
//! Keep the library small and ergonomic: discovery is a pluggable trait, the
//! orchestrator is a `Relocator` value, and the individual building blocks
//! (`snapshot`, `verify`, `transfer`, `check_space`) are plain functions.

pub mod cancel;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod output;
pub mod platform;
pub mod processes;
pub mod relocate;

pub use cancel::CancelToken;
pub use config::{
    Config, LogLevel, default_config_path, default_log_path, path_has_symlink_ancestor,
};
pub use discovery::{Discovery, InstallationRecord, KnownPathsDiscovery, Platform, tree_size};
pub use errors::GameMoveError;
pub use relocate::{
    RelocationHandle, RelocationOutcome, Relocator, RollbackStatus, SpaceCheck, TransferMethod,
    TransferOptions, TransferProgress, TreeSnapshot, VerificationReport, check_space, snapshot,
    spawn_relocation, transfer, verify,
};
