//! Tree transfer implementation.
//! Tries an atomic rename first; when the destination sits on another volume
//! the rename fails with a cross-device error and the transfer falls back to
//! a recursive copy followed by deletion of the source. Only the fallback
//! path reports progress or honors cancellation; the rename is near-instant
//! and either happens entirely or not at all.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::cancel::CancelToken;
use crate::errors::GameMoveError;

use super::progress::{ProgressSink, ProgressTracker};

/// How a completed transfer actually moved the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMethod {
    /// Single atomic rename on the same volume.
    FastRename,
    /// Recursive copy to the destination, then removal of the source.
    CopyThenDelete,
}

/// Knobs for a transfer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferOptions {
    /// Skip the rename attempt and always copy+delete. Useful when the
    /// caller wants the copy-before-delete window (and its progress
    /// reporting) even on a same-volume move.
    pub force_copy: bool,
    /// Best-effort preservation of file modification times on the copy path.
    pub preserve_mtimes: bool,
}

/// Move the tree at `source` to `dest`.
///
/// Errors: an unreadable source or a non-cross-device rename failure is
/// fatal and leaves no partial state behind; mid-copy failures and
/// cancellation leave a partial destination beside the intact source for the
/// orchestrator's rollback to clean up. A cross-device rename failure is
/// handled internally and never surfaces to the caller.
pub fn transfer(
    source: &Path,
    dest: &Path,
    opts: &TransferOptions,
    sink: Option<ProgressSink<'_>>,
    cancel: &CancelToken,
) -> Result<TransferMethod, GameMoveError> {
    // Readability probe before anything is created on the destination side.
    fs::read_dir(source).map_err(|e| GameMoveError::SourceUnreadable {
        path: source.to_path_buf(),
        source: e,
    })?;

    if !opts.force_copy {
        match fs::rename(source, dest) {
            Ok(()) => {
                info!(src = %source.display(), dest = %dest.display(), "renamed directory atomically");
                return Ok(TransferMethod::FastRename);
            }
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                debug!(
                    src = %source.display(),
                    dest = %dest.display(),
                    "rename crossed devices, falling back to copy+delete"
                );
            }
            Err(e) => {
                return Err(GameMoveError::Io {
                    op: "rename directory",
                    path: dest.to_path_buf(),
                    source: e,
                });
            }
        }
    }

    copy_tree(source, dest, opts, sink, cancel)?;

    fs::remove_dir_all(source).map_err(|e| GameMoveError::SourceCleanup {
        path: source.to_path_buf(),
        source: e,
    })?;

    info!(src = %source.display(), dest = %dest.display(), "copied directory contents and removed source");
    Ok(TransferMethod::CopyThenDelete)
}

/// Recursive copy with mirrored layout, overwrite-if-exists semantics,
/// per-entry cancellation checks and throttled progress reports.
fn copy_tree(
    source: &Path,
    dest: &Path,
    opts: &TransferOptions,
    sink: Option<ProgressSink<'_>>,
    cancel: &CancelToken,
) -> Result<(), GameMoveError> {
    fs::create_dir_all(dest).map_err(|e| GameMoveError::Io {
        op: "create destination directory",
        path: dest.to_path_buf(),
        source: e,
    })?;

    // Mirror the directory skeleton first so file copies never race a
    // missing parent.
    for entry in WalkDir::new(source)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir())
    {
        if cancel.is_requested() {
            return Err(GameMoveError::Cancelled);
        }
        if let Ok(rel) = entry.path().strip_prefix(source) {
            let new_dir = dest.join(rel);
            fs::create_dir_all(&new_dir).map_err(|e| GameMoveError::Io {
                op: "create directory",
                path: new_dir.clone(),
                source: e,
            })?;
        }
    }

    let files: Vec<(std::path::PathBuf, u64)> = WalkDir::new(source)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let len = e.metadata().ok()?.len();
            Some((e.into_path(), len))
        })
        .collect();

    let total: u64 = files.iter().map(|(_, len)| *len).sum();
    let mut tracker = ProgressTracker::new(total, sink);

    for (path, _len) in &files {
        if cancel.is_requested() {
            return Err(GameMoveError::Cancelled);
        }
        let rel = path
            .strip_prefix(source)
            .map_err(|_| GameMoveError::Io {
                op: "relativize file path",
                path: path.clone(),
                source: io::Error::other("file escaped the source root"),
            })?;
        let dst = dest.join(rel);
        let copied = fs::copy(path, &dst).map_err(|e| GameMoveError::Io {
            op: "copy file",
            path: dst.clone(),
            source: e,
        })?;
        if opts.preserve_mtimes
            && let Ok(meta) = fs::metadata(path)
        {
            let mtime = filetime::FileTime::from_last_modification_time(&meta);
            let _ = filetime::set_file_mtime(&dst, mtime);
        }
        tracker.file_done(copied, rel);
    }

    tracker.finish();
    Ok(())
}
