//! Relocation orchestrator.
//! Composes preflight checks, tree snapshot, transfer and post-transfer
//! verification into one attempt with rollback on failure.
//!
//! An attempt walks a fixed sequence of phases: preflight, snapshotting,
//! transferring, verifying, then either succeeded or rolling back (which
//! itself ends rolled-back or rollback-failed). Cancellation exits the
//! transferring phase into the same rollback evaluation. Phase transitions
//! are emitted as structured log events.
//!
//! Invariant: at most one of {source tree, destination tree} fully exists as
//! a valid installation at any time, except transiently during the
//! copy-before-delete window of the fallback transfer. Rollback exists to
//! restore that invariant after a partial failure.

mod progress;
mod snapshot;
mod space;
mod transfer;

pub use progress::{PROGRESS_INTERVAL, ProgressSink, TransferProgress};
pub use snapshot::{SnapshotEntry, TreeSnapshot, VerificationReport, snapshot, verify};
pub use space::{SpaceCheck, check_space, format_bytes, required_with_margin};
pub use transfer::{TransferMethod, TransferOptions, transfer};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::{error, info, warn};

use crate::cancel::CancelToken;
use crate::discovery::{Discovery, InstallationRecord, Platform};
use crate::errors::GameMoveError;
use crate::processes;

/// What happened to the partial state after a failed or cancelled attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackStatus {
    /// Nothing needed restoring (typically a preflight failure).
    NotNeeded,
    /// The original layout was restored.
    Completed,
    /// Restoration failed; the installation may be split across both
    /// locations and needs manual recovery. Strictly worse than a plain
    /// failure and surfaced as such.
    Failed,
}

/// Terminal result of one relocation attempt.
#[derive(Debug)]
pub enum RelocationOutcome {
    Success {
        method: TransferMethod,
        destination: PathBuf,
    },
    /// Cooperative cancellation; not an error.
    Cancelled { rollback: RollbackStatus },
    Failed {
        error: GameMoveError,
        rollback: RollbackStatus,
    },
}

impl RelocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RelocationOutcome::Success { .. })
    }

    /// True when the attempt left the installation in a state requiring
    /// manual intervention.
    pub fn rollback_failed(&self) -> bool {
        matches!(
            self,
            RelocationOutcome::Cancelled {
                rollback: RollbackStatus::Failed
            } | RelocationOutcome::Failed {
                rollback: RollbackStatus::Failed,
                ..
            }
        )
    }
}

/// Orchestrates relocation attempts against a discovery capability.
///
/// One attempt at a time: callers are expected to serialize invocations, and
/// a guard turns a second concurrent call into a clean `Busy` failure
/// instead of a filesystem race.
pub struct Relocator<D> {
    discovery: D,
    options: TransferOptions,
    in_flight: AtomicBool,
}

impl<D: Discovery> Relocator<D> {
    pub fn new(discovery: D) -> Self {
        Self::with_options(discovery, TransferOptions::default())
    }

    pub fn with_options(discovery: D, options: TransferOptions) -> Self {
        Self {
            discovery,
            options,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn discovery(&self) -> &D {
        &self.discovery
    }

    /// Move `record` to `target`'s preferred install root.
    ///
    /// Never panics on filesystem trouble and never lets a raw I/O error
    /// escape: every failure is folded into the outcome taxonomy.
    pub fn relocate(
        &self,
        record: &InstallationRecord,
        target: Platform,
        sink: Option<ProgressSink<'_>>,
        cancel: &CancelToken,
    ) -> RelocationOutcome {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return RelocationOutcome::Failed {
                error: GameMoveError::Busy,
                rollback: RollbackStatus::NotNeeded,
            };
        }
        let outcome = self.run(record, target, sink, cancel);
        self.in_flight.store(false, Ordering::SeqCst);

        match &outcome {
            RelocationOutcome::Success {
                method,
                destination,
            } => {
                info!(phase = "succeeded", ?method, dest = %destination.display(), "relocation complete");
            }
            RelocationOutcome::Cancelled { rollback } => {
                warn!(phase = "cancelled", ?rollback, "relocation cancelled");
            }
            RelocationOutcome::Failed { error, rollback } => {
                error!(
                    phase = "failed",
                    code = error.code(),
                    ?rollback,
                    error = %error,
                    "relocation failed"
                );
            }
        }
        outcome
    }

    fn run(
        &self,
        record: &InstallationRecord,
        target: Platform,
        sink: Option<ProgressSink<'_>>,
        cancel: &CancelToken,
    ) -> RelocationOutcome {
        let dest = match self.preflight(record, target) {
            Ok(dest) => dest,
            Err(error) => {
                return RelocationOutcome::Failed {
                    error,
                    rollback: RollbackStatus::NotNeeded,
                };
            }
        };

        if let Some(parent) = dest.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            return RelocationOutcome::Failed {
                error: GameMoveError::Io {
                    op: "create destination parent directory",
                    path: parent.to_path_buf(),
                    source: e,
                },
                rollback: RollbackStatus::NotNeeded,
            };
        }

        info!(phase = "snapshotting", src = %record.path.display(), "capturing baseline");
        let baseline = snapshot(&record.path);

        info!(
            phase = "transferring",
            src = %record.path.display(),
            dest = %dest.display(),
            files = baseline.len(),
            total_bytes = baseline.total_bytes(),
            "starting transfer"
        );
        match transfer(&record.path, &dest, &self.options, sink, cancel) {
            Ok(method) => finalize(&record.path, &dest, &baseline, method),
            Err(GameMoveError::Cancelled) => RelocationOutcome::Cancelled {
                rollback: rollback(&record.path, &dest, false),
            },
            Err(error @ GameMoveError::SourceCleanup { .. }) => {
                // The copy itself succeeded, so the destination is complete
                // and the half-removed source must not win the rollback.
                RelocationOutcome::Failed {
                    rollback: rollback(&record.path, &dest, true),
                    error,
                }
            }
            Err(error) => RelocationOutcome::Failed {
                rollback: rollback(&record.path, &dest, false),
                error,
            },
        }
    }

    /// All checks that must pass before any filesystem mutation.
    /// Returns the resolved destination root.
    fn preflight(
        &self,
        record: &InstallationRecord,
        target: Platform,
    ) -> Result<PathBuf, GameMoveError> {
        info!(phase = "preflight", src = %record.path.display(), %target, "checking preconditions");

        if !record.path.is_dir() {
            return Err(GameMoveError::InstallationMissing(record.path.clone()));
        }
        if record.platform == target {
            return Err(GameMoveError::AlreadyOnPlatform(target));
        }
        if !self.discovery.launcher_installed(target) {
            return Err(GameMoveError::LauncherNotInstalled(target));
        }
        if let Some(name) = processes::find_running(&self.discovery.guarded_processes()) {
            return Err(GameMoveError::ProcessRunning { name });
        }

        let dest = self
            .discovery
            .install_root(target)
            .ok_or(GameMoveError::TargetUnresolvable(target))?;
        if dest.exists() {
            return Err(GameMoveError::TargetExists(dest));
        }

        // Source and destination resolving to the same tree would make the
        // delete step destroy the copy.
        let src_real = dunce::canonicalize(&record.path).unwrap_or_else(|_| record.path.clone());
        if src_real == dest {
            return Err(GameMoveError::TargetExists(dest));
        }

        let check = check_space(&dest, record.size_bytes).map_err(|e| GameMoveError::Io {
            op: "query free space",
            path: dest.clone(),
            source: e,
        })?;
        if !check.has_space {
            return Err(GameMoveError::InsufficientSpace {
                required_with_margin: check.required_with_margin,
                available: check.available_bytes,
                shortfall: check.shortfall(),
                dest,
            });
        }

        Ok(dest)
    }
}

/// Verify the moved tree against the baseline and assemble the outcome.
/// A verification failure is treated exactly like a transfer failure: the
/// filesystem reported success, but the bytes on disk disagree.
fn finalize(
    source: &Path,
    dest: &Path,
    baseline: &TreeSnapshot,
    method: TransferMethod,
) -> RelocationOutcome {
    info!(phase = "verifying", dest = %dest.display(), files = baseline.len(), "checking destination");
    let report = verify(dest, baseline);
    if report.passed() {
        return RelocationOutcome::Success {
            method,
            destination: dest.to_path_buf(),
        };
    }

    error!(
        phase = "verifying",
        missing = report.missing.len(),
        mismatched = report.size_mismatches.len(),
        "destination failed verification, rolling back"
    );
    RelocationOutcome::Failed {
        rollback: rollback(source, dest, true),
        error: GameMoveError::VerificationFailed {
            missing: report.missing.len(),
            mismatched: report.size_mismatches.len(),
        },
    }
}

/// Best-effort restoration of the single-install invariant after a failure.
///
/// `source_vacated` tells which side holds the only complete copy:
/// - vacated: the destination is the complete copy; rename it back home.
///   If the original path is occupied again (or the rename fails), refuse
///   to destroy anything and report the unrecovered state.
/// - not vacated: the source is intact and the destination is a partial
///   copy; remove the partial copy.
fn rollback(source: &Path, dest: &Path, source_vacated: bool) -> RollbackStatus {
    if !dest.exists() {
        return RollbackStatus::NotNeeded;
    }

    if source_vacated {
        info!(phase = "rolling_back", from = %dest.display(), to = %source.display(), "restoring original layout");
        if source.exists() {
            error!(
                phase = "rolling_back",
                source = %source.display(),
                dest = %dest.display(),
                "original path is occupied; refusing to overwrite, manual recovery required"
            );
            return RollbackStatus::Failed;
        }
        match fs::rename(dest, source) {
            Ok(()) => {
                info!(phase = "rolled_back", path = %source.display(), "original layout restored");
                RollbackStatus::Completed
            }
            Err(e) => {
                error!(
                    phase = "rolling_back",
                    error = %e,
                    dest = %dest.display(),
                    "rollback rename failed; installation stranded, manual recovery required"
                );
                RollbackStatus::Failed
            }
        }
    } else {
        info!(phase = "rolling_back", path = %dest.display(), "removing partial destination");
        match fs::remove_dir_all(dest) {
            Ok(()) => RollbackStatus::Completed,
            Err(e) => {
                error!(
                    phase = "rolling_back",
                    error = %e,
                    path = %dest.display(),
                    "failed to remove partial destination"
                );
                RollbackStatus::Failed
            }
        }
    }
}

/// Handle to a relocation running on its own worker thread.
pub struct RelocationHandle {
    cancel: CancelToken,
    join: thread::JoinHandle<RelocationOutcome>,
}

impl RelocationHandle {
    /// Request cooperative cancellation of the running attempt.
    pub fn cancel(&self) {
        self.cancel.request();
    }

    /// The token observed by the worker; clonable for signal handlers.
    pub fn token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Block until the attempt finishes and return its outcome.
    pub fn wait(self) -> RelocationOutcome {
        match self.join.join() {
            Ok(outcome) => outcome,
            // A panicking worker means the attempt state is unknown; report
            // it as unrecovered rather than pretending it rolled back.
            Err(_) => RelocationOutcome::Failed {
                error: GameMoveError::Io {
                    op: "join relocation worker",
                    path: PathBuf::new(),
                    source: io::Error::other("relocation worker panicked"),
                },
                rollback: RollbackStatus::Failed,
            },
        }
    }
}

/// Run one relocation on a dedicated worker thread so the caller's surface
/// stays responsive. Progress lands on the supplied sink from the worker;
/// marshalling onto a UI thread is the caller's job.
pub fn spawn_relocation<D>(
    relocator: Arc<Relocator<D>>,
    record: InstallationRecord,
    target: Platform,
    sink: Option<Box<dyn Fn(TransferProgress) + Send + Sync>>,
) -> RelocationHandle
where
    D: Discovery + Send + Sync + 'static,
{
    let cancel = CancelToken::new();
    let token = cancel.clone();
    let join = thread::spawn(move || {
        relocator.relocate(&record, target, sink.as_deref(), &token)
    });
    RelocationHandle { cancel, join }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::KnownPathsDiscovery;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, bytes: &[u8]) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, bytes).unwrap();
    }

    fn fake_install(root: &Path) {
        write(root, "game.bin", &[0u8; 128]);
        write(root, "update/update.rpf", &[1u8; 900]);
        write(root, "x64/audio/sfx.rpf", &[2u8; 250]);
    }

    fn record_for(path: &Path, platform: Platform) -> InstallationRecord {
        InstallationRecord {
            path: path.to_path_buf(),
            platform,
            size_bytes: crate::discovery::tree_size(path),
        }
    }

    /// Discovery whose tables point into a temp dir; marker matches fake_install.
    fn test_discovery(steam: &Path, epic: &Path) -> KnownPathsDiscovery {
        KnownPathsDiscovery::with_tables(
            vec![steam.to_path_buf()],
            vec![],
            vec![epic.to_path_buf()],
        )
        .marker("game.bin")
    }

    #[test]
    fn same_volume_relocation_succeeds_with_fast_rename() {
        let td = tempdir().unwrap();
        let steam = td.path().join("steam-install");
        let epic = td.path().join("epic-install");
        fake_install(&steam);

        let baseline = snapshot(&steam);
        let relocator = Relocator::new(test_discovery(&steam, &epic));
        let outcome = relocator.relocate(
            &record_for(&steam, Platform::Steam),
            Platform::Epic,
            None,
            &CancelToken::new(),
        );

        match outcome {
            RelocationOutcome::Success {
                method,
                destination,
            } => {
                assert_eq!(method, TransferMethod::FastRename);
                assert_eq!(destination, epic);
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert!(!steam.exists());
        assert!(verify(&epic, &baseline).passed());
    }

    #[test]
    fn forced_copy_relocation_matches_fast_path_postconditions() {
        let td = tempdir().unwrap();
        let steam = td.path().join("steam-install");
        let epic = td.path().join("epic-install");
        fake_install(&steam);

        let baseline = snapshot(&steam);
        let relocator = Relocator::with_options(
            test_discovery(&steam, &epic),
            TransferOptions {
                force_copy: true,
                ..Default::default()
            },
        );
        let outcome = relocator.relocate(
            &record_for(&steam, Platform::Steam),
            Platform::Epic,
            None,
            &CancelToken::new(),
        );

        assert!(outcome.is_success(), "{outcome:?}");
        assert!(!steam.exists());
        assert!(verify(&epic, &baseline).passed());
    }

    #[test]
    fn same_platform_move_is_rejected() {
        let td = tempdir().unwrap();
        let steam = td.path().join("steam-install");
        let epic = td.path().join("epic-install");
        fake_install(&steam);

        let relocator = Relocator::new(test_discovery(&steam, &epic));
        let outcome = relocator.relocate(
            &record_for(&steam, Platform::Steam),
            Platform::Steam,
            None,
            &CancelToken::new(),
        );
        match outcome {
            RelocationOutcome::Failed { error, rollback } => {
                assert!(matches!(error, GameMoveError::AlreadyOnPlatform(_)));
                assert_eq!(rollback, RollbackStatus::NotNeeded);
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn target_collision_fails_preflight_with_zero_mutation() {
        let td = tempdir().unwrap();
        let steam = td.path().join("steam-install");
        let epic = td.path().join("epic-install");
        fake_install(&steam);
        fs::create_dir_all(&epic).unwrap();

        let baseline = snapshot(&steam);
        let relocator = Relocator::new(test_discovery(&steam, &epic));
        let outcome = relocator.relocate(
            &record_for(&steam, Platform::Steam),
            Platform::Epic,
            None,
            &CancelToken::new(),
        );

        match outcome {
            RelocationOutcome::Failed { error, rollback } => {
                assert!(matches!(error, GameMoveError::TargetExists(_)));
                assert_eq!(rollback, RollbackStatus::NotNeeded);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        // Source tree untouched.
        assert!(verify(&steam, &baseline).passed());
    }

    #[test]
    fn missing_launcher_fails_preflight() {
        let td = tempdir().unwrap();
        let steam = td.path().join("steam-install");
        let epic = td.path().join("epic-install");
        fake_install(&steam);

        let discovery = test_discovery(&steam, &epic)
            .launcher_probe(Platform::Epic, td.path().join("no-such-launcher.exe"));
        let relocator = Relocator::new(discovery);
        let outcome = relocator.relocate(
            &record_for(&steam, Platform::Steam),
            Platform::Epic,
            None,
            &CancelToken::new(),
        );
        match outcome {
            RelocationOutcome::Failed { error, .. } => {
                assert!(matches!(error, GameMoveError::LauncherNotInstalled(Platform::Epic)));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn cancellation_mid_copy_leaves_source_intact_and_cleans_destination() {
        let td = tempdir().unwrap();
        let steam = td.path().join("steam-install");
        let epic = td.path().join("epic-install");
        fake_install(&steam);

        let baseline = snapshot(&steam);
        let cancel = CancelToken::new();
        // Cancel from inside the first progress report, mid-copy.
        let cancel_from_sink = cancel.clone();
        let sink = move |_p: TransferProgress| cancel_from_sink.request();

        let relocator = Relocator::with_options(
            test_discovery(&steam, &epic),
            TransferOptions {
                force_copy: true,
                ..Default::default()
            },
        );
        let outcome = relocator.relocate(
            &record_for(&steam, Platform::Steam),
            Platform::Epic,
            Some(&sink),
            &cancel,
        );

        match outcome {
            RelocationOutcome::Cancelled { rollback } => {
                assert_eq!(rollback, RollbackStatus::Completed);
            }
            other => panic!("expected cancellation, got {other:?}"),
        }
        assert!(verify(&steam, &baseline).passed(), "source must be intact");
        assert!(!epic.exists(), "partial destination must be removed");
    }

    #[test]
    fn verification_failure_rolls_the_installation_back() {
        let td = tempdir().unwrap();
        let steam = td.path().join("steam-install");
        let epic = td.path().join("epic-install");
        fake_install(&steam);

        // Corrupt the destination from the progress sink: whenever a copied
        // file is reported, truncate it behind the transfer's back.
        let epic_for_sink = epic.clone();
        let tampered: Mutex<bool> = Mutex::new(false);
        let sink = move |p: TransferProgress| {
            let mut done = tampered.lock().unwrap();
            if *done {
                return;
            }
            if let Some(rel) = &p.current_file {
                let victim = epic_for_sink.join(rel);
                if victim.exists() {
                    fs::write(&victim, b"").unwrap();
                    *done = true;
                }
            }
        };

        let baseline = snapshot(&steam);
        let relocator = Relocator::with_options(
            test_discovery(&steam, &epic),
            TransferOptions {
                force_copy: true,
                ..Default::default()
            },
        );
        let outcome = relocator.relocate(
            &record_for(&steam, Platform::Steam),
            Platform::Epic,
            Some(&sink),
            &CancelToken::new(),
        );

        match outcome {
            RelocationOutcome::Failed { error, rollback } => {
                assert!(matches!(error, GameMoveError::VerificationFailed { .. }));
                assert_eq!(rollback, RollbackStatus::Completed);
            }
            other => panic!("expected verification failure, got {other:?}"),
        }
        assert!(steam.exists(), "rollback must restore the source path");
        assert!(!epic.exists());
        // Size-only verification: all but the tampered file must be back.
        let report = verify(&steam, &baseline);
        assert!(report.missing.is_empty());
        assert_eq!(report.size_mismatches.len(), 1);
    }

    #[test]
    fn failed_rollback_is_escalated_not_downgraded() {
        let td = tempdir().unwrap();
        let src = td.path().join("src");
        let dst = td.path().join("dst");
        fake_install(&src);
        let baseline = snapshot(&src);

        // Complete the fallback transfer, then sabotage: damage the copy and
        // reoccupy the original path so the rollback rename cannot land.
        let opts = TransferOptions {
            force_copy: true,
            ..Default::default()
        };
        transfer(&src, &dst, &opts, None, &CancelToken::new()).unwrap();
        fs::remove_file(dst.join("game.bin")).unwrap();
        write(&src, "squatter.txt", b"someone else moved in");

        let outcome = finalize(&src, &dst, &baseline, TransferMethod::CopyThenDelete);
        match outcome {
            RelocationOutcome::Failed { error, rollback } => {
                assert!(matches!(error, GameMoveError::VerificationFailed { missing: 1, .. }));
                assert_eq!(rollback, RollbackStatus::Failed);
            }
            other => panic!("expected rollback failure, got {other:?}"),
        }
        assert!(outcome_is_unrecovered_sanity(&dst));
    }

    // The damaged copy must still exist after a failed rollback; nothing may
    // delete the only remaining data.
    fn outcome_is_unrecovered_sanity(dst: &Path) -> bool {
        dst.join("update/update.rpf").exists()
    }

    #[test]
    fn second_concurrent_invocation_is_rejected_as_busy() {
        let td = tempdir().unwrap();
        let steam = td.path().join("steam-install");
        let epic = td.path().join("epic-install");
        fake_install(&steam);

        let relocator = Arc::new(Relocator::with_options(
            test_discovery(&steam, &epic),
            TransferOptions {
                force_copy: true,
                ..Default::default()
            },
        ));
        let record = record_for(&steam, Platform::Steam);

        // Re-enter from the progress sink while the first attempt is copying.
        let inner = Arc::clone(&relocator);
        let inner_record = record.clone();
        let busy_seen = Arc::new(Mutex::new(false));
        let busy_flag = Arc::clone(&busy_seen);
        let sink = move |_p: TransferProgress| {
            let outcome = inner.relocate(
                &inner_record,
                Platform::Epic,
                None,
                &CancelToken::new(),
            );
            if let RelocationOutcome::Failed {
                error: GameMoveError::Busy,
                ..
            } = outcome
            {
                *busy_flag.lock().unwrap() = true;
            }
        };

        let outcome = relocator.relocate(&record, Platform::Epic, Some(&sink), &CancelToken::new());
        assert!(outcome.is_success(), "{outcome:?}");
        assert!(*busy_seen.lock().unwrap(), "inner call must observe Busy");
    }

    #[test]
    fn spawned_relocation_reports_through_the_handle() {
        let td = tempdir().unwrap();
        let steam = td.path().join("steam-install");
        let epic = td.path().join("epic-install");
        fake_install(&steam);

        let relocator = Arc::new(Relocator::new(test_discovery(&steam, &epic)));
        let record = record_for(&steam, Platform::Steam);
        let handle = spawn_relocation(relocator, record, Platform::Epic, None);
        let outcome = handle.wait();
        assert!(outcome.is_success(), "{outcome:?}");
        assert!(epic.exists());
    }
}
