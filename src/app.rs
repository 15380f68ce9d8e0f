//! Application orchestrator.
//! Loads/merges config, initializes logging, installs signal handlers, runs
//! discovery, and drives the relocation with console progress.

use anyhow::{Result, anyhow};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

use game_move::output as out;
use game_move::relocate::format_bytes;
use game_move::{
    CancelToken, Config, Discovery, GameMoveError, KnownPathsDiscovery, RelocationOutcome,
    Relocator, RollbackStatus, TransferOptions, TransferProgress, default_config_path,
};
use game_move::config::{LoadResult, load_or_init};

use crate::logging::init_tracing;
use game_move::cli::Args;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle --print-config before logging init
    if args.print_config {
        if let Ok(cfg_env) = std::env::var("GAME_MOVE_CONFIG") {
            out::print_info(&format!("Using GAME_MOVE_CONFIG (explicit):\n  {}\n", cfg_env));
            out::print_info("To override, unset GAME_MOVE_CONFIG or set it to another file.");
            return Ok(());
        }
        match default_config_path() {
            Ok(p) => {
                out::print_info(&format!("Default game_move config path:\n  {}\n", p.display()));
                if p.exists() {
                    out::print_info("A config file already exists at that location.");
                } else {
                    out::print_info(
                        "No config file exists there yet. Run without --print-config to create a template.",
                    );
                }
            }
            Err(e) => {
                out::print_error(&format!("Could not determine a default config path: {e}"));
            }
        }
        return Ok(());
    }

    // Create template config if none exists (before logging init)
    if let LoadResult::CreatedTemplate(path) = load_or_init()? {
        out::print_success(&format!(
            "A template game_move config was written to: {}",
            path.display()
        ));
        out::print_info(
            "Edit the file to set per-platform install roots and optionally `log_level` and `log_file`. Example:\n\n<config>\n  <steam_root>D:\\Steam\\steamapps\\common\\Grand Theft Auto V</steam_root>\n  <log_level>normal</log_level>\n  <log_file>C:\\Users\\me\\game_move.log</log_file>\n</config>\n",
        );
        out::print_info("Then re-run this command. To use a different location set GAME_MOVE_CONFIG.");
        return Ok(());
    }

    // Build config (may read XML), then apply CLI overrides (CLI wins).
    let mut cfg = Config::load();
    args.apply_overrides(&mut cfg);

    // Initialize logging and capture the guard so we can drop it on signal
    let guard_opt = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json)
        .map_err(|e| {
            out::print_error(&format!("Failed to initialize logging: {}", e));
            e
        })?;

    // Guard needs to be dropped on SIGINT to flush logs
    let cancel = CancelToken::new();
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let cancel = cancel.clone();
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            cancel.request();
            out::print_warn("Received interrupt; stopping after the current file and rolling back...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take(); // drop guard here to flush tracing_appender
            }
        })
        .expect("failed to install signal handler");
    }

    debug!("Starting game_move: {:?}", args);

    let result = run_inner(&args, &cfg, &cancel);

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }

    result
}

fn run_inner(args: &Args, cfg: &Config, cancel: &CancelToken) -> Result<()> {
    let discovery = KnownPathsDiscovery::from_config(cfg);
    let installs = discovery.find_all();

    if args.list {
        if installs.is_empty() {
            out::print_info("No installations found.");
            return Ok(());
        }
        for record in &installs {
            out::print_user(&format!(
                "{:<15} {:>10}  {}",
                record.platform.label(),
                format_bytes(record.size_bytes),
                record.path.display()
            ));
        }
        if installs.len() > 1 {
            out::print_warn(
                "Multiple installations detected. Remove stale copies before moving, or the launchers may disagree about which one is real.",
            );
        }
        return Ok(());
    }

    let Some(target) = args.target else {
        out::print_error("Nothing to do: pass --to <platform> to move, or --list to inspect.");
        return Err(anyhow!("no target platform given"));
    };

    if installs.is_empty() {
        error!(kind = "installation_missing", "No installation found on this system");
        out::print_error("No installation found. Use --list to see where game_move searches.");
        return Err(anyhow!("no installation found"));
    }
    // Prefer a record not already on the target so duplicate installs do not
    // shadow the one that can actually move.
    let record = installs
        .iter()
        .find(|r| r.platform != target)
        .unwrap_or(&installs[0]);
    if installs.len() > 1 {
        out::print_warn(&format!(
            "Multiple installations detected; moving the {} copy at {}",
            record.platform,
            record.path.display()
        ));
    }

    if args.dry_run {
        let dest = discovery
            .install_root(target)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unresolvable>".to_owned());
        out::print_info(&format!(
            "Dry-run: would move '{}' ({}) -> '{}'",
            record.path.display(),
            format_bytes(record.size_bytes),
            dest
        ));
        return Ok(());
    }

    let relocator = Relocator::with_options(
        discovery,
        TransferOptions {
            force_copy: args.force_copy,
            preserve_mtimes: cfg.preserve_mtimes,
        },
    );

    let sink = |p: TransferProgress| {
        let eta = p
            .eta_seconds
            .map(|s| format!("  eta {}s", s))
            .unwrap_or_default();
        let file = p
            .current_file
            .as_deref()
            .map(|f| f.display().to_string())
            .unwrap_or_default();
        out::print_progress(&format!(
            "{:5.1}%  {:>10}  {:6.1} MB/s{}  {}",
            p.percent(),
            format_bytes(p.processed_bytes),
            p.speed_mbps,
            eta,
            file
        ));
    };

    let outcome = relocator.relocate(record, target, Some(&sink), cancel);
    out::finish_progress();

    match outcome {
        RelocationOutcome::Success { method, destination } => {
            info!(source = %record.path.display(), dest = %destination.display(), ?method, "Move completed");
            out::print_success(&format!(
                "Moved {} installation to {} ({})",
                record.platform,
                destination.display(),
                target
            ));
            Ok(())
        }
        RelocationOutcome::Cancelled { rollback } => match rollback {
            RollbackStatus::Failed => {
                out::print_error(
                    "Cancelled, but cleanup failed: partial files may remain at the destination. Remove them manually before retrying.",
                );
                Err(anyhow!("cancelled; cleanup failed"))
            }
            _ => {
                out::print_warn("Cancelled. The original installation is intact.");
                Ok(())
            }
        },
        RelocationOutcome::Failed { error, rollback } => {
            log_failure(&error);
            match rollback {
                RollbackStatus::Failed => {
                    out::print_error(&format!("Move failed: {error}"));
                    out::print_error(
                        "Rollback ALSO failed: the installation may be split across both locations. Do not delete anything; inspect both paths and restore manually.",
                    );
                    Err(anyhow!("move failed and rollback failed: {error}"))
                }
                RollbackStatus::Completed => {
                    out::print_error(&format!(
                        "Move failed: {error}. The original installation was restored."
                    ));
                    Err(anyhow!(error))
                }
                RollbackStatus::NotNeeded => {
                    out::print_error(&format!("Move failed: {error}"));
                    Err(anyhow!(error))
                }
            }
        }
    }
}

/// Structured failure logging; one arm per error kind so log consumers can
/// match on `kind` instead of message text.
fn log_failure(err: &GameMoveError) {
    let code = err.code();
    match err {
        GameMoveError::InstallationMissing(path) => {
            error!(code, kind = "installation_missing", path = %path.display(), "Move failed")
        }
        GameMoveError::AlreadyOnPlatform(platform) => {
            error!(code, kind = "already_on_platform", %platform, "Move failed")
        }
        GameMoveError::LauncherNotInstalled(platform) => {
            error!(code, kind = "launcher_not_installed", %platform, "Move failed")
        }
        GameMoveError::ProcessRunning { name } => {
            error!(code, kind = "process_running", process = %name, "Move failed")
        }
        GameMoveError::TargetUnresolvable(platform) => {
            error!(code, kind = "target_unresolvable", %platform, "Move failed")
        }
        GameMoveError::TargetExists(path) => {
            error!(code, kind = "target_exists", path = %path.display(), "Move failed")
        }
        GameMoveError::InsufficientSpace {
            required_with_margin,
            available,
            shortfall,
            dest,
        } => {
            error!(
                code,
                kind = "insufficient_space",
                required = *required_with_margin,
                available = *available,
                shortfall = *shortfall,
                dest = %dest.display(),
                "Move failed"
            )
        }
        GameMoveError::Busy => {
            error!(code, kind = "busy", "Move failed")
        }
        GameMoveError::SourceUnreadable { path, .. } => {
            error!(code, kind = "source_unreadable", path = %path.display(), "Move failed")
        }
        GameMoveError::Io { op, path, .. } => {
            error!(code, kind = "io", op, path = %path.display(), "Move failed")
        }
        GameMoveError::SourceCleanup { path, .. } => {
            error!(code, kind = "source_cleanup", path = %path.display(), "Move failed")
        }
        GameMoveError::Cancelled => {
            error!(code, kind = "cancelled", "Move aborted")
        }
        GameMoveError::VerificationFailed { missing, mismatched } => {
            error!(
                code,
                kind = "verification_failed",
                missing = *missing,
                mismatched = *mismatched,
                "Move failed"
            )
        }
    }
}
