use std::fs;
use std::path::Path;

use game_move::{
    CancelToken, Discovery, GameMoveError, InstallationRecord, KnownPathsDiscovery, Platform,
    RelocationOutcome, Relocator, RollbackStatus, snapshot, tree_size, verify,
};

fn write_file(root: &Path, rel: &str, contents: &[u8]) {
    let p = root.join(rel);
    fs::create_dir_all(p.parent().unwrap()).expect("create parent dirs");
    fs::write(&p, contents).expect("write content");
}

fn fake_install(root: &Path) {
    write_file(root, "game.bin", &[0u8; 256]);
    write_file(root, "update/update.rpf", &[1u8; 1500]);
}

fn record_for(path: &Path, platform: Platform) -> InstallationRecord {
    InstallationRecord {
        path: path.to_path_buf(),
        platform,
        size_bytes: tree_size(path),
    }
}

fn discovery(steam: &Path, rockstar: &Path) -> KnownPathsDiscovery {
    KnownPathsDiscovery::with_tables(
        vec![steam.to_path_buf()],
        vec![rockstar.to_path_buf()],
        vec![],
    )
    .marker("game.bin")
}

#[test]
fn relocation_moves_the_tree_and_verifies_it() {
    let td = tempfile::tempdir().unwrap();
    let steam = td.path().join("steam");
    let rockstar = td.path().join("rockstar");
    fake_install(&steam);
    let baseline = snapshot(&steam);

    let relocator = Relocator::new(discovery(&steam, &rockstar));
    let outcome = relocator.relocate(
        &record_for(&steam, Platform::Steam),
        Platform::Rockstar,
        None,
        &CancelToken::new(),
    );

    assert!(outcome.is_success(), "{outcome:?}");
    assert!(!steam.exists());
    assert!(verify(&rockstar, &baseline).passed());
}

#[test]
fn discovery_finds_the_install_that_relocation_consumes() {
    let td = tempfile::tempdir().unwrap();
    let steam = td.path().join("steam");
    let rockstar = td.path().join("rockstar");
    fake_install(&steam);

    let d = discovery(&steam, &rockstar);
    let found = d.find_all();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].platform, Platform::Steam);
    assert_eq!(found[0].size_bytes, 256 + 1500);
}

#[test]
fn existing_target_directory_fails_preflight_without_mutation() {
    let td = tempfile::tempdir().unwrap();
    let steam = td.path().join("steam");
    let rockstar = td.path().join("rockstar");
    fake_install(&steam);
    fs::create_dir_all(&rockstar).unwrap();

    let baseline = snapshot(&steam);
    let relocator = Relocator::new(discovery(&steam, &rockstar));
    let outcome = relocator.relocate(
        &record_for(&steam, Platform::Steam),
        Platform::Rockstar,
        None,
        &CancelToken::new(),
    );

    match outcome {
        RelocationOutcome::Failed { error, rollback } => {
            assert!(matches!(error, GameMoveError::TargetExists(_)), "{error:?}");
            assert_eq!(rollback, RollbackStatus::NotNeeded);
        }
        other => panic!("expected preflight failure, got {other:?}"),
    }
    assert!(
        verify(&steam, &baseline).passed(),
        "preflight failure must not touch the source"
    );
}

#[test]
fn impossible_space_requirement_reports_the_shortfall() {
    let td = tempfile::tempdir().unwrap();
    let steam = td.path().join("steam");
    let rockstar = td.path().join("rockstar");
    fake_install(&steam);

    // No volume holds this much; preflight must fail with remediation data.
    let mut record = record_for(&steam, Platform::Steam);
    record.size_bytes = u64::MAX / 4;

    let relocator = Relocator::new(discovery(&steam, &rockstar));
    let outcome = relocator.relocate(&record, Platform::Rockstar, None, &CancelToken::new());

    match outcome {
        RelocationOutcome::Failed { error, rollback } => {
            assert_eq!(rollback, RollbackStatus::NotNeeded);
            match error {
                GameMoveError::InsufficientSpace {
                    required_with_margin,
                    shortfall,
                    ..
                } => {
                    assert!(required_with_margin > u64::MAX / 4);
                    assert!(shortfall > 0);
                }
                other => panic!("expected InsufficientSpace, got {other:?}"),
            }
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(steam.exists());
    assert!(!rockstar.exists());
}

#[test]
fn moving_to_the_current_platform_is_rejected() {
    let td = tempfile::tempdir().unwrap();
    let steam = td.path().join("steam");
    let rockstar = td.path().join("rockstar");
    fake_install(&steam);

    let relocator = Relocator::new(discovery(&steam, &rockstar));
    let outcome = relocator.relocate(
        &record_for(&steam, Platform::Steam),
        Platform::Steam,
        None,
        &CancelToken::new(),
    );
    match outcome {
        RelocationOutcome::Failed { error, .. } => {
            assert!(matches!(
                error,
                GameMoveError::AlreadyOnPlatform(Platform::Steam)
            ));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn unresolvable_target_platform_is_a_clean_failure() {
    let td = tempfile::tempdir().unwrap();
    let steam = td.path().join("steam");
    fake_install(&steam);

    // Epic has an empty table: no target path exists for it.
    let d = KnownPathsDiscovery::with_tables(vec![steam.clone()], vec![], vec![]).marker("game.bin");
    let relocator = Relocator::new(d);
    let outcome = relocator.relocate(
        &record_for(&steam, Platform::Steam),
        Platform::Epic,
        None,
        &CancelToken::new(),
    );
    match outcome {
        RelocationOutcome::Failed { error, rollback } => {
            assert!(matches!(error, GameMoveError::TargetUnresolvable(Platform::Epic)));
            assert_eq!(rollback, RollbackStatus::NotNeeded);
        }
        other => panic!("expected failure, got {other:?}"),
    }
}
