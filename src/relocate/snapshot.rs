//! Tree snapshot and verification.
//! A snapshot is the expected-state baseline captured immediately before a
//! transfer: every regular file under the root, recorded as a normalized
//! relative path plus its byte length. Verification replays the baseline
//! against another root and reports what is missing or resized.
//!
//! Verification is deliberately size-only, with no content hash. On a
//! multi-gigabyte tree a hash pass roughly doubles the I/O, so this trades
//! cryptographic certainty for speed; silent bit-level corruption that keeps
//! the file length intact will not be caught.

use std::fs;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

/// One file in a snapshot. `relative_path` uses `/` separators regardless of OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub relative_path: String,
    pub size_bytes: u64,
}

/// Baseline of a directory tree, keyed by relative path.
/// Owned by the relocation attempt that created it and discarded afterwards.
#[derive(Debug, Clone, Default)]
pub struct TreeSnapshot {
    entries: Vec<SnapshotEntry>,
}

impl TreeSnapshot {
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all recorded file sizes.
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size_bytes).sum()
    }
}

/// Walk the full tree under `root` and record every regular file.
///
/// Pure read, no side effects. Files that are unreadable or vanish mid-walk
/// are skipped rather than failing the snapshot: game directories routinely
/// hold transient lock files.
pub fn snapshot(root: &Path) -> TreeSnapshot {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let meta = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                debug!(path = %entry.path().display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        entries.push(SnapshotEntry {
            relative_path: normalize(rel),
            size_bytes: meta.len(),
        });
    }
    debug!(root = %root.display(), files = entries.len(), "snapshot taken");
    TreeSnapshot { entries }
}

/// Join path components with `/` so snapshots compare identically across OSes.
fn normalize(rel: &Path) -> String {
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}

/// Outcome of checking a tree against a baseline snapshot.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    /// Relative paths from the baseline that do not exist as files.
    pub missing: Vec<String>,
    /// (relative path, expected size, actual size) for files whose length changed.
    pub size_mismatches: Vec<(String, u64, u64)>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.missing.is_empty() && self.size_mismatches.is_empty()
    }
}

/// Check every baseline entry for existence and exact size under `root`.
/// Extra files at the destination are not a failure; additions are fine.
pub fn verify(root: &Path, baseline: &TreeSnapshot) -> VerificationReport {
    let mut report = VerificationReport::default();
    for entry in baseline.entries() {
        let path = root.join(&entry.relative_path);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {
                if meta.len() != entry.size_bytes {
                    report.size_mismatches.push((
                        entry.relative_path.clone(),
                        entry.size_bytes,
                        meta.len(),
                    ));
                }
            }
            _ => report.missing.push(entry.relative_path.clone()),
        }
    }
    report
}
