//! Destination free-space check.
//! Filesystems need headroom beyond the raw payload (allocation granularity,
//! journals, copy-before-delete overlap), so the guard demands a 10% margin
//! on top of the requirement and reports the shortfall when it fails.

use std::io;
use std::path::{Path, PathBuf};

/// Result of a free-space check against a destination volume.
#[derive(Debug, Clone)]
pub struct SpaceCheck {
    pub has_space: bool,
    pub available_bytes: u64,
    pub required_with_margin: u64,
}

impl SpaceCheck {
    /// Bytes missing when the check failed; zero otherwise.
    pub fn shortfall(&self) -> u64 {
        self.required_with_margin.saturating_sub(self.available_bytes)
    }
}

/// Raw requirement plus the 10% safety margin.
pub fn required_with_margin(required_bytes: u64) -> u64 {
    required_bytes.saturating_add(required_bytes / 10)
}

fn evaluate(available_bytes: u64, required_bytes: u64) -> SpaceCheck {
    let required_with_margin = required_with_margin(required_bytes);
    SpaceCheck {
        has_space: available_bytes >= required_with_margin,
        available_bytes,
        required_with_margin,
    }
}

/// Check whether the volume holding `target` can absorb `required_bytes`
/// plus margin. `target` itself may not exist yet; the nearest existing
/// ancestor is queried instead.
pub fn check_space(target: &Path, required_bytes: u64) -> io::Result<SpaceCheck> {
    let probe = nearest_existing_ancestor(target);
    let available = fs2::available_space(&probe)?;
    Ok(evaluate(available, required_bytes))
}

fn nearest_existing_ancestor(path: &Path) -> PathBuf {
    let mut current = path;
    loop {
        if current.exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => current = parent,
            _ => return PathBuf::from("."),
        }
    }
}

/// Render a byte count for humans (binary units).
pub fn format_bytes(n: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let f = n as f64;
    if f >= GB {
        format!("{:.1} GiB", f / GB)
    } else if f >= MB {
        format!("{:.1} MiB", f / MB)
    } else if f >= KB {
        format!("{:.1} KiB", f / KB)
    } else {
        format!("{} B", n)
    }
}
