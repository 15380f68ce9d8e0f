//! Running-process guard.
//! Mutating files under a running game or launcher risks corruption and
//! file-lock failures, so preflight refuses to proceed while any guarded
//! process is alive. Matching is case-insensitive and tolerant of a missing
//! `.exe` suffix so the same guard list works on every OS.

use sysinfo::System;
use tracing::debug;

/// Case-insensitive name with any trailing `.exe` stripped.
fn normalized(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    lower
        .strip_suffix(".exe")
        .map(str::to_owned)
        .unwrap_or(lower)
}

/// Return the name of the first guarded process found running, if any.
pub fn find_running(names: &[String]) -> Option<String> {
    if names.is_empty() {
        return None;
    }
    let wanted: Vec<String> = names.iter().map(|n| normalized(n)).collect();

    let sys = System::new_all();
    for process in sys.processes().values() {
        let name = process.name().to_string_lossy().into_owned();
        if wanted.iter().any(|w| *w == normalized(&name)) {
            debug!(process = %name, "guarded process is running");
            return Some(name);
        }
    }
    None
}
