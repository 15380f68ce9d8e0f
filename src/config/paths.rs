//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log paths and detects symlinked ancestors
//! for safety.

use anyhow::{Result, anyhow};
use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "game_move";
const CONFIG_FILE: &str = "config.xml";

/// Config file location: GAME_MOVE_CONFIG if set, else the OS config dir.
/// An env value naming a directory gets the default file name appended.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(v) = env::var_os("GAME_MOVE_CONFIG") {
        let p = PathBuf::from(v);
        if p.is_dir() {
            return Ok(p.join(CONFIG_FILE));
        }
        return Ok(p);
    }

    if let Some(mut base) = config_dir() {
        base.push(APP_DIR);
        base.push(CONFIG_FILE);
        return Ok(base);
    }
    env::var("HOME")
        .map(|h| {
            PathBuf::from(h)
                .join(".config")
                .join(APP_DIR)
                .join(CONFIG_FILE)
        })
        .map_err(|_| anyhow!("cannot determine a config directory (no HOME)"))
}

/// OS-appropriate default log file path (data dir).
pub fn default_log_path() -> Result<PathBuf> {
    if let Some(mut base) = data_dir() {
        base.push(APP_DIR);
        // ensure dir exists (best-effort)
        let _ = fs::create_dir_all(&base);
        base.push("game_move.log");
        return Ok(base);
    }
    env::var("HOME")
        .map(|h| {
            PathBuf::from(h)
                .join(".local")
                .join("share")
                .join(APP_DIR)
                .join("game_move.log")
        })
        .map_err(|_| anyhow!("cannot determine a data directory (no HOME)"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}
