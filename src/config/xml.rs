//! XML configuration support.
//! - Loads settings from config.xml (quick_xml).
//! - Creates a secure template if missing (unless GAME_MOVE_CONFIG is set).
//!
//! Notes:
//! - This module only reads/writes the config file; path validation happens
//!   in discovery and preflight.
//! - Unknown XML fields cause a hard failure (panic) to surface
//!   misconfigurations early.

use anyhow::{Context, Result};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::paths::default_config_path;
use super::types::LogLevel;
use crate::platform::{set_dir_mode_0700, set_file_mode_0600, write_config_secure_new_0600};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    #[serde(rename = "steam_root")]
    steam_root: Option<String>,
    #[serde(rename = "rockstar_root")]
    rockstar_root: Option<String>,
    #[serde(rename = "epic_root")]
    epic_root: Option<String>,
    #[serde(rename = "log_level")]
    log_level: Option<String>,
    #[serde(rename = "log_file")]
    log_file: Option<String>,
    #[serde(rename = "preserve_mtimes")]
    preserve_mtimes: Option<bool>,
}

/// Settings actually found in the file, mapped to library types.
#[derive(Debug, Default)]
pub struct XmlSettings {
    pub steam_root: Option<PathBuf>,
    pub rockstar_root: Option<PathBuf>,
    pub epic_root: Option<PathBuf>,
    pub log_level: Option<LogLevel>,
    pub log_file: Option<PathBuf>,
    pub preserve_mtimes: Option<bool>,
}

fn trimmed_path(value: Option<&str>) -> Option<PathBuf> {
    let s = value?.trim();
    if s.is_empty() { None } else { Some(PathBuf::from(s)) }
}

/// Read config from XML. OS-aware default path used if GAME_MOVE_CONFIG not set.
/// Returns None if the file is missing, unreadable or holds nothing useful.
pub fn load_config_from_xml() -> Option<XmlSettings> {
    let env_set = env::var_os("GAME_MOVE_CONFIG").is_some();
    let cfg_path = default_config_path().ok()?;

    // If missing: create a template (only when using the default path), then
    // return None.
    if !cfg_path.exists() {
        if !env_set {
            let _ = create_template_config(&cfg_path);
        }
        return None;
    }

    let content = fs::read_to_string(&cfg_path).ok()?;
    let parsed: XmlConfig = match from_xml_str(&content) {
        Ok(x) => x,
        Err(e) => {
            // Fail hard on unknown field (serde deny_unknown_fields); else, log and return None.
            let msg = e.to_string();
            if msg.contains("unknown field") {
                panic!(
                    "Unknown field in game_move config {}: {}. Refusing to start.",
                    cfg_path.display(),
                    msg
                );
            }
            debug!(
                "Failed to parse config.xml at {}: {}",
                cfg_path.display(),
                msg
            );
            return None;
        }
    };

    let settings = XmlSettings {
        steam_root: trimmed_path(parsed.steam_root.as_deref()),
        rockstar_root: trimmed_path(parsed.rockstar_root.as_deref()),
        epic_root: trimmed_path(parsed.epic_root.as_deref()),
        log_level: parsed.log_level.as_deref().and_then(LogLevel::parse),
        log_file: trimmed_path(parsed.log_file.as_deref()),
        preserve_mtimes: parsed.preserve_mtimes,
    };

    debug!(path = %cfg_path.display(), ?settings, "loaded config");
    Some(settings)
}

/// Create parent directory and write a small secure template config file.
///
/// On Unix this sets conservative permissions (dir 0o700, file 0o600);
/// elsewhere the mode helpers are no-ops.
pub fn create_template_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create config directory '{}'", parent.display()))?;
        // Best-effort: ignore permission-setting errors so creation still
        // succeeds on weird filesystems.
        let _ = set_dir_mode_0700(parent);
    }

    let content = "<config>\n  \
        <!-- Optional per-platform install roots; the first table entry is the move target. -->\n  \
        <!-- <steam_root>D:\\Steam\\steamapps\\common\\Grand Theft Auto V</steam_root> -->\n  \
        <log_level>normal</log_level>\n\
        </config>\n";

    write_config_secure_new_0600(path, content)
        .with_context(|| format!("write template config '{}'", path.display()))?;
    let _ = set_file_mode_0600(path);
    Ok(())
}

/// Outcome of ensuring a config file exists.
#[derive(Debug, PartialEq, Eq)]
pub enum LoadResult {
    /// No file existed; a fresh template was written at this path.
    CreatedTemplate(PathBuf),
    /// A config file was already present.
    Existing(PathBuf),
}

/// Ensure a config file exists at the resolved location.
/// With GAME_MOVE_CONFIG pointing at a missing file this is an error, not a
/// template write: an explicit path should never be silently invented.
pub fn load_or_init() -> Result<LoadResult> {
    let cfg_path = default_config_path()?;
    if cfg_path.exists() {
        return Ok(LoadResult::Existing(cfg_path));
    }
    if env::var_os("GAME_MOVE_CONFIG").is_some() {
        anyhow::bail!(
            "GAME_MOVE_CONFIG points to '{}', which does not exist",
            cfg_path.display()
        );
    }
    create_template_config(&cfg_path)?;
    Ok(LoadResult::CreatedTemplate(cfg_path))
}
