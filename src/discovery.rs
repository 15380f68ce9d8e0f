//! Installation discovery.
//! Finds on-disk installations by probing known per-platform path tables and
//! validating each candidate (directory exists and contains the game
//! executable). The relocation core consumes discovery through the
//! `Discovery` trait so alternative strategies (registry probing, launcher
//! manifests) can be plugged in without touching the move logic.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rayon::prelude::*;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::Config;

/// File that must be present at a candidate root for it to count as a real install.
pub const GAME_EXECUTABLE: &str = "GTA5.exe";

/// Distribution platform an installation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Steam,
    Rockstar,
    Epic,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Steam, Platform::Rockstar, Platform::Epic];

    /// Human-facing name, matching what the launcher vendors call themselves.
    pub fn label(self) -> &'static str {
        match self {
            Platform::Steam => "Steam",
            Platform::Rockstar => "Rockstar Games",
            Platform::Epic => "Epic Games",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "steam" => Ok(Platform::Steam),
            "rockstar" | "rockstar-games" | "social-club" => Ok(Platform::Rockstar),
            "epic" | "epic-games" => Ok(Platform::Epic),
            _ => Err(format!(
                "unknown platform '{s}' (expected steam, rockstar or epic)"
            )),
        }
    }
}

/// One located installation. Read-only input to the relocation core.
#[derive(Debug, Clone)]
pub struct InstallationRecord {
    pub path: PathBuf,
    pub platform: Platform,
    pub size_bytes: u64,
}

/// Pluggable discovery capability consumed by the orchestrator.
pub trait Discovery {
    /// All valid installations currently present on disk.
    fn find_all(&self) -> Vec<InstallationRecord>;

    /// Whether the launcher/runtime for `platform` is installed at all.
    /// Moving a game to a platform with no launcher would strand it.
    fn launcher_installed(&self, platform: Platform) -> bool;

    /// Preferred install root for `platform`; the relocation target.
    fn install_root(&self, platform: Platform) -> Option<PathBuf>;

    /// Process names that must not be running while files are moved.
    fn guarded_processes(&self) -> Vec<String>;
}

/// Discovery over fixed candidate path tables.
///
/// The default tables mirror the stock install locations of the three
/// launchers on common drive layouts. `Config` may prepend per-platform
/// overrides, which also become the preferred relocation target.
pub struct KnownPathsDiscovery {
    steam_roots: Vec<PathBuf>,
    rockstar_roots: Vec<PathBuf>,
    epic_roots: Vec<PathBuf>,
    launcher_probes: Vec<(Platform, PathBuf)>,
    guarded: Vec<String>,
    marker: String,
}

impl Default for KnownPathsDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl KnownPathsDiscovery {
    pub fn new() -> Self {
        let steam_roots = vec![
            PathBuf::from(r"C:\Program Files (x86)\Steam\steamapps\common\Grand Theft Auto V"),
            PathBuf::from(r"D:\Steam\steamapps\common\Grand Theft Auto V"),
            PathBuf::from(r"E:\Steam\steamapps\common\Grand Theft Auto V"),
        ];
        let rockstar_roots = vec![
            PathBuf::from(r"C:\Program Files\Rockstar Games\Grand Theft Auto V"),
            PathBuf::from(r"C:\Program Files (x86)\Rockstar Games\Grand Theft Auto V"),
            PathBuf::from(r"D:\Rockstar Games\Grand Theft Auto V"),
        ];
        let epic_roots = vec![
            PathBuf::from(r"C:\Program Files\Epic Games\GTAV"),
            PathBuf::from(r"C:\Program Files (x86)\Epic Games\GTAV"),
            PathBuf::from(r"D:\Epic Games\GTAV"),
        ];
        let launcher_probes = vec![
            (
                Platform::Steam,
                PathBuf::from(r"C:\Program Files (x86)\Steam\steam.exe"),
            ),
            (
                Platform::Rockstar,
                PathBuf::from(r"C:\Program Files\Rockstar Games\Launcher\Launcher.exe"),
            ),
            (
                Platform::Epic,
                PathBuf::from(
                    r"C:\Program Files (x86)\Epic Games\Launcher\Portal\Binaries\Win64\EpicGamesLauncher.exe",
                ),
            ),
        ];
        let guarded = [
            "GTA5.exe",
            "PlayGTAV.exe",
            "GTAVLauncher.exe",
            "steam.exe",
            "Launcher.exe",
            "SocialClubHelper.exe",
            "EpicGamesLauncher.exe",
        ]
        .into_iter()
        .map(str::to_owned)
        .collect();

        Self {
            steam_roots,
            rockstar_roots,
            epic_roots,
            launcher_probes,
            guarded,
            marker: GAME_EXECUTABLE.to_owned(),
        }
    }

    /// Default tables with per-platform overrides from the config prepended.
    /// An override becomes the preferred target for its platform.
    pub fn from_config(cfg: &Config) -> Self {
        let mut d = Self::new();
        if let Some(p) = &cfg.steam_root {
            d.steam_roots.insert(0, p.clone());
        }
        if let Some(p) = &cfg.rockstar_root {
            d.rockstar_roots.insert(0, p.clone());
        }
        if let Some(p) = &cfg.epic_root {
            d.epic_roots.insert(0, p.clone());
        }
        d
    }

    /// Replace the path tables entirely. Launcher probes and the guarded
    /// process list start empty; a platform without a probe is assumed
    /// present (there is nothing to disprove it with).
    pub fn with_tables(
        steam_roots: Vec<PathBuf>,
        rockstar_roots: Vec<PathBuf>,
        epic_roots: Vec<PathBuf>,
    ) -> Self {
        Self {
            steam_roots,
            rockstar_roots,
            epic_roots,
            launcher_probes: Vec::new(),
            guarded: Vec::new(),
            marker: GAME_EXECUTABLE.to_owned(),
        }
    }

    /// Override the validity marker file name (defaults to the game executable).
    pub fn marker(mut self, name: &str) -> Self {
        self.marker = name.to_owned();
        self
    }

    /// Add a launcher presence probe for `platform`.
    pub fn launcher_probe(mut self, platform: Platform, path: impl Into<PathBuf>) -> Self {
        self.launcher_probes.push((platform, path.into()));
        self
    }

    /// Replace the guarded process list.
    pub fn guarded(mut self, names: Vec<String>) -> Self {
        self.guarded = names;
        self
    }

    fn roots(&self, platform: Platform) -> &[PathBuf] {
        match platform {
            Platform::Steam => &self.steam_roots,
            Platform::Rockstar => &self.rockstar_roots,
            Platform::Epic => &self.epic_roots,
        }
    }

    fn is_valid_install(&self, path: &Path) -> bool {
        path.is_dir() && path.join(&self.marker).is_file()
    }
}

impl Discovery for KnownPathsDiscovery {
    fn find_all(&self) -> Vec<InstallationRecord> {
        let mut seen = Vec::new();
        let mut found = Vec::new();
        for platform in Platform::ALL {
            for root in self.roots(platform) {
                if !self.is_valid_install(root) {
                    continue;
                }
                // Config overrides may repeat a default entry; dedupe on the
                // resolved path so one install is reported once.
                let real = dunce::canonicalize(root).unwrap_or_else(|_| root.clone());
                if seen.contains(&real) {
                    continue;
                }
                seen.push(real);
                let size_bytes = tree_size(root);
                debug!(platform = %platform, path = %root.display(), size_bytes, "found installation");
                found.push(InstallationRecord {
                    path: root.clone(),
                    platform,
                    size_bytes,
                });
            }
        }
        found
    }

    fn launcher_installed(&self, platform: Platform) -> bool {
        let mut probed = false;
        for (p, path) in &self.launcher_probes {
            if *p != platform {
                continue;
            }
            probed = true;
            if path.exists() {
                return true;
            }
        }
        !probed
    }

    fn install_root(&self, platform: Platform) -> Option<PathBuf> {
        self.roots(platform).first().cloned()
    }

    fn guarded_processes(&self) -> Vec<String> {
        self.guarded.clone()
    }
}

/// Total size in bytes of all regular files under `root`.
/// Entries that vanish or become unreadable mid-walk are skipped.
pub fn tree_size(root: &Path) -> u64 {
    let files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();

    files
        .par_iter()
        .filter_map(|p| fs::metadata(p).ok())
        .map(|m| m.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn fake_install(root: &Path, marker: &str, payload_bytes: usize) {
        fs::create_dir_all(root.join("update")).unwrap();
        fs::write(root.join(marker), vec![0u8; 64]).unwrap();
        fs::write(root.join("update").join("data.rpf"), vec![1u8; payload_bytes]).unwrap();
    }

    #[test]
    fn finds_valid_installs_and_sizes_them() {
        let td = tempdir().unwrap();
        let steam = td.path().join("steam").join("gtav");
        let epic = td.path().join("epic").join("gtav");
        fake_install(&steam, "game.bin", 1000);
        // Epic candidate exists but has no marker, so it must be ignored.
        fs::create_dir_all(&epic).unwrap();

        let d = KnownPathsDiscovery::with_tables(vec![steam.clone()], vec![], vec![epic])
            .marker("game.bin");
        let found = d.find_all();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].platform, Platform::Steam);
        assert_eq!(found[0].path, steam);
        assert_eq!(found[0].size_bytes, 64 + 1000);
    }

    #[test]
    fn install_root_prefers_first_table_entry() {
        let d = KnownPathsDiscovery::with_tables(
            vec![PathBuf::from("/a"), PathBuf::from("/b")],
            vec![],
            vec![],
        );
        assert_eq!(d.install_root(Platform::Steam), Some(PathBuf::from("/a")));
        assert_eq!(d.install_root(Platform::Rockstar), None);
    }

    #[test]
    fn launcher_probe_controls_presence() {
        let td = tempdir().unwrap();
        let present = td.path().join("steam.exe");
        fs::write(&present, b"x").unwrap();

        let d = KnownPathsDiscovery::with_tables(vec![], vec![], vec![])
            .launcher_probe(Platform::Steam, &present)
            .launcher_probe(Platform::Epic, td.path().join("missing.exe"));

        assert!(d.launcher_installed(Platform::Steam));
        assert!(!d.launcher_installed(Platform::Epic));
        // No probe configured for Rockstar, so it is assumed present.
        assert!(d.launcher_installed(Platform::Rockstar));
    }

    #[test]
    fn platform_parses_case_insensitively() {
        assert_eq!("Steam".parse::<Platform>().unwrap(), Platform::Steam);
        assert_eq!("EPIC".parse::<Platform>().unwrap(), Platform::Epic);
        assert_eq!("rockstar".parse::<Platform>().unwrap(), Platform::Rockstar);
        assert!("origin".parse::<Platform>().is_err());
    }
}
