//! Windows implementations of the platform helpers.
//! NTFS ACLs do not map onto Unix modes, so the permission setters are
//! no-ops; per-user profile directories already restrict access.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

pub fn set_dir_mode_0700(_path: &Path) -> io::Result<()> {
    Ok(())
}

pub fn set_file_mode_0600(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Write a new config file; refuses to clobber an existing file.
pub fn write_config_secure_new_0600(path: &Path, content: &str) -> io::Result<()> {
    let mut f = OpenOptions::new().write(true).create_new(true).open(path)?;
    f.write_all(content.as_bytes())?;
    f.sync_all()
}

/// Open (creating if needed) a log file for append.
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
