use fs2::FileExt;
use std::fs::File;
use std::path::{Path, PathBuf};

const LOCK_NAME: &str = "nmprio-daemon.lock";

pub fn default_lock_path() -> PathBuf {
    let mut path = dirs::runtime_dir().unwrap_or_else(std::env::temp_dir);
    path.push(LOCK_NAME);
    path
}

/// Takes the single-instance lock; held until the returned file is dropped.
pub fn acquire_daemon_lock(path: &Path) -> Result<File, String> {
    let file = File::create(path)
        .map_err(|e| format!("Failed to create lock file {}: {e}", path.display()))?;

    // Exclusive lock; fails if another daemon holds it
    file.try_lock_exclusive()
        .map_err(|_| format!("Another nmprio-daemon is already running ({})", path.display()))?;

    Ok(file)
}
