use std::path::PathBuf;

use reelgrab_core::fs_paths::{AppPaths, DesktopPaths};

/// `$REELGRAB_DATA_DIR/settings.json` when set, else the per-user default.
pub fn default_settings_path() -> PathBuf {
    match std::env::var("REELGRAB_DATA_DIR") {
        Ok(dir) => PathBuf::from(dir).join("settings.json"),
        Err(_) => DesktopPaths.settings_file(),
    }
}
