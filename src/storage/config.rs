use std::path::Path;

use crate::models::settings::AppSettings;

/// Reads settings from `path`. A missing file gives defaults; a file that does
/// not parse is reported and also gives defaults.
pub fn load_settings(path: &Path) -> AppSettings {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no settings at {}, using defaults", path.display());
            return AppSettings::default();
        }
        Err(e) => {
            tracing::warn!("could not read {}: {}, using defaults", path.display(), e);
            return AppSettings::default();
        }
    };

    match serde_json::from_str::<AppSettings>(&data) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("malformed settings in {}: {}, using defaults", path.display(), e);
            AppSettings::default()
        }
    }
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)?;
    Ok(())
}
