use std::path::PathBuf;

pub trait AppPaths: Send + Sync {
    fn data_dir(&self) -> PathBuf;
    fn bin_dir(&self) -> Option<PathBuf>;

    fn settings_file(&self) -> PathBuf {
        self.data_dir().join("settings.json")
    }
}

/// Per-user locations on a desktop or server install.
#[cfg(feature = "desktop")]
pub struct DesktopPaths;

#[cfg(feature = "desktop")]
impl AppPaths for DesktopPaths {
    fn data_dir(&self) -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("reelgrab"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn bin_dir(&self) -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("reelgrab").join("bin"))
    }
}

#[cfg(all(test, feature = "desktop"))]
mod tests {
    use super::*;

    #[test]
    fn settings_file_lives_in_data_dir() {
        let paths = DesktopPaths;
        assert_eq!(paths.settings_file(), paths.data_dir().join("settings.json"));
    }
}
