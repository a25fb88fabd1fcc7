//! Default on-disk locations.
//!
//! Everything lives under one per-user directory named after the binary:
//! `settings.toml` next to a `context/` registry tree whose
//! `projects/`, `people/` and `terms/` subdirectories hold one entity file
//! each.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
    /// Root handed to `DirectorySource` when no registry is configured.
    pub registry_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "sounds-like-correct";

    /// Paths under the platform config dir (`dirs::config_dir`), or under
    /// the working directory when the platform has none.
    pub fn new() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::rooted_at(base.join(Self::APP_NAME))
    }

    /// Paths laid out under an explicit `config_dir`.
    pub fn rooted_at(config_dir: PathBuf) -> Self {
        Self {
            settings_file: config_dir.join("settings.toml"),
            registry_dir: config_dir.join("context"),
            config_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_named_after_the_binary() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.ends_with("sounds-like-correct"));
        assert_eq!(paths, AppPaths::rooted_at(paths.config_dir.clone()));
    }

    #[test]
    fn rooted_layout() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = AppPaths::rooted_at(dir.path().to_path_buf());
        assert_eq!(paths.settings_file, dir.path().join("settings.toml"));
        assert_eq!(paths.registry_dir, dir.path().join("context"));
        assert_eq!(paths.config_dir, dir.path());
    }
}
