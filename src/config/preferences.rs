//! The tool's own preference file
//!
//! A small flat JSON record under the user config dir. Keys we don't know are
//! kept so an older build doesn't strip what a newer one wrote.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{ExConfigError, Result};
use crate::openvr_paths;
use crate::settings_file::write_json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Cached location of `openvrpaths.vrpath`
    #[serde(rename = "openvrpath", default, skip_serializing_if = "Option::is_none")]
    pub openvr_registry_path: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            openvr_registry_path: None,
            log_level: default_log_level(),
            extra: Map::new(),
        }
    }
}

impl Preferences {
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Missing or unreadable preferences fall back to defaults
    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No preference file yet, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Couldn't read preference file, using defaults");
                return Self::default();
            }
        };

        serde_json::from_slice(&contents).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Couldn't parse preference file, using defaults");
            Self::default()
        })
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ExConfigError::io(parent, e))?;
        }
        write_json(path, self)?;
        info!(path = %path.display(), "Saved preferences");
        Ok(())
    }

    /// Registry location, detected and remembered on first use
    pub fn registry_path(&mut self) -> Result<PathBuf> {
        if let Some(path) = &self.openvr_registry_path {
            return Ok(path.clone());
        }

        let path = openvr_paths::find_registry_file()?;
        info!(path = %path.display(), "Detected OpenVR registry location");
        self.openvr_registry_path = Some(path.clone());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Preferences::load_from(&dir.path().join("config.json"));
        assert_eq!(prefs, Preferences::default());
        assert_eq!(prefs.log_level, "info");
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ nope").unwrap();
        assert_eq!(Preferences::load_from(&path), Preferences::default());
    }

    #[test]
    fn test_save_and_load_keeps_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{ "openvrpath": "/home/u/.config/openvr/openvrpaths.vrpath", "darkmode": true }"#).unwrap();

        let mut prefs = Preferences::load_from(&path);
        assert_eq!(
            prefs.openvr_registry_path.as_deref(),
            Some(Path::new("/home/u/.config/openvr/openvrpaths.vrpath"))
        );
        prefs.log_level = "debug".to_string();
        prefs.save_to(&path).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            written,
            json!({
                "openvrpath": "/home/u/.config/openvr/openvrpaths.vrpath",
                "log_level": "debug",
                "darkmode": true
            })
        );
    }

    #[test]
    fn test_cached_registry_path_is_used() {
        let mut prefs = Preferences {
            openvr_registry_path: Some(PathBuf::from("/custom/openvrpaths.vrpath")),
            ..Preferences::default()
        };
        assert_eq!(prefs.registry_path().unwrap(), PathBuf::from("/custom/openvrpaths.vrpath"));
    }

    #[test]
    fn test_registry_path_is_remembered() {
        let mut prefs = Preferences::default();
        if let Ok(path) = prefs.registry_path() {
            assert_eq!(prefs.openvr_registry_path, Some(path));
        }
    }
}
