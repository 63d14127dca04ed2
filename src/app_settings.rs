//! Per-application autolaunch settings (`<config>/vrappconfig/*.vrappconfig`)

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::constants::openvr::APP_CONFIG_EXT;
use crate::error::{ExConfigError, Result};
use crate::names::resolve_app_name;
use crate::setting::VRSetting;
use crate::settings_file::{strip_bom, write_json};
use crate::steam_library::LibraryIndex;

/// Contents of one `.vrappconfig` file.
///
/// `autolaunch` is the only key we change. Everything else, including
/// `last_launch_time`, is written back as it was read.
#[derive(Debug, Clone, PartialEq)]
pub struct VRAppConfig {
    pub autolaunch: bool,
    pub last_launch_time: Value,
    raw: Map<String, Value>,
}

#[derive(Deserialize)]
struct AppConfigFields {
    #[serde(default)]
    autolaunch: bool,
    #[serde(default = "default_last_launch_time")]
    last_launch_time: Value,
}

fn default_last_launch_time() -> Value {
    Value::String("0".to_string())
}

impl Default for VRAppConfig {
    fn default() -> Self {
        Self {
            autolaunch: false,
            last_launch_time: default_last_launch_time(),
            raw: Map::new(),
        }
    }
}

impl VRAppConfig {
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        let raw: Map<String, Value> = serde_json::from_slice(strip_bom(bytes))?;
        let fields: AppConfigFields = serde_json::from_value(Value::Object(raw.clone()))?;
        Ok(Self {
            autolaunch: fields.autolaunch,
            last_launch_time: fields.last_launch_time,
            raw,
        })
    }

    /// Read a config file; any failure yields the defaults
    fn load_or_default(path: &Path) -> Self {
        let contents = match fs::read(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Couldn't read app config, using defaults");
                return Self::default();
            }
        };
        Self::from_slice(&contents).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Couldn't parse app config, using defaults");
            Self::default()
        })
    }

    /// Full document to write, in the file's original key order
    pub fn to_document(&self) -> Map<String, Value> {
        let mut document = self.raw.clone();
        document.insert("autolaunch".to_string(), Value::Bool(self.autolaunch));
        document.insert("last_launch_time".to_string(), self.last_launch_time.clone());
        document
    }
}

/// One application's autolaunch preference
#[derive(Debug, Clone)]
pub struct VRAppSetting {
    pub identifier: String,
    pub readable_name: String,
    pub config_path: PathBuf,
    pub config: VRAppConfig,
    dirty: bool,
}

impl VRAppSetting {
    pub fn new(identifier: String, readable_name: String, config_path: PathBuf, config: VRAppConfig) -> Self {
        Self {
            identifier,
            readable_name,
            config_path,
            config,
            dirty: false,
        }
    }

    /// Write the config back if it changed. The dirty flag survives a failed
    /// write so the save can be retried.
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        write_json(&self.config_path, &self.config.to_document())?;
        self.dirty = false;
        info!(path = %self.config_path.display(), autolaunch = self.config.autolaunch, "Updated app config");
        Ok(())
    }
}

impl VRSetting for VRAppSetting {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn readable_name(&self) -> &str {
        &self.readable_name
    }

    fn enabled(&self) -> bool {
        self.config.autolaunch
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.config.autolaunch = enabled;
        self.dirty = true;
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Enumerate `*.vrappconfig` files, name them and load their flags.
/// Order follows directory enumeration and is not stable across runs.
pub fn discover(app_config_dir: &Path, libraries: &LibraryIndex) -> Result<Vec<VRAppSetting>> {
    let entries = fs::read_dir(app_config_dir).map_err(|e| ExConfigError::io(app_config_dir, e))?;

    let mut settings = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(dir = %app_config_dir.display(), error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };

        if path.extension().and_then(|ext| ext.to_str()) != Some(APP_CONFIG_EXT) || path.is_dir() {
            continue;
        }
        let Some(identifier) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };

        let Some(name) = resolve_app_name(identifier, libraries) else {
            debug!(identifier = %identifier, "Hiding app");
            continue;
        };

        let config = VRAppConfig::load_or_default(&path);
        settings.push(VRAppSetting::new(identifier.to_string(), name, path.clone(), config));
    }

    info!(dir = %app_config_dir.display(), apps = settings.len(), "Discovered app settings");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steam_library::tests::write_libraries;
    use serde_json::json;

    fn find<'a>(settings: &'a [VRAppSetting], identifier: &str) -> Option<&'a VRAppSetting> {
        settings.iter().find(|s| s.identifier == identifier)
    }

    #[test]
    fn test_discover_names_filters_and_loads() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_libraries(dir.path(), &[("lib", &[("438100", Some("VRChat"))])]);
        let app_dir = config.join("vrappconfig");
        fs::create_dir_all(&app_dir).unwrap();

        fs::write(
            app_dir.join("steam.app.438100.vrappconfig"),
            r#"{ "autolaunch": true, "last_launch_time": "1700000000" }"#,
        )
        .unwrap();
        fs::write(app_dir.join("revive.app.xyz.vrappconfig"), r#"{ "autolaunch": true }"#).unwrap();
        fs::write(app_dir.join("steam.app.999.vrappconfig"), r#"{ "autolaunch": true }"#).unwrap();
        fs::write(app_dir.join("pushrax.SpaceCalibrator.vrappconfig"), "{}").unwrap();
        fs::write(app_dir.join("com.example.tool.vrappconfig"), "garbage").unwrap();
        fs::write(app_dir.join("notes.txt"), "ignored").unwrap();

        let settings = discover(&app_dir, &LibraryIndex::load(&config)).unwrap();
        assert_eq!(settings.len(), 3);

        let vrchat = find(&settings, "steam.app.438100").unwrap();
        assert_eq!(vrchat.readable_name, "VRChat");
        assert!(vrchat.enabled());
        assert_eq!(vrchat.config.last_launch_time, json!("1700000000"));
        assert!(!vrchat.is_dirty());

        let calibrator = find(&settings, "pushrax.SpaceCalibrator").unwrap();
        assert_eq!(calibrator.readable_name, "OpenVR Space Calibrator");
        assert!(!calibrator.enabled());
        assert_eq!(calibrator.config.last_launch_time, json!("0"));

        // Unparseable file falls back to defaults instead of aborting
        let broken = find(&settings, "com.example.tool").unwrap();
        assert_eq!(broken.config, VRAppConfig::default());

        assert!(find(&settings, "revive.app.xyz").is_none());
        assert!(find(&settings, "steam.app.999").is_none());
    }

    #[test]
    fn test_config_with_byte_order_mark_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(br#"{ "autolaunch": true, "last_launch_time": "1700000000" }"#);
        fs::write(dir.path().join("com.example.tool.vrappconfig"), bytes).unwrap();

        let settings = discover(dir.path(), &LibraryIndex::default()).unwrap();
        assert!(settings[0].enabled());
        assert_eq!(settings[0].config.last_launch_time, json!("1700000000"));
    }

    #[test]
    fn test_discover_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(&dir.path().join("vrappconfig"), &LibraryIndex::default()).is_err());
    }

    #[test]
    fn test_save_only_when_dirty_and_preserves_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("com.example.tool.vrappconfig");
        fs::write(&path, r#"{ "autolaunch": false, "last_launch_time": 1699999999, "launch_count": 3 }"#).unwrap();

        let mut settings = discover(dir.path(), &LibraryIndex::default()).unwrap();
        let setting = &mut settings[0];

        // Not dirty: file untouched
        setting.save().unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("1699999999, \"launch_count\""));

        setting.set_enabled(true);
        assert!(setting.is_dirty());
        setting.save().unwrap();
        assert!(!setting.is_dirty());

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            written,
            json!({ "autolaunch": true, "last_launch_time": 1699999999, "launch_count": 3 })
        );
    }

    #[test]
    fn test_failed_save_keeps_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone").join("x.vrappconfig");
        let mut setting = VRAppSetting::new("x".into(), "x".into(), path, VRAppConfig::default());

        setting.set_enabled(true);
        assert!(setting.save().is_err());
        assert!(setting.is_dirty());
    }

    #[test]
    fn test_matches_identifier_or_name() {
        let setting = VRAppSetting::new(
            "steam.app.438100".into(),
            "VRChat".into(),
            PathBuf::from("x"),
            VRAppConfig::default(),
        );
        assert!(setting.matches("vrchat"));
        assert!(setting.matches("steam.app.438100"));
        assert!(!setting.matches("beat saber"));
    }
}
