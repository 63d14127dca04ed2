//! Resolve the SteamVR runtime layout from the OpenVR registry file
//!
//! `openvrpaths.vrpath` lists config roots, runtime roots and externally
//! registered driver directories. Only the first config and runtime root are
//! honoured; multi-root registries are not disambiguated.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Preferences;
use crate::constants::openvr::{APP_CONFIG_DIR, DRIVERS_DIR, REGISTRY_FILE, SETTINGS_FILE};
use crate::error::{ExConfigError, Result};
use crate::settings_file::strip_bom;

/// Resolved filesystem layout of the VR runtime, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    config_dir: PathBuf,
    runtime_dir: PathBuf,
    app_config_dir: PathBuf,
    external_drivers: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    config: Vec<PathBuf>,
    runtime: Vec<PathBuf>,
    #[serde(default)]
    external_drivers: Option<Vec<PathBuf>>,
}

/// Platform base directory the registry lives under
fn registry_base_dir() -> Option<PathBuf> {
    if cfg!(windows) {
        dirs::data_local_dir()
    } else if cfg!(target_os = "linux") {
        dirs::config_dir()
    } else {
        None
    }
}

/// Default location of the registry file on this platform
pub fn find_registry_file() -> Result<PathBuf> {
    let base = registry_base_dir().ok_or(ExConfigError::UnsupportedPlatform)?;
    Ok(base.join(REGISTRY_FILE))
}

impl RuntimePaths {
    /// Read the registry remembered in the preferences, detecting its
    /// platform location first if none is cached yet
    pub fn resolve(prefs: &mut Preferences) -> Result<Self> {
        let registry = prefs.registry_path()?;
        Self::from_registry_file(&registry)
    }

    pub fn from_registry_file(path: &Path) -> Result<Self> {
        let contents = fs::read(path).map_err(|source| ExConfigError::RegistryNotFound {
            path: path.to_path_buf(),
            source,
        })?;

        let malformed = |reason: String| ExConfigError::RegistryMalformed {
            path: path.to_path_buf(),
            reason,
        };

        let registry: RegistryFile = serde_json::from_slice(strip_bom(&contents)).map_err(|e| malformed(e.to_string()))?;

        if registry.config.len() > 1 || registry.runtime.len() > 1 {
            warn!(
                config_roots = registry.config.len(),
                runtime_roots = registry.runtime.len(),
                "Registry lists several roots, only the first of each is used"
            );
        }

        let config_dir = registry
            .config
            .into_iter()
            .next()
            .ok_or_else(|| malformed("'config' list is empty".to_string()))?;
        let runtime_dir = registry
            .runtime
            .into_iter()
            .next()
            .ok_or_else(|| malformed("'runtime' list is empty".to_string()))?;

        let paths = Self::new(config_dir, runtime_dir, registry.external_drivers.unwrap_or_default());
        info!(
            registry = %path.display(),
            config = %paths.config_dir.display(),
            runtime = %paths.runtime_dir.display(),
            external_drivers = paths.external_drivers.len(),
            "Resolved OpenVR paths"
        );
        Ok(paths)
    }

    pub fn new(config_dir: PathBuf, runtime_dir: PathBuf, external_drivers: Vec<PathBuf>) -> Self {
        let app_config_dir = config_dir.join(APP_CONFIG_DIR);
        Self {
            config_dir,
            runtime_dir,
            app_config_dir,
            external_drivers,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn runtime_dir(&self) -> &Path {
        &self.runtime_dir
    }

    pub fn app_config_dir(&self) -> &Path {
        &self.app_config_dir
    }

    pub fn external_drivers(&self) -> &[PathBuf] {
        &self.external_drivers
    }

    /// Shared runtime settings file (`steamvr.vrsettings`)
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    /// Bundled driver directories (sorted by name) followed by the externally
    /// registered ones in registry order. An unreadable bundled driver
    /// directory only loses the bundled part.
    pub fn driver_dirs(&self) -> Vec<PathBuf> {
        let bundled_root = self.runtime_dir.join(DRIVERS_DIR);
        let mut bundled: Vec<PathBuf> = match fs::read_dir(&bundled_root) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .collect(),
            Err(e) => {
                warn!(path = %bundled_root.display(), error = %e, "Couldn't list bundled drivers");
                Vec::new()
            }
        };
        bundled.sort();
        debug!(bundled = bundled.len(), external = self.external_drivers.len(), "Collected driver directories");

        bundled.extend(self.external_drivers.iter().cloned());
        bundled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_registry(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("openvrpaths.vrpath");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_from_registry_file_uses_first_roots() {
        let dir = tempfile::tempdir().unwrap();
        let registry = write_registry(
            dir.path(),
            r#"{
                "config": ["/steam/config", "/other/config"],
                "external_drivers": ["/drivers/slimevr"],
                "jsonid": "vrpathreg",
                "log": ["/steam/logs"],
                "runtime": ["/steam/steamapps/common/SteamVR"],
                "version": 1
            }"#,
        );

        let paths = RuntimePaths::from_registry_file(&registry).unwrap();
        assert_eq!(paths.config_dir(), Path::new("/steam/config"));
        assert_eq!(paths.runtime_dir(), Path::new("/steam/steamapps/common/SteamVR"));
        assert_eq!(paths.app_config_dir(), Path::new("/steam/config/vrappconfig"));
        assert_eq!(paths.external_drivers(), &[PathBuf::from("/drivers/slimevr")]);
        assert_eq!(paths.settings_file(), PathBuf::from("/steam/config/steamvr.vrsettings"));
    }

    #[test]
    fn test_external_drivers_null_or_missing() {
        let dir = tempfile::tempdir().unwrap();
        let registry = write_registry(dir.path(), r#"{ "config": ["/c"], "runtime": ["/r"], "external_drivers": null }"#);
        assert!(RuntimePaths::from_registry_file(&registry).unwrap().external_drivers().is_empty());

        let registry = write_registry(dir.path(), r#"{ "config": ["/c"], "runtime": ["/r"] }"#);
        assert!(RuntimePaths::from_registry_file(&registry).unwrap().external_drivers().is_empty());
    }

    #[test]
    fn test_registry_with_byte_order_mark() {
        let dir = tempfile::tempdir().unwrap();
        let registry = write_registry(dir.path(), "\u{FEFF}{ \"config\": [\"/c\"], \"runtime\": [\"/r\"] }");
        assert_eq!(RuntimePaths::from_registry_file(&registry).unwrap().config_dir(), Path::new("/c"));
    }

    #[test]
    fn test_missing_registry() {
        let dir = tempfile::tempdir().unwrap();
        let err = RuntimePaths::from_registry_file(&dir.path().join("missing.vrpath")).unwrap_err();
        assert!(matches!(err, ExConfigError::RegistryNotFound { .. }));
    }

    #[test]
    fn test_malformed_registry() {
        let dir = tempfile::tempdir().unwrap();

        let registry = write_registry(dir.path(), "not json");
        assert!(matches!(
            RuntimePaths::from_registry_file(&registry),
            Err(ExConfigError::RegistryMalformed { .. })
        ));

        let registry = write_registry(dir.path(), r#"{ "config": [], "runtime": ["/r"] }"#);
        match RuntimePaths::from_registry_file(&registry) {
            Err(ExConfigError::RegistryMalformed { reason, .. }) => assert!(reason.contains("config")),
            other => panic!("expected malformed registry, got {other:?}"),
        }

        let registry = write_registry(dir.path(), r#"{ "config": ["/c"] }"#);
        assert!(matches!(
            RuntimePaths::from_registry_file(&registry),
            Err(ExConfigError::RegistryMalformed { .. })
        ));
    }

    #[test]
    fn test_driver_dirs_bundled_sorted_then_external() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = dir.path().join("SteamVR");
        for name in ["null", "gamepad", "lighthouse"] {
            fs::create_dir_all(runtime.join("drivers").join(name)).unwrap();
        }
        fs::write(runtime.join("drivers").join("readme.txt"), "not a driver").unwrap();

        let external = vec![PathBuf::from("/opt/slimevr/driver"), PathBuf::from("/opt/alvr/driver")];
        let paths = RuntimePaths::new(dir.path().join("config"), runtime.clone(), external.clone());

        let mut expected: Vec<PathBuf> = ["gamepad", "lighthouse", "null"]
            .iter()
            .map(|n| runtime.join("drivers").join(n))
            .collect();
        expected.extend(external);
        assert_eq!(paths.driver_dirs(), expected);
    }

    #[test]
    fn test_driver_dirs_without_bundled_directory() {
        let paths = RuntimePaths::new(
            PathBuf::from("/nonexistent/config"),
            PathBuf::from("/nonexistent/runtime"),
            vec![PathBuf::from("/opt/ext")],
        );
        assert_eq!(paths.driver_dirs(), vec![PathBuf::from("/opt/ext")]);
    }

    #[test]
    fn test_resolve_uses_cached_registry() {
        let dir = tempfile::tempdir().unwrap();
        let registry = write_registry(dir.path(), r#"{ "config": ["/c"], "runtime": ["/r"] }"#);
        let mut prefs = Preferences {
            openvr_registry_path: Some(registry),
            ..Preferences::default()
        };

        let paths = RuntimePaths::resolve(&mut prefs).unwrap();
        assert_eq!(paths.config_dir(), Path::new("/c"));
    }

    #[test]
    fn test_find_registry_file_suffix() {
        if let Ok(path) = find_registry_file() {
            assert!(path.ends_with("openvr/openvrpaths.vrpath"));
        }
    }
}
