//! Driver enablement merged from driver manifests and `driver_<name>` overrides
//!
//! The runtime enables every `alwaysActivate` driver unless the shared
//! settings file holds a `driver_<name>` override. An enabled driver is
//! therefore persisted as the absence of a key, and only disabled drivers get
//! one. The built-in tracking driver's key is never read or written.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::constants::openvr::{DRIVER_KEY_PREFIX, DRIVER_MANIFEST, TRACKING_DRIVER};
use crate::error::{ExConfigError, Result};
use crate::names::resolve_driver_name;
use crate::setting::VRSetting;
use crate::settings_file::{self, SettingsDocument};

/// The part of `driver.vrdrivermanifest` we care about
#[derive(Debug, Clone, Deserialize)]
pub struct VRDriverManifest {
    #[serde(rename = "name")]
    pub internal_name: String,
    #[serde(rename = "alwaysActivate", default)]
    pub always_activate: bool,
}

impl VRDriverManifest {
    pub fn load(driver_dir: &Path) -> Result<Self> {
        let path = driver_dir.join(DRIVER_MANIFEST);
        let contents = fs::read(&path).map_err(|e| ExConfigError::io(&path, e))?;
        serde_json::from_slice(settings_file::strip_bom(&contents)).map_err(|e| ExConfigError::ManifestMalformed {
            path,
            reason: e.to_string(),
        })
    }
}

/// Value stored under a `driver_<name>` key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverOverride {
    #[serde(rename = "enable", default = "default_enable")]
    pub enabled: bool,
    #[serde(default)]
    pub blocked_by_safe_mode: bool,
}

fn default_enable() -> bool {
    true
}

impl DriverOverride {
    const DISABLED: Self = Self {
        enabled: false,
        blocked_by_safe_mode: false,
    };
}

/// One driver's enablement state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VRDriverSetting {
    pub internal_name: String,
    pub readable_name: String,
    pub enabled: bool,
    pub blocked_by_safe_mode: bool,
    dirty: bool,
}

impl VRDriverSetting {
    /// Join a manifest-declared driver with its override, if any. A safe-mode
    /// block becomes a plain disablement and marks the setting dirty.
    fn merge(internal_name: String, existing: Option<DriverOverride>) -> Self {
        let readable_name = resolve_driver_name(&internal_name);
        match existing {
            Some(o) if o.blocked_by_safe_mode => {
                info!(driver = %internal_name, "Driver was blocked by safe mode, treating it as disabled");
                Self {
                    internal_name,
                    readable_name,
                    enabled: false,
                    blocked_by_safe_mode: false,
                    dirty: true,
                }
            }
            Some(o) => Self {
                internal_name,
                readable_name,
                enabled: o.enabled,
                blocked_by_safe_mode: false,
                dirty: false,
            },
            None => Self {
                internal_name,
                readable_name,
                enabled: true,
                blocked_by_safe_mode: false,
                dirty: false,
            },
        }
    }
}

impl VRSetting for VRDriverSetting {
    fn identifier(&self) -> &str {
        &self.internal_name
    }

    fn readable_name(&self) -> &str {
        &self.readable_name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.dirty = true;
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Driver name for a settings key this module owns
fn owned_driver_key(key: &str) -> Option<&str> {
    let name = key.strip_prefix(DRIVER_KEY_PREFIX)?;
    if name.is_empty() || name == TRACKING_DRIVER {
        None
    } else {
        Some(name)
    }
}

/// Explicit overrides in the document, keyed by driver name
fn existing_overrides(document: &SettingsDocument) -> HashMap<String, DriverOverride> {
    let mut overrides = HashMap::new();
    for (key, value) in document {
        let Some(name) = owned_driver_key(key) else {
            continue;
        };
        match serde_json::from_value::<DriverOverride>(value.clone()) {
            Ok(o) => {
                overrides.insert(name.to_string(), o);
            }
            Err(e) => warn!(key = %key, error = %e, "Ignoring unreadable driver override"),
        }
    }
    overrides
}

/// Merge the drivers found in `driver_dirs` with the overrides stored in the
/// settings file. One entry per eligible driver, in `driver_dirs` order.
pub fn reconcile(settings_path: &Path, driver_dirs: &[PathBuf]) -> Result<Vec<VRDriverSetting>> {
    let document = settings_file::load(settings_path)?;
    let mut overrides = existing_overrides(&document);
    debug!(overrides = overrides.len(), "Loaded driver overrides");

    let mut settings = Vec::new();
    for dir in driver_dirs {
        let manifest = match VRDriverManifest::load(dir) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Skipping driver without a readable manifest");
                continue;
            }
        };

        if !manifest.always_activate {
            debug!(driver = %manifest.internal_name, "Driver isn't always-activate, not managed");
            continue;
        }
        if manifest.internal_name == TRACKING_DRIVER {
            continue;
        }
        if settings.iter().any(|s: &VRDriverSetting| s.internal_name == manifest.internal_name) {
            warn!(driver = %manifest.internal_name, dir = %dir.display(), "Driver registered twice, keeping the first");
            continue;
        }

        let existing = overrides.remove(&manifest.internal_name);
        settings.push(VRDriverSetting::merge(manifest.internal_name, existing));
    }

    info!(drivers = settings.len(), "Reconciled driver settings");
    Ok(settings)
}

/// Rewrite the driver keys of the settings file from `drivers`. Backs the file
/// up first (once ever), reloads it fresh and touches nothing but the keys
/// this module owns. Dirty flags are cleared only after a successful write.
pub fn persist(settings_path: &Path, drivers: &mut [VRDriverSetting]) -> Result<()> {
    settings_file::ensure_backup(settings_path)?;

    let mut document = settings_file::load(settings_path)?;
    document.retain(|key, _| owned_driver_key(key).is_none());

    for driver in drivers.iter().filter(|d| !d.enabled) {
        let value = serde_json::to_value(DriverOverride::DISABLED).map_err(|e| ExConfigError::DocumentMalformed {
            path: settings_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        document.insert(format!("{DRIVER_KEY_PREFIX}{}", driver.internal_name), value);
    }

    settings_file::write(settings_path, &document)?;

    for driver in drivers.iter_mut() {
        driver.dirty = false;
    }
    info!(
        path = %settings_path.display(),
        disabled = drivers.iter().filter(|d| !d.enabled).count(),
        "Saved driver settings"
    );
    Ok(())
}
