//! Everything the user can toggle, plus the explicit save

use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::app_settings::{self, VRAppSetting};
use crate::driver_settings::{self, VRDriverSetting};
use crate::error::{ExConfigError, Result};
use crate::openvr_paths::RuntimePaths;
use crate::setting::VRSetting;
use crate::steam_library::LibraryIndex;

pub struct VRConfig {
    pub apps: Vec<VRAppSetting>,
    pub drivers: Vec<VRDriverSetting>,
    pub settings_path: PathBuf,
}

/// What went wrong during a save; empty when everything was written
#[derive(Debug, Default)]
pub struct SaveReport {
    /// (readable name, error) per app whose config couldn't be written
    pub failed_apps: Vec<(String, ExConfigError)>,
    pub driver_error: Option<ExConfigError>,
}

impl SaveReport {
    pub fn is_success(&self) -> bool {
        self.failed_apps.is_empty() && self.driver_error.is_none()
    }
}

impl VRConfig {
    pub fn load(paths: &RuntimePaths, libraries: &LibraryIndex) -> Result<Self> {
        // A runtime that has never written an app config has no directory yet
        let apps = app_settings::discover(paths.app_config_dir(), libraries).unwrap_or_else(|e| {
            warn!(error = %e, "Couldn't list app configs, showing no apps");
            Vec::new()
        });
        let settings_path = paths.settings_file();
        let drivers = driver_settings::reconcile(&settings_path, &paths.driver_dirs())?;

        Ok(Self {
            apps,
            drivers,
            settings_path,
        })
    }

    pub fn find_app_mut(&mut self, query: &str) -> Option<&mut VRAppSetting> {
        self.apps.iter_mut().find(|app| app.matches(query))
    }

    pub fn find_driver_mut(&mut self, query: &str) -> Option<&mut VRDriverSetting> {
        self.drivers.iter_mut().find(|driver| driver.matches(query))
    }

    /// Save every dirty app on its own, then the drivers if any changed.
    /// A failure never stops or rolls back the other saves.
    pub fn save(&mut self) -> SaveReport {
        let mut report = SaveReport::default();

        for app in self.apps.iter_mut() {
            if let Err(e) = app.save() {
                error!(app = %app.readable_name, error = %e, "Couldn't save app config");
                report.failed_apps.push((app.readable_name.clone(), e));
            }
        }

        if self.drivers.iter().any(|d| d.is_dirty()) {
            if let Err(e) = driver_settings::persist(&self.settings_path, &mut self.drivers) {
                error!(error = %e, "Couldn't save driver settings");
                report.driver_error = Some(e);
            }
        }

        if report.is_success() {
            info!("All settings saved");
        }
        report
    }
}
