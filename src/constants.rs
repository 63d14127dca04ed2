//! Application-wide constants
//!
//! File names, suffixes and lookup tables for the SteamVR and Steam files this
//! tool reads and patches, kept in one place.

/// Tool preference file location (under the user config dir)
pub mod config {
    /// Directory created under the platform config dir
    pub const APP_DIR: &str = "steamvr-exconfig";

    /// Preference file name
    pub const FILENAME: &str = "config.json";
}

/// OpenVR registry and runtime layout
pub mod openvr {
    /// Registry file, relative to the platform base directory
    pub const REGISTRY_FILE: &str = "openvr/openvrpaths.vrpath";

    /// Per-app config directory, relative to the config root
    pub const APP_CONFIG_DIR: &str = "vrappconfig";

    /// Extension of per-app config files (without the dot)
    pub const APP_CONFIG_EXT: &str = "vrappconfig";

    /// Shared runtime settings file, relative to the config root
    pub const SETTINGS_FILE: &str = "steamvr.vrsettings";

    /// Suffix appended to the settings file name for the one-time backup
    pub const BACKUP_SUFFIX: &str = ".excfg.bkp";

    /// Bundled driver directory, relative to the runtime root
    pub const DRIVERS_DIR: &str = "drivers";

    /// Manifest file inside every driver directory
    pub const DRIVER_MANIFEST: &str = "driver.vrdrivermanifest";

    /// Prefix of driver keys in the shared settings file
    pub const DRIVER_KEY_PREFIX: &str = "driver_";

    /// Built-in tracking driver whose settings key is never touched
    pub const TRACKING_DRIVER: &str = "lighthouse";

    /// Indent used by the runtime when it writes its JSON files
    pub const JSON_INDENT: &[u8] = b"   ";

    /// Byte order mark some editors prepend to the runtime's JSON files
    pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
}

/// Steam library layout
pub mod steam {
    /// Library index, relative to the config root
    pub const LIBRARY_FOLDERS_FILE: &str = "libraryfolders.vdf";

    /// Per-library directory holding app manifests
    pub const STEAMAPPS_DIR: &str = "steamapps";

    /// Per-library directory holding installed app content
    pub const COMMON_DIR: &str = "common";

    /// App manifest file name for an app id
    pub fn app_manifest_file(app_id: &str) -> String {
        format!("appmanifest_{app_id}.acf")
    }
}

/// Readable-name tables
pub mod names {
    /// Identifier prefixes of entries that are never shown
    pub const REJECTED_APP_PREFIXES: &[&str] = &["revive.app"];

    /// Common VR apps that don't go through the Steam store
    pub const KNOWN_APPS: &[(&str, &str)] = &[
        ("openvr.tool.steamvr_environments", "SteamVR Environments"),
        ("openvr.tool.steamvr_room_setup", "SteamVR Room Setup"),
        ("openvr.tool.steamvr_tutorial", "SteamVR Tutorial"),
        ("pushrax.SpaceCalibrator", "OpenVR Space Calibrator"),
        ("revive.dashboard.overlay", "Revive Dashboard Overlay"),
        ("slimevr.steamvr.feeder", "SlimeVR Feeder"),
    ];

    pub const KNOWN_DRIVERS: &[(&str, &str)] = &[("gamepad", "Gamepad Support")];

    /// Steam app/overlay identifiers carrying a numeric app id
    pub const STEAM_APP_PATTERN: &str = r"^steam\.(?:app|overlay)\.(\d+)$";
}
