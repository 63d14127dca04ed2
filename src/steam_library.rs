//! Steam library index built from `libraryfolders.vdf`
//!
//! Answers which library root owns an installed app and reads that app's
//! `appmanifest_<id>.acf` on demand. Manifests are never cached.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::constants::steam::{COMMON_DIR, LIBRARY_FOLDERS_FILE, STEAMAPPS_DIR, app_manifest_file};
use crate::error::Result;
use crate::keyvalues::{self, KvNode};

/// One library installation root and the apps installed in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRoot {
    pub path: PathBuf,
    pub apps: HashSet<String>,
}

impl LibraryRoot {
    fn steamapps_dir(&self) -> PathBuf {
        self.path.join(STEAMAPPS_DIR)
    }
}

/// Fields read from a single app manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppManifestRecord {
    pub name: Option<String>,
    pub install_dir: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LibraryIndex {
    roots: Vec<LibraryRoot>,
}

impl LibraryIndex {
    /// Read `libraryfolders.vdf` under the config root. A missing or broken
    /// index is logged and yields an empty index.
    pub fn load(config_root: &Path) -> Self {
        let path = config_root.join(LIBRARY_FOLDERS_FILE);
        match Self::from_file(&path) {
            Ok(index) => {
                info!(path = %path.display(), libraries = index.roots.len(), "Loaded Steam libraries");
                index
            }
            Err(e) => {
                warn!(error = %e, "Couldn't retrieve Steam libraries, app names will fall back to identifiers");
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let manifest = keyvalues::read_file(path)?;
        Ok(Self::from_manifest(&manifest))
    }

    /// Build from a parsed library manifest. An app id listed by several
    /// libraries belongs to the first one; libraries left owning nothing are
    /// dropped.
    pub fn from_manifest(manifest: &KvNode) -> Self {
        let mut seen: HashSet<String> = HashSet::new();
        let mut roots = Vec::new();

        for entry in manifest.children() {
            let Some(path) = entry.get_str("path") else {
                warn!(library = %entry.key, "Library entry has no path, skipping");
                continue;
            };

            let mut apps = HashSet::new();
            for app in entry.child("apps").map(KvNode::children).unwrap_or_default() {
                if seen.contains(&app.key) {
                    debug!(app = %app.key, library = %path, "App already owned by an earlier library");
                    continue;
                }
                seen.insert(app.key.clone());
                apps.insert(app.key.clone());
            }

            if apps.is_empty() {
                continue;
            }

            roots.push(LibraryRoot { path: PathBuf::from(path), apps });
        }

        Self { roots }
    }

    pub fn roots(&self) -> &[LibraryRoot] {
        &self.roots
    }

    /// Library that owns `app_id`, if it is installed at all
    pub fn find_install_root(&self, app_id: &str) -> Option<&Path> {
        self.find_root(app_id).map(|root| root.path.as_path())
    }

    /// Read the manifest of an installed app. A missing or unreadable
    /// manifest gives `None`.
    pub fn read_app_manifest(&self, app_id: &str) -> Option<AppManifestRecord> {
        let root = self.find_root(app_id)?;
        let path = root.steamapps_dir().join(app_manifest_file(app_id));

        let manifest = match keyvalues::read_file(&path) {
            Ok(manifest) => manifest,
            Err(e) if e.is_not_found() => {
                debug!(app = %app_id, path = %path.display(), "No app manifest on disk");
                return None;
            }
            Err(e) => {
                warn!(app = %app_id, error = %e, "Couldn't read app manifest");
                return None;
            }
        };

        Some(AppManifestRecord {
            name: manifest.get_str("name").map(str::to_string),
            install_dir: manifest.get_str("installdir").map(str::to_string),
        })
    }

    /// Display name from the app's manifest
    pub fn app_name(&self, app_id: &str) -> Option<String> {
        self.read_app_manifest(app_id)?.name
    }

    /// `<library>/steamapps/common/<installdir>` for an installed app
    pub fn install_location(&self, app_id: &str) -> Option<PathBuf> {
        let root = self.find_root(app_id)?;
        let install_dir = self.read_app_manifest(app_id)?.install_dir?;
        Some(root.steamapps_dir().join(COMMON_DIR).join(install_dir))
    }

    fn find_root(&self, app_id: &str) -> Option<&LibraryRoot> {
        self.roots.iter().find(|root| root.apps.contains(app_id))
    }
}
