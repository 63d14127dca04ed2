//! Error taxonomy shared by the discovery and patching modules

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::keyvalues::ParseError;

#[derive(Debug, Error)]
pub enum ExConfigError {
    #[error("No OpenVR base directory known for this platform")]
    UnsupportedPlatform,

    #[error("Couldn't read OpenVR registry {}: {source}", path.display())]
    RegistryNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("OpenVR registry {} is malformed: {reason}", path.display())]
    RegistryMalformed { path: PathBuf, reason: String },

    #[error("Couldn't parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Driver manifest {} is malformed: {reason}", path.display())]
    ManifestMalformed { path: PathBuf, reason: String },

    #[error("Settings document {} is malformed: {reason}", path.display())]
    DocumentMalformed { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExConfigError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// True when the underlying cause is a missing file
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::RegistryNotFound { source, .. } | Self::Io { source, .. } => {
                source.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

pub type Result<T, E = ExConfigError> = std::result::Result<T, E>;
