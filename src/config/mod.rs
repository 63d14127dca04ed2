//! Configuration management for steamvr-exconfig
//!
//! Only the tool's own preference file lives here. SteamVR's files are handled
//! by the discovery and patching modules.

pub mod preferences;

pub use preferences::Preferences;
