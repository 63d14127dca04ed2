//! Readable names for app and driver identifiers
//!
//! App names go through an ordered chain of lookups; the first one that
//! reaches a verdict wins. Unmatched identifiers fall back to themselves.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::constants::names::{KNOWN_APPS, KNOWN_DRIVERS, REJECTED_APP_PREFIXES, STEAM_APP_PATTERN};
use crate::steam_library::LibraryIndex;

static STEAM_APP_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(STEAM_APP_PATTERN).ok());

/// Outcome of one lookup in the chain
#[derive(Debug, Clone, PartialEq, Eq)]
enum Lookup {
    /// Not this rule's concern, try the next one
    Pass,
    /// Hide this identifier
    Reject,
    Found(String),
}

type AppRule = fn(&str, &LibraryIndex) -> Lookup;

const APP_RULES: &[AppRule] = &[rejected_prefix, known_app, steam_manifest_name];

fn rejected_prefix(identifier: &str, _: &LibraryIndex) -> Lookup {
    if REJECTED_APP_PREFIXES.iter().any(|prefix| identifier.starts_with(prefix)) {
        Lookup::Reject
    } else {
        Lookup::Pass
    }
}

fn known_app(identifier: &str, _: &LibraryIndex) -> Lookup {
    match lookup_table(KNOWN_APPS, identifier) {
        Some(name) => Lookup::Found(name.to_string()),
        None => Lookup::Pass,
    }
}

/// `steam.app.<id>` / `steam.overlay.<id>`: name from the app manifest, or
/// hidden when the app isn't installed
fn steam_manifest_name(identifier: &str, libraries: &LibraryIndex) -> Lookup {
    let Some(app_id) = steam_app_id(identifier) else {
        return Lookup::Pass;
    };
    match libraries.app_name(app_id) {
        Some(name) => Lookup::Found(name),
        None => {
            debug!(identifier = %identifier, "No installed manifest for Steam app");
            Lookup::Reject
        }
    }
}

fn steam_app_id(identifier: &str) -> Option<&str> {
    let re = STEAM_APP_RE.as_ref()?;
    re.captures(identifier)?.get(1).map(|m| m.as_str())
}

fn lookup_table(table: &'static [(&'static str, &'static str)], identifier: &str) -> Option<&'static str> {
    table.iter().find(|(id, _)| *id == identifier).map(|(_, name)| *name)
}

/// Readable name for an app identifier, or `None` when it should not be shown
pub fn resolve_app_name(identifier: &str, libraries: &LibraryIndex) -> Option<String> {
    for rule in APP_RULES {
        match rule(identifier, libraries) {
            Lookup::Pass => continue,
            Lookup::Reject => return None,
            Lookup::Found(name) => return Some(name),
        }
    }
    Some(identifier.to_string())
}

/// Readable name for a driver; drivers are always shown
pub fn resolve_driver_name(identifier: &str) -> String {
    lookup_table(KNOWN_DRIVERS, identifier).unwrap_or(identifier).to_string()
}
