//! Load, back up and rewrite the runtime's shared JSON settings file
//!
//! The document is kept as an insertion-ordered map of untyped JSON values so
//! keys this tool doesn't own survive a rewrite unchanged.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::constants::openvr::{BACKUP_SUFFIX, JSON_INDENT, UTF8_BOM};
use crate::error::{ExConfigError, Result};

/// Full key space of the shared settings file, in file order
pub type SettingsDocument = Map<String, Value>;

/// Drop a leading UTF-8 byte order mark; the runtime's own files may carry one
pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

pub fn load(path: &Path) -> Result<SettingsDocument> {
    let bytes = fs::read(path).map_err(|e| ExConfigError::io(path, e))?;
    let value: Value = serde_json::from_slice(strip_bom(&bytes)).map_err(|e| ExConfigError::DocumentMalformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(ExConfigError::DocumentMalformed {
            path: path.to_path_buf(),
            reason: format!("root is {}, expected an object", json_kind(&other)),
        }),
    }
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Copy `path` next to itself with the backup suffix unless a backup already
/// exists. Returns whether a new backup was written.
pub fn ensure_backup(path: &Path) -> Result<bool> {
    let backup = backup_path(path);

    let mut source = File::open(path).map_err(|e| ExConfigError::io(path, e))?;
    let mut target = match OpenOptions::new().write(true).create_new(true).open(&backup) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            debug!(backup = %backup.display(), "Backup already present, leaving it untouched");
            return Ok(false);
        }
        Err(e) => return Err(ExConfigError::io(&backup, e)),
    };

    let copied = io::copy(&mut source, &mut target).and_then(|_| target.sync_all());
    if let Err(e) = copied {
        // Don't leave a truncated copy behind, it would block every later backup
        drop(target);
        let _ = fs::remove_file(&backup);
        return Err(ExConfigError::io(&backup, e));
    }

    info!(backup = %backup.display(), "Backed up settings file before first write");
    Ok(true)
}

pub fn write(path: &Path, document: &SettingsDocument) -> Result<()> {
    write_json(path, document)
}

/// Serialize `value` in the runtime's JSON style and swap it in atomically
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(JSON_INDENT));
    value.serialize(&mut ser).map_err(|e| ExConfigError::io(path, io::Error::other(e)))?;
    bytes.push(b'\n');

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ExConfigError::io(dir, e))?;
    tmp.write_all(&bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| ExConfigError::io(tmp.path(), e))?;

    // The temp file starts out owner-only; carry over the mode of the file it replaces
    match fs::metadata(path) {
        Ok(existing) => tmp
            .as_file()
            .set_permissions(existing.permissions())
            .map_err(|e| ExConfigError::io(tmp.path(), e))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(ExConfigError::io(path, e)),
    }
    tmp.persist(path).map_err(|e| ExConfigError::io(path, e.error))?;

    debug!(path = %path.display(), bytes = bytes.len(), "Wrote JSON file");
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
