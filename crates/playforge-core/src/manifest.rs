//! Project manifest store
//!
//! Each project folder carries a `manifest.json` with its display name, the template
//! it came from, and whatever extra fields the template defines. Reads never fail:
//! a missing or corrupt manifest degrades to the folder name. Writes replace the
//! whole file atomically.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Manifest file name inside a project or template folder
pub const MANIFEST_FILE: &str = "manifest.json";

/// Parsed view of a manifest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    /// Display name
    pub name: String,
    /// Template the project was created from
    pub template_id: Option<String>,
    /// Description (templates only, by convention)
    pub description: Option<String>,
    /// Whether the values came from an actual manifest file
    #[serde(skip)]
    pub from_file: bool,
}

impl Manifest {
    /// Fallback used when no usable manifest exists
    pub fn fallback(folder_name: &str) -> Self {
        Self {
            name: folder_name.to_string(),
            template_id: None,
            description: None,
            from_file: false,
        }
    }

    fn from_document(folder_name: &str, doc: &Map<String, Value>) -> Self {
        let text = |key: &str| doc.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            name: text("name").unwrap_or_else(|| folder_name.to_string()),
            template_id: text("template_id").filter(|id| !id.is_empty()),
            description: text("description"),
            from_file: true,
        }
    }
}

fn folder_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Load the raw manifest object, if one exists and parses as a JSON object
fn load_document(dir: &Path) -> Option<Map<String, Value>> {
    let contents = fs::read_to_string(dir.join(MANIFEST_FILE)).ok()?;
    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) | Err(_) => {
            tracing::debug!(dir = %dir.display(), "Ignoring unusable manifest");
            None
        }
    }
}

/// Read a manifest, falling back to the folder name on any problem
pub fn read(dir: &Path) -> Manifest {
    let name = folder_name(dir);
    match load_document(dir) {
        Some(doc) => Manifest::from_document(&name, &doc),
        None => Manifest::fallback(&name),
    }
}

/// Apply `mutator` to an existing manifest and write it back
pub fn update<F>(dir: &Path, mutator: F) -> Result<()>
where
    F: FnOnce(&mut Map<String, Value>),
{
    let path = dir.join(MANIFEST_FILE);
    if !path.is_file() {
        return Err(Error::NotFound(format!("Manifest {}", path.display())));
    }

    let contents = fs::read_to_string(&path)?;
    let mut doc = match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(Error::invalid_data("manifest is not a JSON object")),
        Err(e) => return Err(Error::invalid_data(format!("malformed manifest: {e}"))),
    };

    mutator(&mut doc);
    write_json_atomic(&path, &Value::Object(doc))
}

/// Serialize with four-space indentation, leaving non-ASCII characters unescaped
pub fn to_pretty_json(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| Error::invalid_data(e.to_string()))?;
    Ok(buf)
}

/// Write a JSON document via temp file + rename in the same directory
pub fn write_json_atomic(path: &Path, value: &Value) -> Result<()> {
    let bytes = to_pretty_json(value)?;
    write_atomic(path, &bytes)
}

/// Replace `path` with `bytes` without ever exposing a partially written file
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::Other(format!("{} has no parent directory", path.display())))?;

    let permissions = match fs::metadata(path) {
        Ok(existing) => Some(existing.permissions()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => new_file_permissions(),
        Err(e) => return Err(e.into()),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    if let Some(permissions) = permissions {
        tmp.as_file().set_permissions(permissions)?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Storage(e.error))?;
    Ok(())
}

/// Mode for files that did not exist before; temp files start out as 0600
#[cfg(unix)]
fn new_file_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<fs::Permissions> {
    None
}
