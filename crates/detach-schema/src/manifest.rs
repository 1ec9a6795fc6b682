use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name of a package manifest inside a package root.
pub const MANIFEST_FILE: &str = "package.json";

/// Line ending appended after the serialized manifest.
#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Name → version range mapping of one dependency section, ordered by key.
pub type DependencyTable = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("manifest root must be a JSON object")]
    NotAnObject,
    #[error("invalid manifest field '{field}': {reason}")]
    InvalidField { field: String, reason: &'static str },
}

/// The dependency mappings a manifest can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencySection {
    Dependencies,
    DevDependencies,
    OptionalDependencies,
}

impl DependencySection {
    pub fn key(self) -> &'static str {
        match self {
            DependencySection::Dependencies => "dependencies",
            DependencySection::DevDependencies => "devDependencies",
            DependencySection::OptionalDependencies => "optionalDependencies",
        }
    }
}

impl fmt::Display for DependencySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A `package.json` document.
///
/// The document is kept as an ordered JSON object so that every key the
/// typed accessors do not touch is written back exactly where it was read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageManifest {
    fields: Map<String, Value>,
}

impl PackageManifest {
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set a top-level key. An existing key keeps its position.
    pub fn insert(&mut self, key: &str, value: Value) -> Option<Value> {
        self.fields.insert(key.to_owned(), value)
    }

    pub fn has_section(&self, section: DependencySection) -> bool {
        self.fields.get(section.key()).is_some_and(Value::is_object)
    }

    /// Read a dependency section. An absent section reads as empty.
    pub fn dependency_table(
        &self,
        section: DependencySection,
    ) -> Result<DependencyTable, ManifestError> {
        match self.fields.get(section.key()) {
            None | Some(Value::Null) => Ok(DependencyTable::new()),
            Some(value) => string_entries(section.key(), value).map(|e| e.into_iter().collect()),
        }
    }

    /// Replace a dependency section with a freshly built object in key order.
    pub fn set_dependency_table(&mut self, section: DependencySection, table: &DependencyTable) {
        let object: Map<String, Value> = table
            .iter()
            .map(|(name, range)| (name.clone(), Value::String(range.clone())))
            .collect();
        self.fields
            .insert(section.key().to_owned(), Value::Object(object));
    }

    pub fn declares(&self, section: DependencySection, package: &str) -> bool {
        self.fields
            .get(section.key())
            .and_then(Value::as_object)
            .is_some_and(|deps| deps.contains_key(package))
    }

    /// Executable command names exposed through `bin`, in declaration order.
    ///
    /// A string `bin` exposes a single command named after the package.
    pub fn commands(&self) -> Result<Vec<String>, ManifestError> {
        match self.fields.get("bin") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::String(_)) => self.name().map(|n| vec![n.to_owned()]).ok_or_else(|| {
                ManifestError::InvalidField {
                    field: "bin".to_owned(),
                    reason: "a string bin requires a package name",
                }
            }),
            Some(Value::Object(map)) => Ok(map.keys().cloned().collect()),
            Some(_) => Err(ManifestError::InvalidField {
                field: "bin".to_owned(),
                reason: "expected a string or an object",
            }),
        }
    }

    /// Script entries in declaration order.
    pub fn scripts(&self) -> Result<Vec<(String, String)>, ManifestError> {
        match self.fields.get("scripts") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => string_entries("scripts", value),
        }
    }

    pub fn set_script(&mut self, name: &str, command: &str) {
        let scripts = self
            .fields
            .entry("scripts")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = scripts {
            map.insert(name.to_owned(), Value::String(command.to_owned()));
        }
    }

    /// Delete a script entry, returning its command if it existed.
    pub fn remove_script(&mut self, name: &str) -> Option<String> {
        let map = self.fields.get_mut("scripts")?.as_object_mut()?;
        // shift_remove keeps the order of the remaining scripts
        map.shift_remove(name)
            .and_then(|v| v.as_str().map(str::to_owned))
    }

    pub fn directories_config(&self) -> Option<&str> {
        self.fields
            .get("directories")
            .and_then(|d| d.get("config"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Point `directories.config` at `value` if it is already set.
    pub fn reset_directories_config(&mut self, value: &str) -> bool {
        if self.directories_config().is_none() {
            return false;
        }
        match self
            .fields
            .get_mut("directories")
            .and_then(Value::as_object_mut)
        {
            Some(dirs) => {
                dirs.insert("config".to_owned(), Value::String(value.to_owned()));
                true
            }
            None => false,
        }
    }

    /// Serialize with two-space indentation and a trailing line ending.
    pub fn to_json_pretty(&self) -> Result<String, ManifestError> {
        let mut out = serde_json::to_string_pretty(&self.fields)?;
        out.push_str(LINE_ENDING);
        Ok(out)
    }
}

fn string_entries(field: &str, value: &Value) -> Result<Vec<(String, String)>, ManifestError> {
    let Some(map) = value.as_object() else {
        return Err(ManifestError::InvalidField {
            field: field.to_owned(),
            reason: "expected an object",
        });
    };
    map.iter()
        .map(|(k, v)| match v.as_str() {
            Some(s) => Ok((k.clone(), s.to_owned())),
            None => Err(ManifestError::InvalidField {
                field: format!("{field}.{k}"),
                reason: "expected a string value",
            }),
        })
        .collect()
}

pub fn parse_manifest_str(input: &str) -> Result<PackageManifest, ManifestError> {
    match serde_json::from_str::<Value>(input)? {
        Value::Object(fields) => Ok(PackageManifest { fields }),
        _ => Err(ManifestError::NotAnObject),
    }
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<PackageManifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}
