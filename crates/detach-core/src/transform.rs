//! Copies the tool package's configuration and scripts into the host project.
//!
//! Files are copied from a fixed set of folders. A file carrying the exclusion
//! marker is skipped, and every `begin … end` marker region is cut out of the
//! others before they are written.

use crate::CoreError;
use detach_project::{write_atomic, ProjectLayout};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Folders of the tool package copied into the host, parents first.
pub const EJECT_FOLDERS: [&str; 4] = ["config", "config/jest", "scripts", "scripts/utils"];

/// Marks a file that must never be copied.
pub const EXCLUDE_MARKER: &str = "// @remove-file-on-eject";

/// `(begin, end)` region markers, one pair per comment syntax.
pub const REGION_MARKERS: [(&str, &str); 2] = [
    ("// @remove-on-eject-begin", "// @remove-on-eject-end"),
    ("-- @remove-on-eject-begin", "-- @remove-on-eject-end"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformPolicy {
    Verbatim,
    StripMarkedRegions,
    Excluded,
}

/// A tool file and where it lands in the host project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub source: PathBuf,
    /// Path relative to both package roots.
    pub relative: PathBuf,
    pub policy: TransformPolicy,
}

impl TransformPolicy {
    pub fn classify(content: &str) -> Self {
        if content.contains(EXCLUDE_MARKER) {
            TransformPolicy::Excluded
        } else if REGION_MARKERS
            .iter()
            .any(|(begin, end)| strip_regions(content, begin, end).len() != content.len())
        {
            TransformPolicy::StripMarkedRegions
        } else {
            TransformPolicy::Verbatim
        }
    }
}

/// Remove every `begin … end` region, markers included.
///
/// Regions are matched left to right, each begin with the nearest following
/// end. A begin marker without a matching end is left in place.
pub fn strip_regions(text: &str, begin: &str, end: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(begin) {
        let after_begin = &rest[start + begin.len()..];
        let Some(stop) = after_begin.find(end) else {
            break;
        };
        out.push_str(&rest[..start]);
        rest = &after_begin[stop + end.len()..];
    }
    out.push_str(rest);
    out
}

/// Transformed file content, or `None` when the file is excluded.
///
/// Marker regions are removed, trailing whitespace trimmed, and exactly one
/// newline appended.
pub fn transform_content(content: &str) -> Option<String> {
    if content.contains(EXCLUDE_MARKER) {
        return None;
    }
    let mut text = content.to_owned();
    for (begin, end) in REGION_MARKERS {
        text = strip_regions(&text, begin, end);
    }
    let mut trimmed = text.trim_end().to_owned();
    trimmed.push('\n');
    Some(trimmed)
}

/// Regular files directly inside each copied folder of the tool package.
pub fn collect_sources(layout: &ProjectLayout) -> Result<Vec<PathBuf>, CoreError> {
    let mut files = Vec::new();
    for folder in EJECT_FOLDERS {
        let dir = layout.tool_path(folder);
        let mut entries: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
            .map(|e| Path::new(folder).join(e.file_name()))
            .collect();
        entries.sort();
        files.extend(entries);
    }
    Ok(files)
}

/// Fail if any destination folder or file already exists in the host.
pub fn verify_absent(layout: &ProjectLayout, files: &[PathBuf]) -> Result<(), CoreError> {
    let folders = EJECT_FOLDERS.iter().map(PathBuf::from);
    for relative in folders.chain(files.iter().cloned()) {
        if layout.app_path(&relative).exists() {
            return Err(CoreError::DestinationExists(display_relative(&relative)));
        }
    }
    Ok(())
}

/// Create the destination folders and write every non-excluded file.
pub fn copy_files(layout: &ProjectLayout, files: &[PathBuf]) -> Result<Vec<FileRecord>, CoreError> {
    for folder in EJECT_FOLDERS {
        fs::create_dir_all(layout.app_path(folder))?;
    }

    let mut records = Vec::with_capacity(files.len());
    for relative in files {
        let source = layout.tool_path(relative);
        let content = fs::read_to_string(&source)?;
        let policy = TransformPolicy::classify(&content);
        if let Some(output) = transform_content(&content) {
            debug!("writing {}", relative.display());
            write_atomic(&layout.app_path(relative), &output)?;
        } else {
            debug!("skipping excluded {}", relative.display());
        }
        records.push(FileRecord {
            source,
            relative: relative.clone(),
            policy,
        });
    }
    Ok(records)
}

/// Forward-slash form of a relative path for messages.
pub fn display_relative(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
