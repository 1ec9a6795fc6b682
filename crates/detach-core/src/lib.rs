//! Core of the detach tool.
//!
//! This crate ties together the manifest schema, the project layout and the
//! runtime collaborators into the `Detacher`, which copies the tool package's
//! configuration and scripts into the host project, merges the two dependency
//! manifests, rewrites scripts, and removes the tool package. It also provides
//! the dev-server bootstrap used while the project is still attached.

pub mod config;
pub mod devserver;
pub mod engine;
pub mod lifecycle;
pub mod merge;
pub mod scripts;
pub mod transform;

pub use config::{DetachConfig, DevServerConfig};
pub use devserver::{DevServer, PortDecision, ProjectShape, StartOutcome};
pub use engine::{CleanupReport, DetachPlan, DetachReport, Detacher, MergedManifest, Progress};
pub use lifecycle::{validate_transition, DetachState};
pub use merge::{merge_dependencies, DependencyChange, MergeReport};
pub use scripts::{rewrite_command, rewrite_scripts, ScriptReport, ScriptRewrite, StaleScript};
pub use transform::{strip_regions, transform_content, FileRecord, TransformPolicy};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] detach_schema::ManifestError),
    #[error("{0}")]
    Project(#[from] detach_project::ProjectError),
    #[error("{0}")]
    Runtime(#[from] detach_runtime::RuntimeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid command pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error(
        "`{0}` already exists in your app folder. We cannot continue as you would lose all \
         the changes in that file or directory. Please move or delete it (maybe make a copy \
         for backup) and run this command again."
    )]
    DestinationExists(String),
    #[error(
        "This git repository has untracked files or uncommitted changes:\n\n{}\n\n\
         Remove untracked files, stash or commit any changes, and try again.",
        .0.join("\n")
    )]
    UncommittedChanges(Vec<String>),
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("could not find a required file: {}", .0.display())]
    MissingRequiredFile(PathBuf),
    #[error(
        "You must specify targeted browsers. Add a `browserslist` key to package.json \
         or create a .browserslistrc file."
    )]
    BrowserTargetsMissing,
}
