//! Package manifest parsing and serialization for detach.
//!
//! This crate defines the schema layer: the `package.json` model
//! (`PackageManifest`) with key order preserved for exact round-trips, typed
//! access to the dependency sections, `scripts`, `bin` and `directories`, and
//! the generated test-runner configuration written during detachment.

pub mod jest;
pub mod manifest;
pub mod types;

pub use jest::{test_runner_config, TestRunnerOptions};
pub use manifest::{
    parse_manifest_file, parse_manifest_str, DependencySection, DependencyTable, ManifestError,
    PackageManifest, LINE_ENDING, MANIFEST_FILE,
};
pub use types::PackageName;
