use crate::config::DetachConfig;
use crate::lifecycle::{validate_transition, DetachState};
use crate::merge::{merge_dependencies, MergeReport};
use crate::scripts::{rewrite_scripts, ScriptReport};
use crate::transform::{self, FileRecord};
use crate::CoreError;
use detach_project::{write_manifest, PackageRepository};
use detach_runtime::{PackageInstaller, PackageManager, ShimGuard, WorkingTree};
use detach_schema::{parse_manifest_file, test_runner_config, PackageManifest, TestRunnerOptions};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Value `directories.config` is reset to when the host sets it.
pub const DEFAULT_CONFIG_DIR: &str = "config";

/// Everything computed from the tool package before the first write.
#[derive(Debug, Clone)]
pub struct DetachPlan {
    pub tool_manifest: PackageManifest,
    /// Commands the tool exposes through `bin`.
    pub commands: Vec<String>,
    /// Files to copy, relative to both package roots.
    pub files: Vec<PathBuf>,
    /// Generated `jest` block for the host manifest.
    pub test_config: Value,
}

/// The host manifest after merging, ready to be written.
#[derive(Debug, Clone)]
pub struct MergedManifest {
    pub manifest: PackageManifest,
    pub dependencies: MergeReport,
    pub scripts: ScriptReport,
    pub directories_reset: bool,
}

/// Outcome of removing the tool package from the host. Failures here never
/// fail the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    /// The tool lives outside the host project and was left alone.
    pub skipped: bool,
    pub removed: Vec<PathBuf>,
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetachReport {
    pub state: DetachState,
    pub app_root: PathBuf,
    pub files: Vec<FileRecord>,
    pub dependencies: MergeReport,
    pub scripts: ScriptReport,
    pub directories_reset: bool,
    pub cleanup: CleanupReport,
    pub package_manager: String,
}

/// Milestones reported by `Detacher::run` as stages complete.
#[derive(Debug, Clone, Copy)]
pub enum Progress<'r> {
    /// Preflight passed and nothing collides; files are about to be copied.
    Planned,
    FilesCopied(&'r [FileRecord]),
    ManifestMerged(&'r MergedManifest),
    /// The package manager is about to run.
    Reinstalling(PackageManager),
}

/// Drives one detach run through its stages.
///
/// Each stage method checks the current state first, so stages cannot be
/// skipped, repeated or resumed after a failure.
pub struct Detacher<'a> {
    config: DetachConfig,
    repo: &'a dyn PackageRepository,
    installer: &'a dyn PackageInstaller,
    state: DetachState,
}

impl<'a> Detacher<'a> {
    pub fn new(
        config: DetachConfig,
        repo: &'a dyn PackageRepository,
        installer: &'a dyn PackageInstaller,
    ) -> Self {
        Self {
            config,
            repo,
            installer,
            state: DetachState::Init,
        }
    }

    pub fn state(&self) -> DetachState {
        self.state
    }

    pub fn config(&self) -> &DetachConfig {
        &self.config
    }

    fn advance(&mut self, to: DetachState) -> Result<(), CoreError> {
        validate_transition(self.state, to)?;
        debug!("detach state: {} -> {to}", self.state);
        self.state = to;
        Ok(())
    }

    /// Stop the run before anything was written.
    pub fn abort(&mut self) -> Result<(), CoreError> {
        self.advance(DetachState::Aborted)
    }

    /// Abort on `err` when the run is still allowed to abort, then return it.
    fn fail(&mut self, err: CoreError) -> CoreError {
        if validate_transition(self.state, DetachState::Aborted).is_ok() {
            self.state = DetachState::Aborted;
        }
        err
    }

    /// Refuse to run over uncommitted changes in the host project.
    pub fn preflight(&mut self, tree: &dyn WorkingTree) -> Result<(), CoreError> {
        validate_transition(self.state, DetachState::PreflightValidated)?;
        let changes = tree.uncommitted_changes(self.config.layout.app_root());
        if !changes.is_empty() {
            return Err(self.fail(CoreError::UncommittedChanges(changes)));
        }
        self.advance(DetachState::PreflightValidated)
    }

    /// Read the tool package and check that no destination exists yet.
    pub fn plan(&mut self) -> Result<DetachPlan, CoreError> {
        if self.state != DetachState::PreflightValidated {
            return Err(CoreError::InvalidTransition {
                from: self.state.to_string(),
                to: DetachState::FilesCopied.to_string(),
            });
        }
        self.build_plan().map_err(|e| self.fail(e))
    }

    fn build_plan(&self) -> Result<DetachPlan, CoreError> {
        let layout = &self.config.layout;
        let tool_manifest = parse_manifest_file(layout.tool_manifest_path())?;
        if tool_manifest.name() != Some(self.config.tool.as_str()) {
            warn!(
                "{} declares name {:?}, expected {}",
                layout.tool_manifest_path().display(),
                tool_manifest.name(),
                self.config.tool
            );
        }
        let commands = tool_manifest.commands()?;
        let files = transform::collect_sources(layout)?;
        transform::verify_absent(layout, &files)?;

        let test_config = test_runner_config(&TestRunnerOptions {
            root_dir: None,
            src_paths: self.config.src_paths.clone(),
            setup_tests: layout.setup_tests().exists(),
        });

        Ok(DetachPlan {
            tool_manifest,
            commands,
            files,
            test_config,
        })
    }

    pub fn copy_files(&mut self, plan: &DetachPlan) -> Result<Vec<FileRecord>, CoreError> {
        validate_transition(self.state, DetachState::FilesCopied)?;
        info!("copying files into {}", self.config.layout.app_root().display());
        let records = transform::copy_files(&self.config.layout, &plan.files)?;
        self.advance(DetachState::FilesCopied)?;
        Ok(records)
    }

    /// Compute the new host manifest in memory.
    pub fn merge_manifest(&mut self, plan: &DetachPlan) -> Result<MergedManifest, CoreError> {
        validate_transition(self.state, DetachState::ManifestMerged)?;
        let mut manifest = parse_manifest_file(self.config.layout.manifest_path())?;

        let dependencies = merge_dependencies(
            &mut manifest,
            &plan.tool_manifest,
            self.config.tool.as_str(),
            self.repo,
        )?;
        let directories_reset = manifest.reset_directories_config(DEFAULT_CONFIG_DIR);
        let skip = self.config.commands_to_skip();
        let scripts = rewrite_scripts(&mut manifest, &plan.commands, &skip)?;
        manifest.insert("jest", plan.test_config.clone());

        self.advance(DetachState::ManifestMerged)?;
        Ok(MergedManifest {
            manifest,
            dependencies,
            scripts,
            directories_reset,
        })
    }

    pub fn write_manifest(&mut self, merged: &MergedManifest) -> Result<(), CoreError> {
        validate_transition(self.state, DetachState::ManifestWritten)?;
        let path = self.config.layout.manifest_path();
        info!("writing {}", path.display());
        write_manifest(&path, &merged.manifest)?;
        self.advance(DetachState::ManifestWritten)
    }

    /// Delete the tool's `bin` shims and its installed directory.
    ///
    /// Only a tool installed inside the host project is touched. Failures are
    /// logged and collected.
    pub fn remove_tool(&mut self, plan: &DetachPlan) -> Result<CleanupReport, CoreError> {
        validate_transition(self.state, DetachState::ToolRemoved)?;
        let layout = &self.config.layout;
        let mut report = CleanupReport::default();

        if layout.tool_inside_app() {
            for command in &plan.commands {
                remove_path(&layout.bin_shim(command), &mut report);
            }
            remove_path(layout.tool_root(), &mut report);
        } else {
            debug!(
                "{} is outside {}; leaving it in place",
                layout.tool_root().display(),
                layout.app_root().display()
            );
            report.skipped = true;
        }

        self.advance(DetachState::ToolRemoved)?;
        Ok(report)
    }

    /// Run the package manager in the host project.
    pub fn reinstall(&mut self, plan: &DetachPlan) -> Result<(), CoreError> {
        validate_transition(self.state, DetachState::DependenciesReinstalled)?;
        let manager = self.config.package_manager;
        let layout = &self.config.layout;

        // yarn deletes the running command's .cmd shim on Windows
        let guards: Vec<ShimGuard> = if manager == PackageManager::Yarn && cfg!(windows) {
            plan.commands
                .iter()
                .map(|c| ShimGuard::capture(layout.bin_shim(&format!("{c}.cmd"))))
                .collect()
        } else {
            Vec::new()
        };

        let result = self.installer.install(manager, layout.app_root());
        for guard in guards {
            guard.restore();
        }
        result?;
        self.advance(DetachState::DependenciesReinstalled)
    }

    pub fn finish(&mut self) -> Result<(), CoreError> {
        self.advance(DetachState::Done)
    }

    /// Run every stage after confirmation, in order.
    pub fn run(
        &mut self,
        tree: &dyn WorkingTree,
        on_progress: &mut dyn FnMut(Progress<'_>),
    ) -> Result<DetachReport, CoreError> {
        self.preflight(tree)?;
        let plan = self.plan()?;
        on_progress(Progress::Planned);
        let files = self.copy_files(&plan)?;
        on_progress(Progress::FilesCopied(&files));
        let merged = self.merge_manifest(&plan)?;
        on_progress(Progress::ManifestMerged(&merged));
        self.write_manifest(&merged)?;
        let cleanup = self.remove_tool(&plan)?;
        on_progress(Progress::Reinstalling(self.config.package_manager));
        self.reinstall(&plan)?;
        self.finish()?;

        Ok(DetachReport {
            state: self.state,
            app_root: self.config.layout.app_root().to_path_buf(),
            files,
            dependencies: merged.dependencies,
            scripts: merged.scripts,
            directories_reset: merged.directories_reset,
            cleanup,
            package_manager: self.config.package_manager.to_string(),
        })
    }
}

fn remove_path(path: &Path, report: &mut CleanupReport) {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => report.removed.push(path.to_path_buf()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            warn!("could not remove {}: {e}", path.display());
            report.failures.push(format!("{}: {e}", path.display()));
        }
    }
}
