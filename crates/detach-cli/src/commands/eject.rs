use super::{
    cyan, green, json_pretty, red, require_prereqs, yellow_bold, EXIT_FAILURE, EXIT_SUCCESS,
};
use detach_core::transform::display_relative;
use detach_core::{
    CoreError, DependencyChange, DetachConfig, Detacher, MergedManifest, Progress,
    TransformPolicy,
};
use detach_project::{InstalledPackages, ProjectLayout};
use detach_runtime::{
    check_install_prereqs, GitWorkingTree, PackageInstaller, PackageManager, Prompter,
    RuntimeError, SystemInstaller, TerminalPrompter,
};
use detach_schema::PackageName;
use std::path::{Path, PathBuf};
use tracing::info;

const CONFIRM_QUESTION: &str = "Are you sure you want to eject? This action is permanent.";

#[derive(Debug, Clone)]
pub struct EjectOptions {
    pub app: PathBuf,
    pub tool: String,
    pub tool_root: Option<PathBuf>,
    pub yes: bool,
    pub package_manager: Option<PackageManager>,
    pub skip_commands: Vec<String>,
    pub install: bool,
}

/// Stands in for the package manager when `--no-install` is given.
struct SkipInstall;

impl PackageInstaller for SkipInstall {
    fn install(&self, manager: PackageManager, app_root: &Path) -> Result<(), RuntimeError> {
        info!("skipping {manager} install in {}", app_root.display());
        Ok(())
    }
}

fn build_config(opts: &EjectOptions) -> DetachConfig {
    let tool = PackageName::new(opts.tool.as_str());
    let layout = match &opts.tool_root {
        Some(root) => ProjectLayout::with_tool_root(&opts.app, root),
        None => ProjectLayout::new(&opts.app, &tool),
    };
    let mut config = DetachConfig::new(layout, tool);
    if let Some(manager) = opts.package_manager {
        config = config.with_package_manager(manager);
    }
    if !opts.skip_commands.is_empty() {
        config = config.with_skip_commands(opts.skip_commands.clone());
    }
    config
}

fn confirmed(opts: &EjectOptions, prompter: &dyn Prompter) -> Result<bool, String> {
    if opts.yes {
        return Ok(true);
    }
    if !prompter.is_interactive() {
        return Err(
            "refusing to eject without confirmation: stdin is not a TTY (pass --yes)".to_owned(),
        );
    }
    prompter
        .confirm(CONFIRM_QUESTION, false)
        .map_err(|e| e.to_string())
}

fn print_merged(merged: &MergedManifest) {
    println!("{}", cyan("Updating the dependencies"));
    for change in &merged.dependencies.changes {
        match change {
            DependencyChange::Removed { section, name } => {
                println!("  Removing {} from {section}", cyan(name));
            }
            DependencyChange::Added { name, .. } => {
                println!("  Adding {} to devDependencies", cyan(name));
            }
        }
    }
    println!();

    println!("{}", cyan("Updating the scripts"));
    for rewrite in &merged.scripts.rewrites {
        println!(
            "  Replacing {} with {}",
            cyan(&format!("\"{}\"", rewrite.before)),
            cyan(&format!("\"{}\"", rewrite.after))
        );
    }
    for stale in &merged.scripts.stale {
        println!(
            "  {} script {} still runs {}, which is removed with the tool",
            yellow_bold("Warning:"),
            cyan(&format!("\"{}\"", stale.script)),
            cyan(&stale.command)
        );
    }
    println!();

    println!("{}", cyan("Configuring package.json"));
    println!("  Adding {} configuration", cyan("Jest"));
    if merged.directories_reset {
        println!(
            "  Resetting {} in package.json {} to default",
            cyan("config"),
            cyan("directories")
        );
    }
    println!();
}

fn print_progress(progress: Progress<'_>, app_root: &Path) {
    match progress {
        Progress::Planned => {
            println!("Ejecting...");
            println!();
            println!("{}", cyan(&format!("Copying files into {}", app_root.display())));
        }
        Progress::FilesCopied(files) => {
            for record in files.iter().filter(|r| r.policy != TransformPolicy::Excluded) {
                println!(
                    "  Adding {} to the project",
                    cyan(&format!("/{}", display_relative(&record.relative)))
                );
            }
            println!();
        }
        Progress::ManifestMerged(merged) => print_merged(merged),
        Progress::Reinstalling(PackageManager::Yarn) => println!("{}", cyan("Running yarn...")),
        Progress::Reinstalling(PackageManager::Npm) => {
            println!("{}", cyan("Running npm install..."));
        }
    }
}

pub fn run(opts: &EjectOptions, json: bool) -> Result<u8, String> {
    let config = build_config(opts);
    if opts.install {
        require_prereqs(|| check_install_prereqs(config.package_manager))?;
    }

    let repo = InstalledPackages::new(&config.layout);
    let installer: &dyn PackageInstaller = if opts.install {
        &SystemInstaller
    } else {
        &SkipInstall
    };
    let mut detacher = Detacher::new(config, &repo, installer);

    if !confirmed(opts, &TerminalPrompter)? {
        detacher.abort().map_err(|e| e.to_string())?;
        println!("{}", cyan("Close one! Eject aborted."));
        return Ok(EXIT_FAILURE);
    }

    let app_root = opts.app.clone();
    let mut on_progress = |progress: Progress<'_>| {
        if !json {
            print_progress(progress, &app_root);
        }
    };
    match detacher.run(&GitWorkingTree, &mut on_progress) {
        Ok(report) => {
            if json {
                println!("{}", json_pretty(&report)?);
            } else {
                for failure in &report.cleanup.failures {
                    println!("  could not remove {failure}");
                }
                println!("{}", green("Ejected successfully!"));
                println!();
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e @ (CoreError::UncommittedChanges(_) | CoreError::DestinationExists(_))) => {
            Err(red(&e.to_string()))
        }
        Err(e) => Err(e.to_string()),
    }
}
