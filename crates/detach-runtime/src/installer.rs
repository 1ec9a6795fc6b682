use crate::{check_status, RuntimeError};
use detach_project::ProjectLayout;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Package manager used to reinstall the host project's dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Yarn,
}

impl PackageManager {
    /// Yarn when the project carries a `yarn.lock`, npm otherwise.
    pub fn detect(layout: &ProjectLayout) -> Self {
        if layout.yarn_lock().exists() {
            PackageManager::Yarn
        } else {
            PackageManager::Npm
        }
    }

    pub fn program(self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarnpkg",
        }
    }

    pub fn install_args(self, app_root: &Path) -> Vec<String> {
        match self {
            PackageManager::Npm => vec![
                "install".to_owned(),
                "--loglevel".to_owned(),
                "error".to_owned(),
            ],
            PackageManager::Yarn => vec![
                "--cwd".to_owned(),
                app_root.to_string_lossy().into_owned(),
            ],
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageManager::Npm => write!(f, "npm"),
            PackageManager::Yarn => write!(f, "yarn"),
        }
    }
}

impl std::str::FromStr for PackageManager {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "npm" => Ok(PackageManager::Npm),
            "yarn" | "yarnpkg" => Ok(PackageManager::Yarn),
            other => Err(format!("unknown package manager '{other}' (expected: npm, yarn)")),
        }
    }
}

/// Reinstalls a project's dependencies.
pub trait PackageInstaller {
    fn install(&self, manager: PackageManager, app_root: &Path) -> Result<(), RuntimeError>;
}

/// Spawns the package manager with inherited standard streams and waits for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInstaller;

impl PackageInstaller for SystemInstaller {
    fn install(&self, manager: PackageManager, app_root: &Path) -> Result<(), RuntimeError> {
        let program = manager.program();
        let args = manager.install_args(app_root);
        info!("running {program} {}", args.join(" "));
        let status = Command::new(program)
            .args(&args)
            .current_dir(app_root)
            .status()?;
        check_status(program, status)
    }
}

/// Keeps a copy of a `.cmd` shim that yarn may delete while it is still
/// executing on Windows, and writes it back afterwards.
#[derive(Debug)]
pub struct ShimGuard {
    path: PathBuf,
    content: Option<Vec<u8>>,
}

impl ShimGuard {
    pub fn capture(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let content = fs::read(&path).ok();
        Self { path, content }
    }

    /// Restore the shim if it disappeared. Failures are ignored.
    pub fn restore(self) -> bool {
        let Some(content) = self.content else {
            return false;
        };
        if self.path.exists() {
            return false;
        }
        match fs::write(&self.path, content) {
            Ok(()) => true,
            Err(e) => {
                debug!("could not restore {}: {e}", self.path.display());
                false
            }
        }
    }
}
