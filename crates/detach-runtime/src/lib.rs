//! External collaborators for detach.
//!
//! Everything the core reaches outside the process for sits behind a trait
//! here: working-tree status (`WorkingTree`), package-manager reinstall
//! (`PackageInstaller`), port availability (`PortScanner`), the browser
//! (`Browser`), the bundler dev server (`Bundler`) and interactive confirmation
//! (`Prompter`). Each trait has a system implementation and, where tests need
//! one, a scripted stand-in.

pub mod browser;
pub mod bundler;
pub mod installer;
pub mod port;
pub mod prereq;
pub mod prompt;
pub mod vcs;

pub use browser::{Browser, SystemBrowser};
pub use bundler::{Bundler, CommandBundler, ServeRequest};
pub use installer::{PackageInstaller, PackageManager, ShimGuard, SystemInstaller};
pub use port::{PortScanner, SystemPortScanner};
pub use prereq::{check_install_prereqs, check_start_prereqs, format_missing, MissingPrereq};
pub use prompt::{Prompter, ScriptedPrompter, TerminalPrompter};
pub use vcs::{GitWorkingTree, WorkingTree};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("'{program}' exited with status {code}")]
    CommandFailed { program: String, code: i32 },
    #[error("'{0}' was terminated by a signal")]
    CommandKilled(String),
    #[error("prompt failed: {0}")]
    Prompt(String),
    #[error("interactive confirmation requires a terminal")]
    NotInteractive,
    #[error("no free port found near {0}")]
    NoFreePort(u16),
}

/// Map a finished child's status onto `CommandFailed` / `CommandKilled`.
pub(crate) fn check_status(
    program: &str,
    status: std::process::ExitStatus,
) -> Result<(), RuntimeError> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(RuntimeError::CommandFailed {
            program: program.to_owned(),
            code,
        }),
        None => Err(RuntimeError::CommandKilled(program.to_owned())),
    }
}
