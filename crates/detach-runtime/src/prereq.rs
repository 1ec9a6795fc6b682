use crate::installer::PackageManager;
use std::fmt;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: &'static str,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(name: &str) -> bool {
    let locator = if cfg!(windows) { "where" } else { "which" };
    Command::new(locator)
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check the tools needed to reinstall dependencies after detaching.
pub fn check_install_prereqs(manager: PackageManager) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    match manager {
        PackageManager::Npm if !command_exists("npm") => missing.push(MissingPrereq {
            name: "npm",
            purpose: "reinstalling the project's dependencies",
            install_hint: "https://nodejs.org (npm ships with Node.js)",
        }),
        PackageManager::Yarn if !command_exists("yarnpkg") => missing.push(MissingPrereq {
            name: "yarnpkg",
            purpose: "reinstalling the project's dependencies (yarn.lock present)",
            install_hint: "npm install --global yarn | corepack enable",
        }),
        _ => {}
    }

    missing
}

/// Check the tools needed to run the development server.
pub fn check_start_prereqs() -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if !command_exists("node") {
        missing.push(MissingPrereq {
            name: "node",
            purpose: "running the bundler dev server",
            install_hint: "https://nodejs.org | apt install nodejs | brew install node",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nSet DETACH_SKIP_PREREQS=1 to skip this check.");
    msg
}
