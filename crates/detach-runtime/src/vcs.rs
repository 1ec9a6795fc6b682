use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Reports uncommitted or untracked paths in a working tree.
pub trait WorkingTree {
    /// Paths with pending changes. Empty means clean (or not under version control).
    fn uncommitted_changes(&self, dir: &Path) -> Vec<String>;
}

/// `git status --porcelain` in the project directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitWorkingTree;

impl WorkingTree for GitWorkingTree {
    fn uncommitted_changes(&self, dir: &Path) -> Vec<String> {
        let output = Command::new("git")
            .args(["status", "--porcelain"])
            .current_dir(dir)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();
        match output {
            Ok(o) if o.status.success() => parse_porcelain(&String::from_utf8_lossy(&o.stdout)),
            Ok(o) => {
                debug!("git status exited with {}; treating tree as clean", o.status);
                Vec::new()
            }
            Err(e) => {
                debug!("git status unavailable ({e}); treating tree as clean");
                Vec::new()
            }
        }
    }
}

/// Strip the two-column status prefix from each porcelain line.
pub fn parse_porcelain(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.get(2..)
                .map_or_else(|| line.trim(), str::trim)
                .to_owned()
        })
        .collect()
}
