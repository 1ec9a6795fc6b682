pub mod completions;
pub mod eject;
pub mod man_pages;
pub mod start;

use console::Style;
use detach_runtime::{format_missing, MissingPrereq};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

/// Set to `1` to skip the prerequisite check before running external tools.
pub const SKIP_PREREQS_VAR: &str = "DETACH_SKIP_PREREQS";

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        style("{spinner:.cyan} {msg}")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(style("{msg}"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(style("{msg}"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn cyan(text: &str) -> String {
    Style::new().cyan().apply_to(text).to_string()
}

pub fn green(text: &str) -> String {
    Style::new().green().apply_to(text).to_string()
}

pub fn red(text: &str) -> String {
    Style::new().red().apply_to(text).to_string()
}

pub fn yellow_bold(text: &str) -> String {
    Style::new().yellow().bold().apply_to(text).to_string()
}

/// Fail with install hints unless the check is disabled or nothing is missing.
pub fn require_prereqs(check: impl FnOnce() -> Vec<MissingPrereq>) -> Result<(), String> {
    if std::env::var(SKIP_PREREQS_VAR).as_deref() == Ok("1") {
        return Ok(());
    }
    let missing = check();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(format_missing(&missing))
    }
}
