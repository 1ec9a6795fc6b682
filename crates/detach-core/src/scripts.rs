use crate::CoreError;
use detach_schema::PackageManifest;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

/// Script entry removed outright once the project is detached.
pub const EJECT_SCRIPT: &str = "eject";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptRewrite {
    pub script: String,
    pub command: String,
    pub before: String,
    pub after: String,
}

/// A script that still invokes one of the tool's commands after rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleScript {
    pub script: String,
    pub command: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptReport {
    pub removed_eject: bool,
    pub rewrites: Vec<ScriptRewrite>,
    /// Invocations left behind by skipped commands. Their `bin` shims are
    /// removed with the tool, so these scripts need a manual fix.
    pub stale: Vec<StaleScript>,
}

/// Replace every `<command> <word>` in `script` with `node scripts/<word>.js`.
///
/// Returns `None` when the command does not occur in the script.
pub fn rewrite_command(script: &str, command: &str) -> Result<Option<String>, CoreError> {
    let pattern = Regex::new(&format!("{} ([A-Za-z0-9_]+)", regex::escape(command)))?;
    if !pattern.is_match(script) {
        return Ok(None);
    }
    Ok(Some(
        pattern
            .replace_all(script, "node scripts/${1}.js")
            .into_owned(),
    ))
}

/// Rewrite the host's scripts so they run the copied scripts directly.
///
/// Commands listed in `skip` are left alone; only their extended forms, which
/// appear as separate `bin` entries, are rewritten.
pub fn rewrite_scripts(
    host: &mut PackageManifest,
    commands: &[String],
    skip: &[String],
) -> Result<ScriptReport, CoreError> {
    let mut report = ScriptReport {
        removed_eject: host.remove_script(EJECT_SCRIPT).is_some(),
        ..ScriptReport::default()
    };

    for (script, original) in host.scripts()? {
        let mut current = original;
        for command in commands.iter().filter(|c| !skip.contains(c)) {
            let Some(rewritten) = rewrite_command(&current, command)? else {
                continue;
            };
            debug!("rewriting script {script}: {current:?} -> {rewritten:?}");
            report.rewrites.push(ScriptRewrite {
                script: script.clone(),
                command: command.clone(),
                before: current.clone(),
                after: rewritten.clone(),
            });
            current = rewritten;
        }
        for command in commands.iter().filter(|c| skip.contains(c)) {
            if rewrite_command(&current, command)?.is_some() {
                warn!("script {script} still runs {command}, which is removed with the tool");
                report.stale.push(StaleScript {
                    script: script.clone(),
                    command: command.clone(),
                });
            }
        }
        if report.rewrites.iter().any(|r| r.script == script) {
            host.set_script(&script, &current);
        }
    }
    Ok(report)
}
