use super::{
    cyan, json_pretty, red, require_prereqs, spin_fail, spin_ok, spinner, yellow_bold,
    EXIT_FAILURE, EXIT_SUCCESS,
};
use detach_core::{DevServer, DevServerConfig, StartOutcome};
use detach_project::ProjectLayout;
use detach_runtime::{
    check_start_prereqs, CommandBundler, SystemBrowser, SystemPortScanner, TerminalPrompter,
};
use detach_schema::PackageName;
use std::path::PathBuf;

/// Bundler entry point inside the tool package, run with `node`.
const TOOL_DEV_SCRIPT: &str = "scripts/utils/build-common.js";

#[derive(Debug, Clone)]
pub struct StartOptions {
    pub app: PathBuf,
    pub tool: String,
    /// Dev-server command line; empty runs the tool's own script with `node`.
    pub bundler: Vec<String>,
}

fn bundler_for(opts: &StartOptions, layout: &ProjectLayout) -> CommandBundler {
    match opts.bundler.split_first() {
        Some((program, args)) => CommandBundler::new(program.as_str(), args.to_vec()),
        None => CommandBundler::new(
            "node",
            vec![
                layout.tool_path(TOOL_DEV_SCRIPT).to_string_lossy().into_owned(),
                "dev".to_owned(),
            ],
        ),
    }
}

fn print_host_notice(config: &DevServerConfig) {
    println!(
        "{}",
        cyan(&format!(
            "Attempting to bind to HOST environment variable: {}",
            yellow_bold(&config.host)
        ))
    );
    println!("If this was unintentional, check that you haven't mistakenly set it in your shell.");
    println!();
}

pub fn run(opts: &StartOptions, json: bool) -> Result<u8, String> {
    let layout = ProjectLayout::new(&opts.app, &PackageName::new(opts.tool.as_str()));
    let config = DevServerConfig::from_vars(std::env::vars());
    let bundler = bundler_for(opts, &layout);
    if bundler.program() == "node" {
        require_prereqs(check_start_prereqs)?;
    }

    if config.host_overridden && !json {
        print_host_notice(&config);
    }

    let browser = SystemBrowser::new(config.browser.clone());
    let server = DevServer::new(
        layout,
        config,
        &SystemPortScanner,
        &TerminalPrompter,
        &bundler,
        &browser,
    );

    let pb = if json {
        None
    } else {
        Some(spinner("Starting the development server..."))
    };
    let mut on_ready = |url: &str| {
        if let Some(ref pb) = pb {
            spin_ok(pb, &format!("Started the development server at {url}"));
        }
    };

    match server.start(&mut on_ready) {
        Ok(outcome) => {
            if let Some(ref pb) = pb {
                if !pb.is_finished() {
                    pb.finish_and_clear();
                }
            }
            if json {
                println!("{}", json_pretty(&outcome)?);
            }
            match outcome {
                StartOutcome::PortConflict { port } => {
                    if !json {
                        println!(
                            "{}",
                            red(&format!("Something is already running on port {port}."))
                        );
                    }
                    Ok(EXIT_FAILURE)
                }
                StartOutcome::Served { .. } | StartOutcome::Declined => Ok(EXIT_SUCCESS),
            }
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "Failed during development hosting");
            }
            Err(e.to_string())
        }
    }
}
