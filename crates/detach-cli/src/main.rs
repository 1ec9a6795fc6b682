mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::eject::EjectOptions;
use commands::start::StartOptions;
use detach_core::config::DEFAULT_TOOL;
use detach_runtime::PackageManager;
use std::path::PathBuf;
use std::process::ExitCode;


#[derive(Debug, Parser)]
#[command(
    name = "detach",
    version,
    about = "Permanently inline shared front-end build tooling into a project"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Copy the tool's configuration and scripts into the project and drop the tool.
    Eject {
        /// Project root containing package.json.
        #[arg(long, default_value = ".")]
        app: PathBuf,
        /// Name of the installed tooling package.
        #[arg(long, default_value = DEFAULT_TOOL)]
        tool: String,
        /// Tool package directory, when it is not under the project's node_modules.
        #[arg(long)]
        tool_root: Option<PathBuf>,
        /// Skip the confirmation prompt.
        #[arg(short, long, default_value_t = false)]
        yes: bool,
        /// Package manager used to reinstall (npm or yarn). Detected from yarn.lock by default.
        #[arg(long)]
        package_manager: Option<PackageManager>,
        /// `bin` alias left untouched in scripts (repeatable). Defaults to react-scripts.
        #[arg(long = "skip-command")]
        skip_commands: Vec<String>,
        /// Do not run the package manager after rewriting package.json.
        #[arg(long, default_value_t = false)]
        no_install: bool,
    },
    /// Start the development server for a project that still uses the tool.
    Start {
        /// Project root containing package.json.
        #[arg(long, default_value = ".")]
        app: PathBuf,
        /// Name of the installed tooling package.
        #[arg(long, default_value = DEFAULT_TOOL)]
        tool: String,
        /// Dev-server command and arguments (after --). Defaults to the tool's bundler script.
        #[arg(last = true)]
        bundler: Vec<String>,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("DETACH_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;

    let result = match cli.command {
        Commands::Eject {
            app,
            tool,
            tool_root,
            yes,
            package_manager,
            skip_commands,
            no_install,
        } => commands::eject::run(
            &EjectOptions {
                app,
                tool,
                tool_root,
                yes,
                package_manager,
                skip_commands,
                install: !no_install,
            },
            json_output,
        ),
        Commands::Start { app, tool, bundler } => {
            commands::start::run(&StartOptions { app, tool, bundler }, json_output)
        }
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(commands::EXIT_FAILURE)
        }
    }
}
