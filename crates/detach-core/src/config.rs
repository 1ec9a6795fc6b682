//! Run configuration, built once at the entry point and passed down.

use detach_project::ProjectLayout;
use detach_runtime::PackageManager;
use detach_schema::PackageName;

/// Tooling package detached when none is named.
pub const DEFAULT_TOOL: &str = "fuse-box-react-scripts";

/// Umbrella command of the upstream scripts package. Only its extended forms
/// are rewritten in the host's scripts.
pub const DEFAULT_SKIPPED_COMMAND: &str = "react-scripts";

/// Everything a detach run needs to know about the two packages involved.
#[derive(Debug, Clone)]
pub struct DetachConfig {
    pub layout: ProjectLayout,
    pub tool: PackageName,
    pub package_manager: PackageManager,
    /// `bin` commands never rewritten in host scripts.
    pub skip_commands: Vec<String>,
    /// Project-relative source folders handed to the generated test config.
    pub src_paths: Vec<String>,
}

impl DetachConfig {
    /// Configuration for a tool installed under the host's `node_modules`.
    pub fn new(layout: ProjectLayout, tool: PackageName) -> Self {
        let package_manager = PackageManager::detect(&layout);
        Self {
            layout,
            tool,
            package_manager,
            skip_commands: vec![DEFAULT_SKIPPED_COMMAND.to_owned()],
            src_paths: vec!["src".to_owned()],
        }
    }

    #[must_use]
    pub fn with_package_manager(mut self, manager: PackageManager) -> Self {
        self.package_manager = manager;
        self
    }

    /// Commands left out of script rewriting. The tool's own command is
    /// always rewritten, since its shim is removed with the tool.
    pub fn commands_to_skip(&self) -> Vec<String> {
        self.skip_commands
            .iter()
            .filter(|c| c.as_str() != self.tool.as_str())
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn with_skip_commands(mut self, commands: Vec<String>) -> Self {
        self.skip_commands = commands;
        self
    }
}

/// Dev-server settings from the `PORT`, `HOST`, `HTTPS` and `BROWSER` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevServerConfig {
    pub port: u16,
    pub host: String,
    /// `HOST` was set explicitly.
    pub host_overridden: bool,
    pub https: bool,
    pub browser: Option<String>,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            port: Self::DEFAULT_PORT,
            host: Self::DEFAULT_HOST.to_owned(),
            host_overridden: false,
            https: false,
            browser: None,
        }
    }
}

impl DevServerConfig {
    pub const DEFAULT_PORT: u16 = 3000;
    pub const DEFAULT_HOST: &'static str = "0.0.0.0";

    /// Read the settings from `(name, value)` pairs such as `std::env::vars()`.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let value: String = value.into();
            match key.as_ref() {
                "PORT" => {
                    if let Ok(port) = value.trim().parse::<u16>() {
                        if port != 0 {
                            config.port = port;
                        }
                    }
                }
                "HOST" if !value.is_empty() => {
                    config.host = value;
                    config.host_overridden = true;
                }
                "HTTPS" => config.https = value == "true",
                "BROWSER" if !value.is_empty() => config.browser = Some(value),
                _ => {}
            }
        }
        config
    }

    pub fn protocol(&self) -> &'static str {
        if self.https {
            "https"
        } else {
            "http"
        }
    }

    /// Host shown in the browser URL: the override, or `localhost`.
    pub fn url_host(&self) -> &str {
        if self.host_overridden {
            &self.host
        } else {
            "localhost"
        }
    }

    pub fn url(&self, port: u16) -> String {
        format!("{}://{}:{port}/", self.protocol(), self.url_host())
    }
}
