use crate::{check_status, RuntimeError};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpStream};
use std::path::PathBuf;
use std::process::Command;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

const READY_POLL: Duration = Duration::from_millis(100);
const CONNECT_TIMEOUT: Duration = Duration::from_millis(200);

/// What the dev server should build and where it should listen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeRequest {
    pub app_root: PathBuf,
    pub port: u16,
    pub host: String,
    pub https: bool,
    /// Build the component documentation site instead of the application.
    pub component_docs: bool,
    pub target_dir: PathBuf,
    pub static_dir: Option<PathBuf>,
}

/// Starts the bundler in watch/serve mode.
pub trait Bundler {
    /// Run until the server stops. `on_ready` is called once, when the server
    /// first accepts connections.
    fn serve(
        &self,
        request: &ServeRequest,
        on_ready: &mut dyn FnMut(),
    ) -> Result<(), RuntimeError>;
}

/// Runs an external dev-server command and watches its port for readiness.
///
/// The request is handed to the command through `PORT`, `HOST`, `HTTPS`,
/// `DETACH_TARGET_DIR`, `DETACH_STATIC_DIR` and `DETACH_COMPONENT_DOCS`.
#[derive(Debug, Clone)]
pub struct CommandBundler {
    program: String,
    args: Vec<String>,
}

impl CommandBundler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, request: &ServeRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&request.app_root)
            .env("PORT", request.port.to_string())
            .env("HOST", &request.host)
            .env("HTTPS", if request.https { "true" } else { "false" })
            .env("DETACH_TARGET_DIR", &request.target_dir)
            .env(
                "DETACH_COMPONENT_DOCS",
                if request.component_docs { "true" } else { "false" },
            );
        if let Some(dir) = &request.static_dir {
            cmd.env("DETACH_STATIC_DIR", dir);
        }
        cmd
    }
}

fn bind_addr(request: &ServeRequest) -> SocketAddr {
    let ip = match request.host.parse::<IpAddr>() {
        Ok(ip) if !matches!(request.host.as_str(), "0.0.0.0" | "::") => ip,
        _ => IpAddr::V4(Ipv4Addr::LOCALHOST),
    };
    SocketAddr::new(ip, request.port)
}

impl Bundler for CommandBundler {
    fn serve(
        &self,
        request: &ServeRequest,
        on_ready: &mut dyn FnMut(),
    ) -> Result<(), RuntimeError> {
        info!("starting {} on port {}", self.program, request.port);
        let mut child = self.command(request).spawn()?;
        let addr = bind_addr(request);

        loop {
            if let Some(status) = child.try_wait()? {
                debug!("dev server exited before accepting connections");
                return check_status(&self.program, status);
            }
            if TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).is_ok() {
                break;
            }
            thread::sleep(READY_POLL);
        }

        on_ready();
        let status = child.wait()?;
        check_status(&self.program, status)
    }
}
