use crate::RuntimeError;
use std::net::TcpListener;
use std::process::{Command, Stdio};

/// How many ports above the preferred one are tried before asking the OS.
const SCAN_WIDTH: u16 = 100;

/// Finds listening ports for the dev server.
pub trait PortScanner {
    /// `preferred` when it is free, otherwise some other free port.
    fn available_port(&self, host: &str, preferred: u16) -> Result<u16, RuntimeError>;

    /// Human-readable description of the process listening on `port`, if known.
    fn process_for_port(&self, port: u16) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPortScanner;

fn is_free(host: &str, port: u16) -> bool {
    TcpListener::bind((host, port)).is_ok()
}

impl PortScanner for SystemPortScanner {
    fn available_port(&self, host: &str, preferred: u16) -> Result<u16, RuntimeError> {
        if is_free(host, preferred) {
            return Ok(preferred);
        }
        let upper = preferred.saturating_add(SCAN_WIDTH);
        if let Some(port) = (preferred.saturating_add(1)..=upper).find(|p| is_free(host, *p)) {
            return Ok(port);
        }
        let listener =
            TcpListener::bind((host, 0)).map_err(|_| RuntimeError::NoFreePort(preferred))?;
        Ok(listener.local_addr()?.port())
    }

    fn process_for_port(&self, port: u16) -> Option<String> {
        let pid = run_capture("lsof", &[&format!("-i:{port}"), "-P", "-t", "-sTCP:LISTEN"])?;
        let pid = pid.lines().next()?.trim().to_owned();
        let command = run_capture("ps", &["-o", "command=", "-p", &pid])?;
        Some(format!("{} (pid {pid})", command.trim()))
    }
}

fn run_capture(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    (!text.is_empty()).then_some(text)
}
