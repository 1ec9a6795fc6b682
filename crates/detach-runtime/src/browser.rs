use std::process::{Command, Stdio};
use tracing::debug;

/// Opens a URL for the user once the dev server is ready.
pub trait Browser {
    /// Returns whether a browser was launched.
    fn open(&self, url: &str) -> bool;
}

/// How `SystemBrowser` reaches a browser, from the `BROWSER` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Launch {
    Disabled,
    Platform,
    Program(String),
}

/// Launches the platform default browser, or the program named by the
/// `BROWSER` setting. The value `none` disables opening.
#[derive(Debug, Clone, Default)]
pub struct SystemBrowser {
    program: Option<String>,
}

impl SystemBrowser {
    pub fn new(program: Option<String>) -> Self {
        Self { program }
    }

    fn launch(&self) -> Launch {
        match self.program.as_deref() {
            None => Launch::Platform,
            Some(p) if p.eq_ignore_ascii_case("none") => Launch::Disabled,
            Some(p) => Launch::Program(p.to_owned()),
        }
    }
}

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> bool {
        let result = match self.launch() {
            Launch::Disabled => return false,
            Launch::Platform => webbrowser::open(url),
            Launch::Program(program) => Command::new(program)
                .arg(url)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map(|_| ()),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                debug!("could not open browser for {url}: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_disables_browser() {
        let browser = SystemBrowser::new(Some("None".to_owned()));
        assert_eq!(browser.launch(), Launch::Disabled);
        assert!(!browser.open("http://localhost:3000/"));
    }

    #[test]
    fn unset_uses_platform_default() {
        assert_eq!(SystemBrowser::new(None).launch(), Launch::Platform);
    }

    #[test]
    fn custom_program_is_named() {
        let browser = SystemBrowser::new(Some("firefox".to_owned()));
        assert_eq!(browser.launch(), Launch::Program("firefox".to_owned()));
    }

    #[test]
    fn missing_program_is_not_fatal() {
        let browser = SystemBrowser::new(Some("definitely-not-a-browser-xyz".to_owned()));
        assert!(!browser.open("http://localhost:3000/"));
    }
}
