//! Dev-server bootstrap for a project that is still attached to the tool.
//!
//! Checks the project, settles on a port, clears stale build output and hands
//! over to the bundler. The browser is opened once the bundler reports that
//! the server accepts connections.

use crate::config::DevServerConfig;
use crate::CoreError;
use detach_project::{write_manifest, ProjectLayout};
use detach_runtime::{Browser, Bundler, PortScanner, Prompter, ServeRequest};
use detach_schema::parse_manifest_file;
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Files that carry a browserslist configuration next to the manifest.
const BROWSERSLIST_FILES: [&str; 2] = [".browserslistrc", "browserslist"];

const DEFAULT_PRODUCTION_BROWSERS: [&str; 3] = [">0.2%", "not dead", "not op_mini all"];
const DEFAULT_DEVELOPMENT_BROWSERS: [&str; 3] = [
    "last 1 chrome version",
    "last 1 firefox version",
    "last 1 safari version",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectShape {
    Application,
    /// Component library with a documentation site under `docs/`.
    ComponentDocs,
}

impl ProjectShape {
    pub fn detect(layout: &ProjectLayout) -> Self {
        if layout.docs_entry().is_file() {
            ProjectShape::ComponentDocs
        } else {
            ProjectShape::Application
        }
    }

    pub fn target_dir(self, layout: &ProjectLayout) -> PathBuf {
        match self {
            ProjectShape::Application => layout.app_build(),
            ProjectShape::ComponentDocs => layout.docs_build(),
        }
    }

    pub fn static_dir(self, layout: &ProjectLayout) -> Option<PathBuf> {
        match self {
            ProjectShape::Application => None,
            ProjectShape::ComponentDocs => Some(layout.docs_public()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDecision {
    Use(u16),
    /// The user chose not to move to another port.
    Declined,
    /// The preferred port is taken and nobody can be asked.
    Conflict(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOutcome {
    Served {
        port: u16,
        url: String,
        shape: ProjectShape,
        browser_opened: bool,
    },
    Declined,
    PortConflict {
        port: u16,
    },
}

/// Fail unless the files the shape needs are present.
pub fn check_required_files(layout: &ProjectLayout, shape: ProjectShape) -> Result<(), CoreError> {
    if shape == ProjectShape::Application {
        let html = layout.app_html();
        if !html.is_file() {
            return Err(CoreError::MissingRequiredFile(html));
        }
    }
    Ok(())
}

/// Make sure the project declares its target browsers.
///
/// When none are declared an interactive user is offered the defaults, which
/// are then written to the manifest. Returns whether defaults were added.
pub fn check_browsers(layout: &ProjectLayout, prompter: &dyn Prompter) -> Result<bool, CoreError> {
    let mut manifest = parse_manifest_file(layout.manifest_path())?;
    let declared = manifest.get("browserslist").is_some()
        || BROWSERSLIST_FILES
            .iter()
            .any(|name| layout.app_path(name).is_file());
    if declared {
        return Ok(false);
    }

    if !prompter.is_interactive() {
        return Err(CoreError::BrowserTargetsMissing);
    }
    let question = "We're unable to detect target browsers.\n\n\
                    Would you like to add the defaults to your package.json?";
    if !prompter.confirm(question, true)? {
        return Err(CoreError::BrowserTargetsMissing);
    }

    manifest.insert(
        "browserslist",
        json!({
            "production": DEFAULT_PRODUCTION_BROWSERS,
            "development": DEFAULT_DEVELOPMENT_BROWSERS,
        }),
    );
    write_manifest(&layout.manifest_path(), &manifest)?;
    info!("added default browserslist to {}", layout.manifest_path().display());
    Ok(true)
}

/// Settle on a port, asking before moving off the preferred one.
pub fn negotiate_port(
    config: &DevServerConfig,
    scanner: &dyn PortScanner,
    prompter: &dyn Prompter,
) -> Result<PortDecision, CoreError> {
    let port = scanner.available_port(&config.host, config.port)?;
    if port == config.port {
        return Ok(PortDecision::Use(port));
    }
    if !prompter.is_interactive() {
        return Ok(PortDecision::Conflict(config.port));
    }

    let mut question = format!("Something is already running on port {}.", config.port);
    if let Some(process) = scanner.process_for_port(config.port) {
        question.push_str(&format!(" Probably:\n  {process}"));
    }
    question.push_str("\n\nWould you like to run the app on another port instead?");

    if prompter.confirm(&question, true)? {
        Ok(PortDecision::Use(port))
    } else {
        Ok(PortDecision::Declined)
    }
}

/// Remove everything inside `dir`, creating it if missing.
pub fn empty_dir(dir: &Path) -> io::Result<()> {
    if !dir.exists() {
        return fs::create_dir_all(dir);
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

pub struct DevServer<'a> {
    layout: ProjectLayout,
    config: DevServerConfig,
    scanner: &'a dyn PortScanner,
    prompter: &'a dyn Prompter,
    bundler: &'a dyn Bundler,
    browser: &'a dyn Browser,
}

impl<'a> DevServer<'a> {
    pub fn new(
        layout: ProjectLayout,
        config: DevServerConfig,
        scanner: &'a dyn PortScanner,
        prompter: &'a dyn Prompter,
        bundler: &'a dyn Bundler,
        browser: &'a dyn Browser,
    ) -> Self {
        Self {
            layout,
            config,
            scanner,
            prompter,
            bundler,
            browser,
        }
    }

    pub fn config(&self) -> &DevServerConfig {
        &self.config
    }

    /// Run the dev server until it exits. `on_ready` receives the URL once the
    /// server accepts connections, before the browser is opened.
    pub fn start(&self, on_ready: &mut dyn FnMut(&str)) -> Result<StartOutcome, CoreError> {
        let shape = ProjectShape::detect(&self.layout);
        debug!("project shape: {shape:?}");
        check_required_files(&self.layout, shape)?;
        check_browsers(&self.layout, self.prompter)?;

        let port = match negotiate_port(&self.config, self.scanner, self.prompter)? {
            PortDecision::Use(port) => port,
            PortDecision::Declined => return Ok(StartOutcome::Declined),
            PortDecision::Conflict(port) => return Ok(StartOutcome::PortConflict { port }),
        };

        empty_dir(&self.layout.app_build())?;
        if self.layout.stories_entry().is_file() {
            empty_dir(&self.layout.stories_build())?;
        }
        let target_dir = shape.target_dir(&self.layout);
        empty_dir(&target_dir)?;

        let request = ServeRequest {
            app_root: self.layout.app_root().to_path_buf(),
            port,
            host: self.config.host.clone(),
            https: self.config.https,
            component_docs: shape == ProjectShape::ComponentDocs,
            target_dir,
            static_dir: shape.static_dir(&self.layout),
        };
        let url = self.config.url(port);
        info!("starting dev server on {url}");

        let mut browser_opened = false;
        let mut ready = || {
            on_ready(&url);
            browser_opened = self.browser.open(&url);
        };
        self.bundler.serve(&request, &mut ready)?;

        Ok(StartOutcome::Served {
            port,
            url,
            shape,
            browser_opened,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detach_runtime::{RuntimeError, ScriptedPrompter};
    use detach_schema::PackageName;
    use std::cell::{Cell, RefCell};

    struct FakeScanner {
        free: u16,
        calls: Cell<u32>,
    }

    impl FakeScanner {
        fn free(port: u16) -> Self {
            Self {
                free: port,
                calls: Cell::new(0),
            }
        }
    }

    impl PortScanner for FakeScanner {
        fn available_port(&self, _host: &str, _preferred: u16) -> Result<u16, RuntimeError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.free)
        }

        fn process_for_port(&self, _port: u16) -> Option<String> {
            Some("node server.js".to_owned())
        }
    }

    #[derive(Default)]
    struct FakeBundler {
        requests: RefCell<Vec<ServeRequest>>,
    }

    impl Bundler for FakeBundler {
        fn serve(
            &self,
            request: &ServeRequest,
            on_ready: &mut dyn FnMut(),
        ) -> Result<(), RuntimeError> {
            self.requests.borrow_mut().push(request.clone());
            on_ready();
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeBrowser {
        opened: RefCell<Vec<String>>,
    }

    impl Browser for FakeBrowser {
        fn open(&self, url: &str) -> bool {
            self.opened.borrow_mut().push(url.to_owned());
            true
        }
    }

    fn app(manifest: &str) -> (tempfile::TempDir, ProjectLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path(), &PackageName::new("toolpkg"));
        fs::create_dir_all(layout.app_path("public")).unwrap();
        fs::write(layout.app_html(), "<html></html>").unwrap();
        fs::write(layout.manifest_path(), manifest).unwrap();
        (dir, layout)
    }

    const WITH_BROWSERS: &str = r#"{"name": "app", "browserslist": [">0.2%"]}"#;

    #[test]
    fn non_interactive_port_conflict_never_serves() {
        let (_dir, layout) = app(WITH_BROWSERS);
        let scanner = FakeScanner::free(3001);
        let prompter = ScriptedPrompter::non_interactive();
        let bundler = FakeBundler::default();
        let browser = FakeBrowser::default();
        let server = DevServer::new(
            layout,
            DevServerConfig::default(),
            &scanner,
            &prompter,
            &bundler,
            &browser,
        );

        let outcome = server.start(&mut |_| {}).unwrap();
        assert_eq!(outcome, StartOutcome::PortConflict { port: 3000 });
        assert!(bundler.requests.borrow().is_empty());
        assert!(browser.opened.borrow().is_empty());
    }

    #[test]
    fn interactive_user_accepts_other_port() {
        let (_dir, layout) = app(WITH_BROWSERS);
        fs::create_dir_all(layout.app_build()).unwrap();
        fs::write(layout.app_build().join("stale.js"), "old").unwrap();
        let scanner = FakeScanner::free(3001);
        let prompter = ScriptedPrompter::interactive([true]);
        let bundler = FakeBundler::default();
        let browser = FakeBrowser::default();
        let server = DevServer::new(
            layout.clone(),
            DevServerConfig::default(),
            &scanner,
            &prompter,
            &bundler,
            &browser,
        );

        let mut ready_url = String::new();
        let outcome = server.start(&mut |url| ready_url = url.to_owned()).unwrap();
        assert_eq!(
            outcome,
            StartOutcome::Served {
                port: 3001,
                url: "http://localhost:3001/".to_owned(),
                shape: ProjectShape::Application,
                browser_opened: true,
            }
        );
        assert_eq!(ready_url, "http://localhost:3001/");
        assert!(prompter.asked()[0].contains("Probably:\n  node server.js"));
        assert!(!layout.app_build().join("stale.js").exists());
        let requests = bundler.requests.borrow();
        assert_eq!(requests[0].port, 3001);
        assert!(!requests[0].component_docs);
    }

    #[test]
    fn interactive_user_declines_other_port() {
        let (_dir, layout) = app(WITH_BROWSERS);
        let scanner = FakeScanner::free(3001);
        let prompter = ScriptedPrompter::interactive([false]);
        let bundler = FakeBundler::default();
        let browser = FakeBrowser::default();
        let server = DevServer::new(
            layout,
            DevServerConfig::default(),
            &scanner,
            &prompter,
            &bundler,
            &browser,
        );
        assert_eq!(server.start(&mut |_| {}).unwrap(), StartOutcome::Declined);
        assert!(bundler.requests.borrow().is_empty());
    }

    #[test]
    fn free_default_port_is_used_without_asking() {
        let scanner = FakeScanner::free(3000);
        let prompter = ScriptedPrompter::non_interactive();
        let decision = negotiate_port(&DevServerConfig::default(), &scanner, &prompter).unwrap();
        assert_eq!(decision, PortDecision::Use(3000));
        assert!(prompter.asked().is_empty());
    }

    #[test]
    fn browser_check_runs_before_port_negotiation() {
        let (_dir, layout) = app(r#"{"name": "app"}"#);
        let scanner = FakeScanner::free(3000);
        let prompter = ScriptedPrompter::non_interactive();
        let bundler = FakeBundler::default();
        let browser = FakeBrowser::default();
        let server = DevServer::new(
            layout,
            DevServerConfig::default(),
            &scanner,
            &prompter,
            &bundler,
            &browser,
        );
        let err = server.start(&mut |_| {}).unwrap_err();
        assert!(matches!(err, CoreError::BrowserTargetsMissing));
        assert_eq!(scanner.calls.get(), 0);
    }

    #[test]
    fn browserslist_file_counts_as_declared() {
        let (_dir, layout) = app(r#"{"name": "app"}"#);
        fs::write(layout.app_path(".browserslistrc"), "> 1%\n").unwrap();
        let prompter = ScriptedPrompter::non_interactive();
        assert!(!check_browsers(&layout, &prompter).unwrap());
    }

    #[test]
    fn accepted_defaults_are_written_back() {
        let (_dir, layout) = app(r#"{"name": "app"}"#);
        let prompter = ScriptedPrompter::interactive([true]);
        assert!(check_browsers(&layout, &prompter).unwrap());

        let manifest = parse_manifest_file(layout.manifest_path()).unwrap();
        let browsers = manifest.get("browserslist").unwrap();
        assert_eq!(browsers["production"][0], ">0.2%");
        assert_eq!(browsers["development"][2], "last 1 safari version");
    }

    #[test]
    fn application_requires_index_html() {
        let (_dir, layout) = app(WITH_BROWSERS);
        fs::remove_file(layout.app_html()).unwrap();
        let err = check_required_files(&layout, ProjectShape::Application).unwrap_err();
        assert!(matches!(err, CoreError::MissingRequiredFile(_)));
    }

    #[test]
    fn component_docs_build_into_docs_folder() {
        let (_dir, layout) = app(WITH_BROWSERS);
        fs::remove_file(layout.app_html()).unwrap();
        fs::create_dir_all(layout.app_path("docs")).unwrap();
        fs::write(layout.docs_entry(), "export default {};\n").unwrap();
        fs::create_dir_all(layout.app_path("stories")).unwrap();
        fs::write(layout.stories_entry(), "").unwrap();

        let scanner = FakeScanner::free(3000);
        let prompter = ScriptedPrompter::non_interactive();
        let bundler = FakeBundler::default();
        let browser = FakeBrowser::default();
        let server = DevServer::new(
            layout.clone(),
            DevServerConfig::default(),
            &scanner,
            &prompter,
            &bundler,
            &browser,
        );
        server.start(&mut |_| {}).unwrap();

        let requests = bundler.requests.borrow();
        assert!(requests[0].component_docs);
        assert_eq!(requests[0].target_dir, layout.docs_build());
        assert_eq!(requests[0].static_dir, Some(layout.docs_public()));
        assert!(layout.docs_build().is_dir());
        assert!(layout.stories_build().is_dir());
    }
}
