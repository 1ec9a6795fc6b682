use detach_schema::{PackageName, MANIFEST_FILE};
use std::path::{Path, PathBuf};

const NODE_MODULES: &str = "node_modules";
const YARN_LOCK: &str = "yarn.lock";

/// Directory layout of a host project and the tool package installed in it.
///
/// Only computes paths; nothing is created or checked on construction.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    app_root: PathBuf,
    tool_root: PathBuf,
}

impl ProjectLayout {
    /// Layout with the tool installed at `node_modules/<tool>` under the host root.
    pub fn new(app_root: impl Into<PathBuf>, tool: &PackageName) -> Self {
        let app_root: PathBuf = app_root.into();
        let tool_root = package_dir(&app_root.join(NODE_MODULES), tool);
        Self {
            app_root,
            tool_root,
        }
    }

    pub fn with_tool_root(app_root: impl Into<PathBuf>, tool_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: app_root.into(),
            tool_root: tool_root.into(),
        }
    }

    #[inline]
    pub fn app_root(&self) -> &Path {
        &self.app_root
    }

    #[inline]
    pub fn tool_root(&self) -> &Path {
        &self.tool_root
    }

    #[inline]
    pub fn manifest_path(&self) -> PathBuf {
        self.app_root.join(MANIFEST_FILE)
    }

    #[inline]
    pub fn tool_manifest_path(&self) -> PathBuf {
        self.tool_root.join(MANIFEST_FILE)
    }

    #[inline]
    pub fn node_modules_dir(&self) -> PathBuf {
        self.app_root.join(NODE_MODULES)
    }

    #[inline]
    pub fn bin_dir(&self) -> PathBuf {
        self.node_modules_dir().join(".bin")
    }

    #[inline]
    pub fn bin_shim(&self, command: &str) -> PathBuf {
        self.bin_dir().join(command)
    }

    #[inline]
    pub fn yarn_lock(&self) -> PathBuf {
        self.app_root.join(YARN_LOCK)
    }

    /// Host-relative path inside the project root.
    #[inline]
    pub fn app_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.app_root.join(relative)
    }

    /// Tool-relative path inside the tool package.
    #[inline]
    pub fn tool_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.tool_root.join(relative)
    }

    /// The tool package lives inside the host project, so removing it cannot
    /// touch anything the host does not own.
    pub fn tool_inside_app(&self) -> bool {
        self.tool_root.starts_with(&self.app_root) && self.tool_root != self.app_root
    }

    // Dev-server paths.

    #[inline]
    pub fn app_html(&self) -> PathBuf {
        self.app_root.join("public").join("index.html")
    }

    #[inline]
    pub fn app_build(&self) -> PathBuf {
        self.app_root.join("build")
    }

    #[inline]
    pub fn docs_entry(&self) -> PathBuf {
        self.app_root.join("docs").join("index.js")
    }

    #[inline]
    pub fn docs_public(&self) -> PathBuf {
        self.app_root.join("docs").join("public")
    }

    #[inline]
    pub fn docs_build(&self) -> PathBuf {
        self.app_root.join("docs").join("build")
    }

    #[inline]
    pub fn stories_entry(&self) -> PathBuf {
        self.app_root.join("stories").join("index.js")
    }

    #[inline]
    pub fn stories_build(&self) -> PathBuf {
        self.app_root.join("stories").join("build")
    }

    #[inline]
    pub fn setup_tests(&self) -> PathBuf {
        self.app_root.join("src").join("setupTests.js")
    }
}

/// Directory of an installed package below a `node_modules` folder.
pub fn package_dir(node_modules: &Path, package: &PackageName) -> PathBuf {
    package
        .segments()
        .fold(node_modules.to_path_buf(), |dir, seg| dir.join(seg))
}
