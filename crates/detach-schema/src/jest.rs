//! Test-runner configuration block written under `jest` when a project detaches.
//!
//! While attached, the tool package resolves these paths inside itself. After
//! detachment every transform and setup file lives in the project's own
//! `config/` folder, so paths are expressed relative to `<rootDir>`.

use serde_json::{json, Map, Value};

const ROOT_DIR: &str = "<rootDir>";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestRunnerOptions {
    /// Explicit `rootDir`; omitted from the block when `None`.
    pub root_dir: Option<String>,
    /// Project-relative source folders searched for tests (`src` when empty).
    pub src_paths: Vec<String>,
    /// Whether `src/setupTests.js` exists in the project.
    pub setup_tests: bool,
}

fn root_relative(path: &str) -> String {
    let trimmed = path.trim_start_matches("./").trim_start_matches('/');
    format!("{ROOT_DIR}/{trimmed}")
}

/// Build the `jest` configuration object for a detached project.
pub fn test_runner_config(options: &TestRunnerOptions) -> Value {
    let src_paths: Vec<&str> = if options.src_paths.is_empty() {
        vec!["src"]
    } else {
        options.src_paths.iter().map(String::as_str).collect()
    };

    let mut config = Map::new();
    config.insert(
        "roots".to_owned(),
        src_paths.iter().map(|p| root_relative(p)).collect(),
    );
    config.insert(
        "collectCoverageFrom".to_owned(),
        src_paths
            .iter()
            .flat_map(|p| {
                let p = p.trim_start_matches("./").trim_end_matches('/');
                [
                    format!("{p}/**/*.{{js,jsx,ts,tsx}}"),
                    format!("!{p}/**/*.d.ts"),
                ]
            })
            .collect(),
    );
    config.insert(
        "setupFiles".to_owned(),
        json!([root_relative("config/polyfills.js")]),
    );
    if options.setup_tests {
        config.insert(
            "setupTestFrameworkScriptFile".to_owned(),
            Value::String(root_relative("src/setupTests.js")),
        );
    }
    config.insert(
        "testMatch".to_owned(),
        src_paths
            .iter()
            .flat_map(|p| {
                let base = root_relative(p.trim_end_matches('/'));
                [
                    format!("{base}/**/__tests__/**/*.{{js,jsx,ts,tsx}}"),
                    format!("{base}/**/?(*.)(spec|test).{{js,jsx,ts,tsx}}"),
                ]
            })
            .collect(),
    );
    config.insert("testEnvironment".to_owned(), json!("jsdom"));
    config.insert("testURL".to_owned(), json!("http://localhost"));
    config.insert(
        "transform".to_owned(),
        json!({
            "^.+\\.(js|jsx|ts|tsx)$": root_relative("config/jest/babelTransform.js"),
            "^.+\\.css$": root_relative("config/jest/cssTransform.js"),
            "^(?!.*\\.(js|jsx|ts|tsx|css|json)$)": root_relative("config/jest/fileTransform.js"),
        }),
    );
    config.insert(
        "transformIgnorePatterns".to_owned(),
        json!([
            "[/\\\\]node_modules[/\\\\].+\\.(js|jsx|ts|tsx)$",
            "^.+\\.module\\.(css|sass|scss)$"
        ]),
    );
    config.insert(
        "moduleNameMapper".to_owned(),
        json!({
            "^react-native$": "react-native-web",
            "^.+\\.module\\.(css|sass|scss)$": "identity-obj-proxy"
        }),
    );
    config.insert(
        "moduleFileExtensions".to_owned(),
        json!([
            "web.js", "js", "web.ts", "ts", "web.tsx", "tsx", "json", "web.jsx", "jsx", "node"
        ]),
    );
    if let Some(root) = &options.root_dir {
        config.insert("rootDir".to_owned(), Value::String(root.clone()));
    }
    Value::Object(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_into_project_config_folder() {
        let config = test_runner_config(&TestRunnerOptions::default());
        assert_eq!(config["roots"], json!(["<rootDir>/src"]));
        assert_eq!(
            config["transform"]["^.+\\.css$"],
            json!("<rootDir>/config/jest/cssTransform.js")
        );
        assert!(config.get("rootDir").is_none());
        assert!(config.get("setupTestFrameworkScriptFile").is_none());
    }

    #[test]
    fn setup_tests_and_root_dir_are_optional() {
        let config = test_runner_config(&TestRunnerOptions {
            root_dir: Some("..".to_owned()),
            src_paths: vec!["./lib/".to_owned()],
            setup_tests: true,
        });
        assert_eq!(config["rootDir"], json!(".."));
        assert_eq!(
            config["setupTestFrameworkScriptFile"],
            json!("<rootDir>/src/setupTests.js")
        );
        assert_eq!(config["roots"], json!(["<rootDir>/lib/"]));
        assert_eq!(config["collectCoverageFrom"][0], json!("lib/**/*.{js,jsx,ts,tsx}"));
    }
}
