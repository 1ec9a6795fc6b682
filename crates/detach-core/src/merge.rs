//! Dependency reconciliation between the host manifest and the tool manifest.
//!
//! The tool package and every development dependency that only existed to
//! serve it are removed from the host. Their own runtime dependencies are
//! hoisted into the host's `devDependencies` so the project keeps resolving
//! the same packages once the tool is gone. Ranges are never reconciled: when
//! a name is hoisted twice the last one written wins.

use crate::CoreError;
use detach_project::PackageRepository;
use detach_schema::{DependencySection, DependencyTable, PackageManifest};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// One change applied to the host's dependency sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DependencyChange {
    Removed {
        section: String,
        name: String,
    },
    Added {
        name: String,
        range: String,
        /// Package whose dependency list this entry was hoisted from.
        from: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub changes: Vec<DependencyChange>,
}

impl MergeReport {
    fn removed(&mut self, section: DependencySection, name: &str) {
        debug!("removing {name} from {section}");
        self.changes.push(DependencyChange::Removed {
            section: section.key().to_owned(),
            name: name.to_owned(),
        });
    }

    fn added(&mut self, name: &str, range: &str, from: &str) {
        debug!("adding {name}@{range} to devDependencies (from {from})");
        self.changes.push(DependencyChange::Added {
            name: name.to_owned(),
            range: range.to_owned(),
            from: from.to_owned(),
        });
    }
}

/// Runtime dependencies of `manifest` that are not also optional.
fn hoistable(manifest: &PackageManifest) -> Result<DependencyTable, CoreError> {
    let optional = manifest.dependency_table(DependencySection::OptionalDependencies)?;
    let mut deps = manifest.dependency_table(DependencySection::Dependencies)?;
    deps.retain(|name, _| !optional.contains_key(name));
    Ok(deps)
}

/// Rewrite the host's `dependencies` and `devDependencies` for a project that
/// no longer depends on `tool`.
///
/// `tool_name` is the package the host installed the tool under. It and the
/// name the tool manifest declares, when that differs, are both treated as
/// the tool. Every installed manifest is read before the host is touched, so
/// a missing package leaves `host` unchanged.
pub fn merge_dependencies(
    host: &mut PackageManifest,
    tool: &PackageManifest,
    tool_name: &str,
    repo: &dyn PackageRepository,
) -> Result<MergeReport, CoreError> {
    let self_names: BTreeSet<&str> = std::iter::once(tool_name)
        .chain(tool.name())
        .filter(|n| !n.is_empty())
        .collect();
    let mut report = MergeReport::default();
    let mut dependencies = host.dependency_table(DependencySection::Dependencies)?;
    let mut dev = host.dependency_table(DependencySection::DevDependencies)?;

    if host.has_section(DependencySection::DevDependencies) {
        for name in &self_names {
            if dev.remove(*name).is_some() {
                report.removed(DependencySection::DevDependencies, name);
            }
        }

        let mut to_add: Vec<(String, String, String)> = Vec::new();

        // The tool's own direct dependencies that the host also declares.
        let direct: BTreeSet<String> = tool
            .dependency_table(DependencySection::DevDependencies)?
            .into_keys()
            .chain(tool.dependency_table(DependencySection::Dependencies)?.into_keys())
            .collect();
        for name in &direct {
            if dev.remove(name).is_none() {
                continue;
            }
            report.removed(DependencySection::DevDependencies, name);
            let child = repo.manifest(name)?;
            for (dep, range) in hoistable(&child)? {
                to_add.push((dep, range, name.clone()));
            }
        }

        // Templates and plugins that dev-depend on the tool go as well.
        let mut to_remove = Vec::new();
        for name in dev.keys() {
            let child = repo.manifest(name)?;
            if !self_names
                .iter()
                .any(|n| child.declares(DependencySection::DevDependencies, n))
            {
                continue;
            }
            to_remove.push(name.clone());
            for (dep, range) in hoistable(&child)? {
                to_add.push((dep, range, name.clone()));
            }
        }

        for (dep, range, from) in to_add {
            report.added(&dep, &range, &from);
            dev.insert(dep, range);
        }
        for name in to_remove {
            if dev.remove(&name).is_some() {
                report.removed(DependencySection::DevDependencies, &name);
            }
        }
    }

    for name in &self_names {
        if dependencies.remove(*name).is_some() {
            report.removed(DependencySection::Dependencies, name);
        }
    }

    for (dep, range) in hoistable(tool)? {
        report.added(&dep, &range, tool_name);
        dev.insert(dep, range);
    }

    // A hoisted name can never name the tool itself or shadow a runtime dependency.
    for name in &self_names {
        if dev.remove(*name).is_some() {
            report.removed(DependencySection::DevDependencies, name);
        }
    }
    let shadowed: Vec<String> = dev
        .keys()
        .filter(|name| dependencies.contains_key(*name))
        .cloned()
        .collect();
    for name in shadowed {
        dev.remove(&name);
        report.removed(DependencySection::DevDependencies, &name);
    }

    host.set_dependency_table(DependencySection::Dependencies, &dependencies);
    host.set_dependency_table(DependencySection::DevDependencies, &dev);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use detach_project::{FixturePackages, ProjectError};
    use detach_schema::parse_manifest_str;

    const TOOL: &str = "toolpkg";

    fn tool() -> PackageManifest {
        parse_manifest_str(
            r#"{
                "name": "toolpkg",
                "version": "1.0.0",
                "bin": {"toolpkg": "./bin/toolpkg.js"},
                "dependencies": {"babel-core": "6.26.0", "fsevents": "1.2.0", "chalk": "2.4.0"},
                "devDependencies": {"babel-jest": "2.0.0"},
                "optionalDependencies": {"fsevents": "1.2.0"}
            }"#,
        )
        .unwrap()
    }

    fn repo() -> FixturePackages {
        FixturePackages::new()
            .with_json(
                "babel-jest",
                r#"{"name": "babel-jest", "dependencies": {"babel-core": "6.0.0", "babel-plugin-istanbul": "4.1.0"}}"#,
            )
            .unwrap()
            .with_json("eslint", r#"{"name": "eslint", "dependencies": {"chalk": "1.0.0"}}"#)
            .unwrap()
    }

    fn dev(host: &PackageManifest) -> DependencyTable {
        host.dependency_table(DependencySection::DevDependencies)
            .unwrap()
    }

    fn deps(host: &PackageManifest) -> DependencyTable {
        host.dependency_table(DependencySection::Dependencies).unwrap()
    }

    #[test]
    fn hoists_from_removed_tool_dependency() {
        let mut host = parse_manifest_str(
            r#"{"name": "app", "devDependencies": {"toolpkg": "1.0.0", "babel-jest": "2.0.0"}}"#,
        )
        .unwrap();
        merge_dependencies(&mut host, &tool(), TOOL, &repo()).unwrap();

        let dev = dev(&host);
        assert!(!dev.contains_key("toolpkg"));
        assert!(!dev.contains_key("babel-jest"));
        assert!(dev.contains_key("babel-core"));
        assert!(dev.contains_key("babel-plugin-istanbul"));
    }

    #[test]
    fn tool_ranges_win_over_hoisted_ranges() {
        let mut host = parse_manifest_str(
            r#"{"devDependencies": {"toolpkg": "1.0.0", "babel-jest": "2.0.0"}}"#,
        )
        .unwrap();
        merge_dependencies(&mut host, &tool(), TOOL, &repo()).unwrap();
        assert_eq!(dev(&host)["babel-core"], "6.26.0");
    }

    #[test]
    fn optional_dependencies_are_never_hoisted() {
        let repo = FixturePackages::new()
            .with_json(
                "babel-jest",
                r#"{"dependencies": {"chokidar": "2.0.0", "fsevents": "1.0.0"},
                    "optionalDependencies": {"fsevents": "1.0.0"}}"#,
            )
            .unwrap();
        let mut host =
            parse_manifest_str(r#"{"devDependencies": {"babel-jest": "2.0.0"}}"#).unwrap();
        let report = merge_dependencies(&mut host, &tool(), TOOL, &repo).unwrap();

        assert!(!dev(&host).contains_key("fsevents"));
        assert!(!report
            .changes
            .iter()
            .any(|c| matches!(c, DependencyChange::Added { name, .. } if name == "fsevents")));
        assert!(dev(&host).contains_key("chokidar"));
    }

    #[test]
    fn removes_self_reference_from_both_sections() {
        let mut host = parse_manifest_str(
            r#"{"dependencies": {"react": "16.4.0", "toolpkg": "1.0.0"},
                "devDependencies": {"toolpkg": "1.0.0"}}"#,
        )
        .unwrap();
        merge_dependencies(&mut host, &tool(), TOOL, &repo()).unwrap();
        assert!(!deps(&host).contains_key("toolpkg"));
        assert!(!dev(&host).contains_key("toolpkg"));
        assert!(deps(&host).contains_key("react"));
    }

    #[test]
    fn tool_that_depends_on_itself_never_lands_in_dev() {
        let tool = parse_manifest_str(
            r#"{"name": "toolpkg", "dependencies": {"toolpkg": "1.0.0", "chalk": "2.0.0"}}"#,
        )
        .unwrap();
        let mut host = parse_manifest_str(r#"{"dependencies": {"toolpkg": "1.0.0"}}"#).unwrap();
        merge_dependencies(&mut host, &tool, TOOL, &FixturePackages::new()).unwrap();
        assert!(!dev(&host).contains_key("toolpkg"));
        assert!(!deps(&host).contains_key("toolpkg"));
    }

    #[test]
    fn sections_stay_disjoint() {
        let mut host = parse_manifest_str(
            r#"{"dependencies": {"chalk": "2.4.0", "toolpkg": "1.0.0"}}"#,
        )
        .unwrap();
        merge_dependencies(&mut host, &tool(), TOOL, &repo()).unwrap();
        let deps = deps(&host);
        let dev = dev(&host);
        assert!(deps.keys().all(|k| !dev.contains_key(k)));
        assert!(dev.contains_key("babel-core"));
    }

    #[test]
    fn no_dev_section_only_moves_tool_dependencies() {
        let mut host = parse_manifest_str(
            r#"{"name": "app", "dependencies": {"toolpkg": "1.0.0", "react": "16.4.0"}}"#,
        )
        .unwrap();
        merge_dependencies(&mut host, &tool(), TOOL, &FixturePackages::new()).unwrap();
        let dev = dev(&host);
        assert_eq!(dev.keys().collect::<Vec<_>>(), vec!["babel-core", "chalk"]);
    }

    #[test]
    fn writes_sorted_sections_dependencies_first() {
        let mut host = parse_manifest_str(
            r#"{"name": "app", "dependencies": {"zeta": "1", "alpha": "1"}}"#,
        )
        .unwrap();
        merge_dependencies(&mut host, &tool(), TOOL, &FixturePackages::new()).unwrap();
        let out = host.to_json_pretty().unwrap();
        assert!(out.find("\"alpha\"").unwrap() < out.find("\"zeta\"").unwrap());
        assert!(out.find("\"dependencies\"").unwrap() < out.find("\"devDependencies\"").unwrap());
    }

    #[test]
    fn rewriting_sorted_sections_is_stable() {
        let mut host = parse_manifest_str(
            r#"{"dependencies": {"react": "16.4.0"},
                "devDependencies": {"toolpkg": "1.0.0", "babel-jest": "2.0.0"}}"#,
        )
        .unwrap();
        merge_dependencies(&mut host, &tool(), TOOL, &repo()).unwrap();
        let first = host.to_json_pretty().unwrap();
        for section in [DependencySection::Dependencies, DependencySection::DevDependencies] {
            let table = host.dependency_table(section).unwrap();
            host.set_dependency_table(section, &table);
        }
        assert_eq!(host.to_json_pretty().unwrap(), first);
    }

    #[test]
    fn removes_dev_dependencies_built_on_the_tool() {
        let repo = repo()
            .with_json(
                "tool-template",
                r#"{"dependencies": {"react-dom": "16.4.0"},
                    "devDependencies": {"toolpkg": "1.0.0"}}"#,
            )
            .unwrap();
        let mut host = parse_manifest_str(
            r#"{"devDependencies": {"eslint": "4.0.0", "tool-template": "1.0.0"}}"#,
        )
        .unwrap();
        let report = merge_dependencies(&mut host, &tool(), TOOL, &repo).unwrap();

        let dev = dev(&host);
        assert!(!dev.contains_key("tool-template"));
        assert!(dev.contains_key("react-dom"));
        assert!(dev.contains_key("eslint"));
        assert!(report.changes.contains(&DependencyChange::Removed {
            section: "devDependencies".to_owned(),
            name: "tool-template".to_owned(),
        }));
    }
    #[test]
    fn last_hoist_wins() {
        let repo = FixturePackages::new()
            .with_json("a-plugin", r#"{"dependencies": {"shared": "1.0.0"}, "devDependencies": {"toolpkg": "1"}}"#)
            .unwrap()
            .with_json("b-plugin", r#"{"dependencies": {"shared": "2.0.0"}, "devDependencies": {"toolpkg": "1"}}"#)
            .unwrap()
            .with_json("shared", r#"{"name": "shared"}"#)
            .unwrap();
        let tool = parse_manifest_str(r#"{"name": "toolpkg"}"#).unwrap();
        let mut host = parse_manifest_str(
            r#"{"devDependencies": {"a-plugin": "1", "b-plugin": "1", "shared": "0.1.0"}}"#,
        )
        .unwrap();
        merge_dependencies(&mut host, &tool, TOOL, &repo).unwrap();
        assert_eq!(dev(&host)["shared"], "2.0.0");
    }

    #[test]
    fn missing_installed_manifest_is_fatal_and_leaves_host_untouched() {
        let mut host = parse_manifest_str(
            r#"{"devDependencies": {"toolpkg": "1.0.0", "babel-jest": "2.0.0"}}"#,
        )
        .unwrap();
        let before = host.clone();
        let err =
            merge_dependencies(&mut host, &tool(), TOOL, &FixturePackages::new()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Project(ProjectError::PackageNotFound { .. })
        ));
        assert_eq!(host, before);
    }

    #[test]
    fn installed_name_is_removed_when_tool_manifest_has_no_name() {
        let tool = parse_manifest_str(r#"{"dependencies": {"webpack": "4.0.0"}}"#).unwrap();
        let mut host = parse_manifest_str(
            r#"{"dependencies": {"toolpkg": "1.0.0"}, "devDependencies": {"toolpkg": "1.0.0"}}"#,
        )
        .unwrap();
        merge_dependencies(&mut host, &tool, TOOL, &FixturePackages::new()).unwrap();
        assert!(!deps(&host).contains_key(TOOL));
        assert_eq!(dev(&host).keys().collect::<Vec<_>>(), vec!["webpack"]);
    }

    #[test]
    fn forked_tool_drops_both_names() {
        let tool = parse_manifest_str(r#"{"name": "toolpkg-fork"}"#).unwrap();
        let repo = FixturePackages::new()
            .with_json("fork-template", r#"{"devDependencies": {"toolpkg-fork": "1"}}"#)
            .unwrap();
        let mut host = parse_manifest_str(
            r#"{"dependencies": {"toolpkg": "1.0.0", "toolpkg-fork": "1.0.0"},
                "devDependencies": {"fork-template": "1"}}"#,
        )
        .unwrap();
        merge_dependencies(&mut host, &tool, TOOL, &repo).unwrap();
        assert!(deps(&host).is_empty());
        assert!(dev(&host).is_empty());
    }
}
