//! Unit registry: the ordered list of benchmarkable units.
//!
//! Units come from the explicit `[workspace] members` array of the project
//! manifest, in declaration order. Each unit name doubles as the cargo
//! binary name and as the report subdirectory, so it must be a single safe
//! path segment.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::SweepConfig;
use crate::error::ConfigurationError;

/// One benchmarkable target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identifier; build target name and report directory name.
    pub name: String,
    /// Where the optimized build leaves this unit's executable.
    pub executable_path: PathBuf,
}

impl Unit {
    /// Derive a unit from its name and the build output directory.
    pub fn new(name: impl Into<String>, artifact_dir: &Path) -> Self {
        let name = name.into();
        let executable_path =
            artifact_dir.join(format!("{name}{}", std::env::consts::EXE_SUFFIX));
        Self {
            name,
            executable_path,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    workspace: Option<WorkspaceTable>,
}

#[derive(Debug, Deserialize)]
struct WorkspaceTable {
    members: Option<Vec<String>>,
    #[serde(default)]
    exclude: Vec<String>,
}

/// Resolves units from a workspace manifest.
#[derive(Debug, Clone)]
pub struct UnitRegistry {
    manifest_path: PathBuf,
    artifact_dir: PathBuf,
    filter: Option<Regex>,
}

impl UnitRegistry {
    /// Registry reading `manifest_path`, placing executables in `artifact_dir`.
    pub fn new(manifest_path: impl Into<PathBuf>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            artifact_dir: artifact_dir.into(),
            filter: None,
        }
    }

    /// Registry for a resolved sweep configuration.
    pub fn from_config(config: &SweepConfig) -> Result<Self, ConfigurationError> {
        let registry = Self::new(&config.manifest_path, config.artifact_dir());
        match &config.unit_filter {
            Some(pattern) => registry.with_filter(pattern),
            None => Ok(registry),
        }
    }

    /// Only keep units whose name matches `pattern`.
    pub fn with_filter(mut self, pattern: &str) -> Result<Self, ConfigurationError> {
        let regex = Regex::new(pattern).map_err(|e| ConfigurationError::InvalidFilter {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        self.filter = Some(regex);
        Ok(self)
    }

    /// Path of the manifest this registry reads.
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Read the manifest and return its units in declaration order.
    pub fn list_units(&self) -> Result<Vec<Unit>, ConfigurationError> {
        let content = std::fs::read_to_string(&self.manifest_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigurationError::ManifestNotFound {
                    path: self.manifest_path.clone(),
                }
            } else {
                ConfigurationError::ManifestUnreadable {
                    path: self.manifest_path.clone(),
                    source: e,
                }
            }
        })?;

        self.units_from_manifest(&content)
    }

    /// Parse manifest text into units.
    pub fn units_from_manifest(&self, content: &str) -> Result<Vec<Unit>, ConfigurationError> {
        let manifest: Manifest = toml::from_str(content)
            .map_err(|e| ConfigurationError::malformed(&self.manifest_path, e.to_string()))?;

        let workspace = manifest.workspace.ok_or_else(|| {
            ConfigurationError::malformed(&self.manifest_path, "missing [workspace] table")
        })?;
        let members = workspace.members.ok_or_else(|| {
            ConfigurationError::malformed(&self.manifest_path, "missing `workspace.members` array")
        })?;

        let excluded: HashSet<&str> = workspace.exclude.iter().map(|e| normalize(e)).collect();

        let mut seen = HashSet::new();
        let mut units = Vec::new();

        for member in &members {
            let member = normalize(member);
            if excluded.contains(member) {
                tracing::debug!(member, "Skipping excluded member");
                continue;
            }
            if member.contains(['*', '?', '[']) {
                return Err(ConfigurationError::malformed(
                    &self.manifest_path,
                    format!("glob member '{member}' is not supported; list units explicitly"),
                ));
            }

            let name = member.rsplit(['/', '\\']).next().unwrap_or(member);
            validate_name(name)?;

            if let Some(filter) = &self.filter {
                if !filter.is_match(name) {
                    tracing::debug!(unit = name, "Filtered out");
                    continue;
                }
            }

            if !seen.insert(name.to_string()) {
                return Err(ConfigurationError::DuplicateUnit {
                    name: name.to_string(),
                });
            }
            units.push(Unit::new(name, &self.artifact_dir));
        }

        if units.is_empty() {
            return Err(ConfigurationError::NoUnits {
                path: self.manifest_path.clone(),
            });
        }

        Ok(units)
    }
}

fn normalize(member: &str) -> &str {
    let member = member.trim();
    let member = member.strip_prefix("./").unwrap_or(member);
    member.trim_end_matches('/')
}

/// Check that `name` is usable both as a cargo target and a path segment.
pub fn validate_name(name: &str) -> Result<(), ConfigurationError> {
    if name.is_empty() {
        return Err(ConfigurationError::invalid_name(name, "empty name"));
    }
    if name == "." || name == ".." {
        return Err(ConfigurationError::invalid_name(name, "reserved path segment"));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(ConfigurationError::invalid_name(
            name,
            format!("unsupported character {c:?}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn registry() -> UnitRegistry {
        UnitRegistry::new("Cargo.toml", "target/release")
    }

    fn names(units: &[Unit]) -> Vec<&str> {
        units.iter().map(|u| u.name.as_str()).collect()
    }

    #[test]
    fn test_members_in_declaration_order() {
        let manifest = r#"
            [workspace]
            members = ["day03", "day01", "day02"]
        "#;
        let units = registry().units_from_manifest(manifest).unwrap();
        assert_eq!(names(&units), vec!["day03", "day01", "day02"]);
    }

    #[test]
    fn test_executable_path_derivation() {
        let units = registry()
            .units_from_manifest("[workspace]\nmembers = [\"day07\"]\n")
            .unwrap();
        let expected = PathBuf::from("target/release")
            .join(format!("day07{}", std::env::consts::EXE_SUFFIX));
        assert_eq!(units[0].executable_path, expected);
    }

    #[test]
    fn test_exclude_and_nested_paths() {
        let manifest = r#"
            [workspace]
            members = ["aoclib", "./days/day01", "days/day02/"]
            exclude = ["aoclib"]
        "#;
        let units = registry().units_from_manifest(manifest).unwrap();
        assert_eq!(names(&units), vec!["day01", "day02"]);
    }

    #[test]
    fn test_filter_restricts_units() {
        let manifest = "[workspace]\nmembers = [\"aoclib\", \"day01\", \"day02\"]\n";
        let units = registry()
            .with_filter(r"^day\d+$")
            .unwrap()
            .units_from_manifest(manifest)
            .unwrap();
        assert_eq!(names(&units), vec!["day01", "day02"]);
    }

    #[test]
    fn test_invalid_filter() {
        let err = registry().with_filter("day(").unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidFilter { .. }));
    }

    #[test]
    fn test_zero_units_is_an_error() {
        let err = registry()
            .units_from_manifest("[workspace]\nmembers = []\n")
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::NoUnits { .. }));

        let err = registry()
            .with_filter("^nothing$")
            .unwrap()
            .units_from_manifest("[workspace]\nmembers = [\"day01\"]\n")
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::NoUnits { .. }));
    }

    #[test]
    fn test_missing_workspace_table() {
        let err = registry()
            .units_from_manifest("[package]\nname = \"day01\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedManifest { .. }));

        let err = registry()
            .units_from_manifest("[workspace]\nresolver = \"2\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("members"));
    }

    #[test]
    fn test_malformed_toml() {
        let err = registry()
            .units_from_manifest("[workspace\nmembers = ")
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedManifest { .. }));
    }

    #[test]
    fn test_glob_members_rejected() {
        let err = registry()
            .units_from_manifest("[workspace]\nmembers = [\"day*\"]\n")
            .unwrap_err();
        assert!(err.to_string().contains("glob"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let manifest = "[workspace]\nmembers = [\"a/day01\", \"b/day01\"]\n";
        let err = registry().units_from_manifest(manifest).unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateUnit { name } if name == "day01"));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("day01").is_ok());
        assert!(validate_name("day_01-b").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("day 01").is_err());
        assert!(validate_name("day:01").is_err());
    }

    #[test]
    fn test_list_units_reads_manifest_file() {
        let dir = tempdir().unwrap();
        let manifest_path = dir.path().join("Cargo.toml");
        fs::write(
            &manifest_path,
            "[workspace]\nresolver = \"2\"\nmembers = [\"day01\", \"day02\"]\n",
        )
        .unwrap();

        let registry = UnitRegistry::new(&manifest_path, dir.path().join("target/release"));
        let units = registry.list_units().unwrap();
        assert_eq!(names(&units), vec!["day01", "day02"]);
    }

    #[test]
    fn test_missing_manifest_file() {
        let dir = tempdir().unwrap();
        let registry = UnitRegistry::new(dir.path().join("Cargo.toml"), "target/release");
        let err = registry.list_units().unwrap_err();
        assert!(matches!(err, ConfigurationError::ManifestNotFound { .. }));
    }
}
