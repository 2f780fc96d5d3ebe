//! Optimized workspace build
//!
//! Runs a single `cargo build` for every unit and captures its output.
//! The build is all-or-nothing: any non-zero exit becomes a [`BuildFailure`]
//! with cargo's stderr preserved verbatim.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::SweepConfig;
use crate::error::BuildFailure;

/// Builds every unit in one pass.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Builder: Send + Sync {
    /// Run the build to completion.
    async fn build(&self) -> Result<BuildOutput, BuildFailure>;
}

/// What a successful build produced
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Binary target name → executable path, from cargo's artifact messages
    pub executables: BTreeMap<String, PathBuf>,
    /// Wall-clock build time
    pub duration: Duration,
}

impl BuildOutput {
    /// Whether cargo reported producing an executable at `path`
    pub fn produced(&self, path: &Path) -> bool {
        self.executables.values().any(|p| p == path)
    }
}

/// Cargo wrapper for the optimized build
pub struct CargoBuilder {
    /// Cargo program
    program: String,
    /// Working directory (workspace root)
    working_dir: PathBuf,
    manifest_path: PathBuf,
    target_dir: PathBuf,
    profile: String,
}

impl CargoBuilder {
    /// Create a builder for the given workspace
    pub fn new(
        working_dir: impl AsRef<Path>,
        manifest_path: impl AsRef<Path>,
        target_dir: impl AsRef<Path>,
        profile: impl Into<String>,
    ) -> Self {
        Self {
            program: "cargo".to_string(),
            working_dir: working_dir.as_ref().to_path_buf(),
            manifest_path: manifest_path.as_ref().to_path_buf(),
            target_dir: target_dir.as_ref().to_path_buf(),
            profile: profile.into(),
        }
    }

    /// Builder for a resolved sweep configuration
    pub fn from_config(config: &SweepConfig) -> Self {
        Self::new(
            &config.project_root,
            &config.manifest_path,
            &config.target_dir,
            config.profile.clone(),
        )
        .with_program(config.cargo_program.clone())
    }

    /// Use a different cargo executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments for the single build invocation
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["build".to_string(), "--workspace".to_string()];
        if self.profile == "release" {
            args.push("--release".to_string());
        } else {
            args.push("--profile".to_string());
            args.push(self.profile.clone());
        }
        args.push("--manifest-path".to_string());
        args.push(self.manifest_path.to_string_lossy().into_owned());
        args.push("--target-dir".to_string());
        args.push(self.target_dir.to_string_lossy().into_owned());
        args.push("--message-format=json-render-diagnostics".to_string());
        args
    }

    /// Collect executables from cargo's JSON message stream
    pub fn parse_executables(stdout: &str) -> BTreeMap<String, PathBuf> {
        stdout
            .lines()
            .filter_map(|line| serde_json::from_str::<CargoMessage>(line).ok())
            .filter_map(|message| match message {
                CargoMessage::CompilerArtifact {
                    target,
                    executable: Some(executable),
                } => Some((target.name, executable)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Builder for CargoBuilder {
    async fn build(&self) -> Result<BuildOutput, BuildFailure> {
        let start = Instant::now();
        let args = self.build_args();
        tracing::info!(program = %self.program, args = ?args, "Building all units");

        let output = tokio::process::Command::new(&self.program)
            .args(&args)
            .current_dir(&self.working_dir)
            .output()
            .await
            .map_err(|e| BuildFailure::spawn(&self.program, &e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(BuildFailure {
                program: self.program.clone(),
                exit_code: output.status.code(),
                stderr,
            });
        }

        let executables = Self::parse_executables(&stdout);
        let duration = start.elapsed();
        tracing::info!(
            executables = executables.len(),
            duration_ms = duration.as_millis() as u64,
            "Build finished"
        );
        tracing::debug!("cargo stderr:\n{stderr}");

        Ok(BuildOutput {
            executables,
            duration,
        })
    }
}

/// Cargo JSON message format (the subset the sweep needs)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "reason")]
pub enum CargoMessage {
    /// Compiler artifact produced
    #[serde(rename = "compiler-artifact")]
    CompilerArtifact {
        target: Target,
        /// Set only for binary targets
        #[serde(default)]
        executable: Option<PathBuf>,
    },

    /// Build finished
    #[serde(rename = "build-finished")]
    BuildFinished { success: bool },

    /// Unknown message type (catch-all)
    #[serde(other)]
    Other,
}

/// Cargo target (crate/binary/test)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Target name
    pub name: String,
    /// Kind (lib, bin, test, etc.)
    #[serde(default)]
    pub kind: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_args() {
        let builder = CargoBuilder::new("/work/aoc", "/work/aoc/Cargo.toml", "/work/aoc/target", "release");
        let args = builder.build_args();
        assert_eq!(args[0], "build");
        assert!(args.contains(&"--workspace".to_string()));
        assert!(args.contains(&"--release".to_string()));
        assert!(!args.contains(&"--profile".to_string()));
        assert!(args.contains(&"--message-format=json-render-diagnostics".to_string()));
        let idx = args.iter().position(|a| a == "--target-dir").unwrap();
        assert_eq!(args[idx + 1], "/work/aoc/target");
    }

    #[test]
    fn test_custom_profile_args() {
        let builder = CargoBuilder::new(".", "Cargo.toml", "target", "dist");
        let args = builder.build_args();
        let idx = args.iter().position(|a| a == "--profile").unwrap();
        assert_eq!(args[idx + 1], "dist");
        assert!(!args.contains(&"--release".to_string()));
    }

    #[test]
    fn test_parse_executables() {
        let stdout = concat!(
            r#"{"reason":"compiler-artifact","package_id":"aoclib","target":{"name":"aoclib","kind":["lib"],"src_path":"aoclib/src/lib.rs"},"executable":null,"fresh":true}"#,
            "\n",
            r#"{"reason":"compiler-artifact","package_id":"day01","target":{"name":"day01","kind":["bin"],"src_path":"day01/src/main.rs"},"executable":"/work/aoc/target/release/day01","fresh":false}"#,
            "\n",
            r#"{"reason":"build-script-executed","package_id":"x"}"#,
            "\n",
            "not json at all\n",
            r#"{"reason":"build-finished","success":true}"#,
        );

        let executables = CargoBuilder::parse_executables(stdout);
        assert_eq!(executables.len(), 1);
        assert_eq!(
            executables.get("day01"),
            Some(&PathBuf::from("/work/aoc/target/release/day01"))
        );

        let output = BuildOutput {
            executables,
            duration: Duration::ZERO,
        };
        assert!(output.produced(Path::new("/work/aoc/target/release/day01")));
        assert!(!output.produced(Path::new("/work/aoc/target/release/day02")));
    }

    #[test]
    fn test_build_finished_message() {
        let msg: CargoMessage =
            serde_json::from_str(r#"{"reason":"build-finished","success":false}"#).unwrap();
        assert!(matches!(msg, CargoMessage::BuildFinished { success: false }));
    }

    #[tokio::test]
    async fn test_missing_program_is_build_failure() {
        let builder = CargoBuilder::new(".", "Cargo.toml", "target", "release")
            .with_program("definitely-not-a-real-cargo-binary");
        let err = builder.build().await.unwrap_err();
        assert_eq!(err.exit_code, None);
        assert!(err.stderr.contains("definitely-not-a-real-cargo-binary"));
    }
}
