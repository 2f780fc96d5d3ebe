//! Sweep configuration
//!
//! Defaults, overridden by `BENCH_SWEEP_*` environment variables, overridden
//! in turn by command-line flags. Every relative path is anchored at the
//! explicit project root by [`SweepConfig::resolve_paths`], so nothing depends
//! on the directory the binary was launched from.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::exporter::ReportFormat;
use crate::runner::{BenchmarkProtocol, OutputStyle};

/// Warm-up iterations before hyperfine starts measuring.
pub const DEFAULT_WARMUP: u32 = 3;

/// Floor on measured iterations per command.
pub const DEFAULT_MIN_RUNS: u32 = 10;

/// Configuration for one discover → build → benchmark sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Workspace root; all relative paths below resolve against it
    pub project_root: PathBuf,

    /// Workspace manifest declaring the units
    pub manifest_path: PathBuf,

    /// Cargo target directory
    pub target_dir: PathBuf,

    /// Cargo profile used for the optimized build
    pub profile: String,

    /// Directory under which `<unit>/bench.<ext>` reports are written
    pub report_root: PathBuf,

    /// hyperfine export format for the per-unit report
    pub report_format: ReportFormat,

    /// Warm-up iterations per command
    pub warmup: u32,

    /// Minimum measured runs per command
    pub min_runs: u32,

    /// Optional regex restricting which members are benchmarked
    pub unit_filter: Option<String>,

    /// Builder program
    pub cargo_program: String,

    /// Benchmark runner program
    pub hyperfine_program: String,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            manifest_path: PathBuf::from("Cargo.toml"),
            target_dir: PathBuf::from("target"),
            profile: "release".to_string(),
            report_root: PathBuf::from("."),
            report_format: ReportFormat::Markdown,
            warmup: DEFAULT_WARMUP,
            min_runs: DEFAULT_MIN_RUNS,
            unit_filter: None,
            cargo_program: "cargo".to_string(),
            hyperfine_program: "hyperfine".to_string(),
        }
    }
}

impl SweepConfig {
    /// Create config from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(root) = lookup("BENCH_SWEEP_PROJECT_ROOT") {
            config.project_root = PathBuf::from(root);
        }
        if let Some(path) = lookup("BENCH_SWEEP_MANIFEST") {
            config.manifest_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("BENCH_SWEEP_TARGET_DIR").or_else(|| lookup("CARGO_TARGET_DIR")) {
            config.target_dir = PathBuf::from(dir);
        }
        if let Some(profile) = lookup("BENCH_SWEEP_PROFILE") {
            config.profile = profile;
        }
        if let Some(dir) = lookup("BENCH_SWEEP_REPORT_DIR") {
            config.report_root = PathBuf::from(dir);
        }
        if let Some(format) = lookup("BENCH_SWEEP_FORMAT") {
            match format.parse() {
                Ok(format) => config.report_format = format,
                Err(e) => tracing::warn!("Ignoring BENCH_SWEEP_FORMAT: {e}"),
            }
        }
        if let Some(warmup) = lookup("BENCH_SWEEP_WARMUP") {
            if let Ok(n) = warmup.parse() {
                config.warmup = n;
            }
        }
        if let Some(min_runs) = lookup("BENCH_SWEEP_MIN_RUNS") {
            if let Ok(n) = min_runs.parse() {
                config.min_runs = n;
            }
        }
        if let Some(filter) = lookup("BENCH_SWEEP_FILTER") {
            config.unit_filter = Some(filter);
        }
        if let Some(program) = lookup("BENCH_SWEEP_CARGO") {
            config.cargo_program = program;
        }
        if let Some(program) = lookup("BENCH_SWEEP_HYPERFINE") {
            config.hyperfine_program = program;
        }

        config
    }

    /// Resolve relative paths against the project root
    pub fn resolve_paths(&mut self) {
        if self.manifest_path.is_relative() {
            self.manifest_path = self.project_root.join(&self.manifest_path);
        }
        if self.target_dir.is_relative() {
            self.target_dir = self.project_root.join(&self.target_dir);
        }
        if self.report_root.is_relative() {
            self.report_root = self.project_root.join(&self.report_root);
        }
    }

    /// Directory under the target dir that holds this profile's artifacts.
    ///
    /// Cargo writes `dev`/`test` builds to `debug` and `bench` to `release`;
    /// custom profiles get a directory of their own name.
    pub fn profile_dir(&self) -> &str {
        match self.profile.as_str() {
            "dev" | "test" => "debug",
            "bench" => "release",
            other => other,
        }
    }

    /// Output directory for unit executables
    pub fn artifact_dir(&self) -> PathBuf {
        self.target_dir.join(self.profile_dir())
    }

    /// Protocol parameters shared by every unit's benchmark
    pub fn protocol(&self) -> BenchmarkProtocol {
        BenchmarkProtocol {
            warmup: self.warmup,
            min_runs: self.min_runs,
            style: OutputStyle::Color,
            no_shell: true,
            format: self.report_format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SweepConfig::default();
        assert_eq!(config.profile, "release");
        assert_eq!(config.warmup, DEFAULT_WARMUP);
        assert_eq!(config.min_runs, DEFAULT_MIN_RUNS);
        assert_eq!(config.report_format, ReportFormat::Markdown);
        assert!(config.unit_filter.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = SweepConfig::from_lookup(lookup_from(&[
            ("BENCH_SWEEP_PROJECT_ROOT", "/work/aoc"),
            ("BENCH_SWEEP_WARMUP", "5"),
            ("BENCH_SWEEP_MIN_RUNS", "50"),
            ("BENCH_SWEEP_FORMAT", "json"),
            ("BENCH_SWEEP_FILTER", "^day0"),
            ("BENCH_SWEEP_HYPERFINE", "/opt/bin/hyperfine"),
        ]));
        assert_eq!(config.project_root, PathBuf::from("/work/aoc"));
        assert_eq!(config.warmup, 5);
        assert_eq!(config.min_runs, 50);
        assert_eq!(config.report_format, ReportFormat::Json);
        assert_eq!(config.unit_filter.as_deref(), Some("^day0"));
        assert_eq!(config.hyperfine_program, "/opt/bin/hyperfine");
    }

    #[test]
    fn test_invalid_numbers_keep_defaults() {
        let config = SweepConfig::from_lookup(lookup_from(&[
            ("BENCH_SWEEP_WARMUP", "lots"),
            ("BENCH_SWEEP_FORMAT", "pdf"),
        ]));
        assert_eq!(config.warmup, DEFAULT_WARMUP);
        assert_eq!(config.report_format, ReportFormat::Markdown);
    }

    #[test]
    fn test_cargo_target_dir_fallback() {
        let config = SweepConfig::from_lookup(lookup_from(&[("CARGO_TARGET_DIR", "/tmp/tgt")]));
        assert_eq!(config.target_dir, PathBuf::from("/tmp/tgt"));

        let config = SweepConfig::from_lookup(lookup_from(&[
            ("CARGO_TARGET_DIR", "/tmp/tgt"),
            ("BENCH_SWEEP_TARGET_DIR", "/tmp/sweep"),
        ]));
        assert_eq!(config.target_dir, PathBuf::from("/tmp/sweep"));
    }

    #[test]
    fn test_resolve_paths_anchors_at_project_root() {
        let mut config = SweepConfig {
            project_root: PathBuf::from("/work/aoc"),
            target_dir: PathBuf::from("/elsewhere/target"),
            ..Default::default()
        };
        config.resolve_paths();
        assert_eq!(config.manifest_path, PathBuf::from("/work/aoc/Cargo.toml"));
        assert_eq!(config.report_root, PathBuf::from("/work/aoc/."));
        assert_eq!(config.target_dir, PathBuf::from("/elsewhere/target"));
    }

    #[test]
    fn test_profile_dir() {
        let mut config = SweepConfig::default();
        assert_eq!(config.profile_dir(), "release");
        config.profile = "dev".into();
        assert_eq!(config.profile_dir(), "debug");
        config.profile = "bench".into();
        assert_eq!(config.profile_dir(), "release");
        config.profile = "dist".into();
        assert_eq!(config.profile_dir(), "dist");
        assert_eq!(config.artifact_dir(), PathBuf::from("target/dist"));
    }

    #[test]
    fn test_protocol_never_uses_a_shell() {
        let protocol = SweepConfig::default().protocol();
        assert!(protocol.no_shell);
        assert_eq!(protocol.warmup, DEFAULT_WARMUP);
        assert_eq!(protocol.min_runs, DEFAULT_MIN_RUNS);
    }
}
