//! Benchmark runner integration (hyperfine).
//!
//! One hyperfine invocation per unit carries both mode commands, so the
//! report holds part 1 and part 2 side by side with hyperfine's relative
//! speed comparison. Commands run with `--shell=none`; each argv is joined
//! with POSIX quoting so hyperfine's own word splitting restores it exactly.
//!
//! hyperfine exports results after every completed command. A private JSON
//! sidecar export therefore tells us how far a failed run got, which
//! identifies the mode whose executable exited non-zero.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::UnitFailure;
use crate::exporter::ReportFormat;
use crate::modes::{commands_for, ExecutionMode, ModeCommand};
use crate::registry::Unit;

/// hyperfine `--style` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStyle {
    Auto,
    Basic,
    Full,
    Nocolor,
    Color,
    None,
}

impl OutputStyle {
    pub fn as_arg(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Basic => "basic",
            Self::Full => "full",
            Self::Nocolor => "nocolor",
            Self::Color => "color",
            Self::None => "none",
        }
    }
}

/// Protocol parameters shared by every unit in a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkProtocol {
    /// Iterations discarded before measurement starts.
    pub warmup: u32,
    /// Floor on measured iterations per command.
    pub min_runs: u32,
    pub style: OutputStyle,
    /// Execute commands directly rather than through a shell.
    pub no_shell: bool,
    pub format: ReportFormat,
}

/// Full runner input for one unit.
#[derive(Debug, Clone)]
pub struct BenchmarkSpec {
    pub unit: Unit,
    /// Always `[Primary, Secondary]`.
    pub commands: [ModeCommand; 2],
    pub protocol: BenchmarkProtocol,
    /// Where the runner writes the report.
    pub export_path: PathBuf,
}

impl BenchmarkSpec {
    pub fn new(unit: &Unit, protocol: BenchmarkProtocol, export_path: impl Into<PathBuf>) -> Self {
        Self {
            unit: unit.clone(),
            commands: commands_for(unit),
            protocol,
            export_path: export_path.into(),
        }
    }
}

/// Timing summary for one mode, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeTiming {
    pub mode: ExecutionMode,
    pub label: String,
    pub mean: f64,
    pub stddev: Option<f64>,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub runs: usize,
}

/// Result of one successful runner invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub unit: String,
    /// Report file written by the runner.
    pub path: PathBuf,
    /// Per-mode summaries; empty if the sidecar could not be read.
    pub timings: Vec<ModeTiming>,
}

impl BenchmarkReport {
    pub fn timing(&self, mode: ExecutionMode) -> Option<&ModeTiming> {
        self.timings.iter().find(|t| t.mode == mode)
    }
}

/// Executes a [`BenchmarkSpec`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BenchRunner: Send + Sync {
    async fn run(&self, spec: &BenchmarkSpec) -> Result<BenchmarkReport, UnitFailure>;
}

/// Bridge to the `hyperfine` CLI.
pub struct HyperfineRunner {
    program: String,
}

impl HyperfineRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Single command string for `--shell=none` mode.
    pub fn command_line(command: &ModeCommand) -> Result<String, shlex::QuoteError> {
        shlex::try_join(command.argv.iter().map(String::as_str))
    }

    /// hyperfine arguments for `spec`, with an optional JSON sidecar export.
    pub fn hyperfine_args(
        spec: &BenchmarkSpec,
        sidecar: Option<&Path>,
    ) -> Result<Vec<String>, UnitFailure> {
        let protocol = &spec.protocol;
        let mut args = vec![
            "--warmup".to_string(),
            protocol.warmup.to_string(),
            "--min-runs".to_string(),
            protocol.min_runs.to_string(),
            "--style".to_string(),
            protocol.style.as_arg().to_string(),
        ];
        if protocol.no_shell {
            args.push("--shell=none".to_string());
        }
        args.push(protocol.format.hyperfine_flag().to_string());
        args.push(spec.export_path.to_string_lossy().into_owned());
        if let Some(sidecar) = sidecar {
            args.push(ReportFormat::Json.hyperfine_flag().to_string());
            args.push(sidecar.to_string_lossy().into_owned());
        }
        for command in &spec.commands {
            args.push("--command-name".to_string());
            args.push(command.label.clone());
        }
        for command in &spec.commands {
            let line = Self::command_line(command).map_err(|e| UnitFailure::Runner {
                unit: spec.unit.name.clone(),
                message: format!("cannot quote command for {}: {e}", command.label),
            })?;
            args.push(line);
        }
        Ok(args)
    }
}

impl Default for HyperfineRunner {
    fn default() -> Self {
        Self::new("hyperfine")
    }
}

#[async_trait]
impl BenchRunner for HyperfineRunner {
    async fn run(&self, spec: &BenchmarkSpec) -> Result<BenchmarkReport, UnitFailure> {
        let unit = spec.unit.name.as_str();

        // A JSON report doubles as the sidecar; hyperfine accepts one --export-json.
        let sidecar_file = if spec.protocol.format == ReportFormat::Json {
            None
        } else {
            Some(
                tempfile::Builder::new()
                    .prefix("bench-sweep-")
                    .suffix(".json")
                    .tempfile()
                    .map_err(|e| UnitFailure::Runner {
                        unit: unit.to_string(),
                        message: format!("cannot create sidecar export: {e}"),
                    })?,
            )
        };
        let sidecar_path = match &sidecar_file {
            Some(file) => file.path().to_path_buf(),
            None => spec.export_path.clone(),
        };

        let args = Self::hyperfine_args(spec, sidecar_file.as_ref().map(|f| f.path()))?;
        tracing::debug!(unit, program = %self.program, args = ?args, "Invoking runner");

        let output = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| UnitFailure::Runner {
                unit: unit.to_string(),
                message: format!("failed to run {}: {e}", self.program),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            let _ = std::io::stderr().write_all(stderr.as_bytes());
        }

        let export = read_export(&sidecar_path);

        if !output.status.success() {
            let completed = export.as_ref().map(|e| e.results.len()).unwrap_or(0);
            let failure = attribute_failure(unit, completed, &stderr);
            tracing::debug!(unit, completed, status = ?output.status.code(), "Runner failed");
            return Err(failure);
        }

        let timings = match export {
            Some(export) => export.into_timings(&spec.commands),
            None => {
                tracing::warn!(unit, path = %sidecar_path.display(), "Could not read timing export");
                Vec::new()
            }
        };

        Ok(BenchmarkReport {
            unit: unit.to_string(),
            path: spec.export_path.clone(),
            timings,
        })
    }
}

/// hyperfine's JSON export (fields the sweep reads).
#[derive(Debug, Deserialize)]
pub struct HyperfineExport {
    pub results: Vec<HyperfineResult>,
}

#[derive(Debug, Deserialize)]
pub struct HyperfineResult {
    pub command: String,
    pub mean: f64,
    #[serde(default)]
    pub stddev: Option<f64>,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub times: Vec<f64>,
}

impl HyperfineExport {
    /// Pair results with the commands they were produced for, in order.
    pub fn into_timings(self, commands: &[ModeCommand]) -> Vec<ModeTiming> {
        self.results
            .into_iter()
            .zip(commands)
            .map(|(result, command)| ModeTiming {
                mode: command.mode,
                label: result.command,
                mean: result.mean,
                stddev: result.stddev,
                median: result.median,
                min: result.min,
                max: result.max,
                runs: result.times.len(),
            })
            .collect()
    }
}

fn read_export(path: &Path) -> Option<HyperfineExport> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

static EXIT_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"non-zero exit code(?::\s*(-?\d+))?").expect("EXIT_CODE_RE regex should compile")
});

/// Parse hyperfine's diagnostic for a failing command.
///
/// Returns `None` if hyperfine did not report a non-zero exit, `Some(None)`
/// if it did without a code.
pub fn parse_exit_code(stderr: &str) -> Option<Option<i32>> {
    let captures = EXIT_CODE_RE.captures(stderr)?;
    Some(captures.get(1).and_then(|m| m.as_str().parse().ok()))
}

/// Build a [`UnitFailure`] from how many commands completed and what
/// hyperfine printed.
pub fn attribute_failure(unit: &str, completed: usize, stderr: &str) -> UnitFailure {
    match parse_exit_code(stderr) {
        Some(exit_code) => {
            UnitFailure::run(unit, ExecutionMode::ALL.get(completed).copied(), exit_code)
        }
        None => UnitFailure::run(unit, None, None),
    }
}

impl fmt::Display for BenchmarkProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "warmup={} min_runs={} style={} shell={} export={}",
            self.warmup,
            self.min_runs,
            self.style.as_arg(),
            if self.no_shell { "none" } else { "default" },
            self.format
        )
    }
}
