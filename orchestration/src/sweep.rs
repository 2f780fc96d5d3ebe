//! Sweep orchestrator: discover → build → benchmark each unit → summarize.
//!
//! Units are benchmarked strictly one at a time in registry order; running
//! them concurrently would contend for CPU and skew every measurement.
//! Configuration and build errors abort the sweep. A unit that fails to run
//! or export is recorded and the sweep moves on to the next one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::builder::{BuildOutput, Builder};
use crate::error::{SweepResult, UnitFailure};
use crate::exporter::ReportExporter;
use crate::registry::{Unit, UnitRegistry};
use crate::runner::{BenchRunner, BenchmarkProtocol, BenchmarkReport, BenchmarkSpec};
use crate::state_machine::{StateMachine, SweepState, TransitionRecord};

/// How one unit's benchmark ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitStatus {
    Succeeded { report: BenchmarkReport },
    Failed { failure: UnitFailure },
}

impl UnitStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Per-unit entry in the sweep summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitOutcome {
    pub unit: String,
    #[serde(flatten)]
    pub status: UnitStatus,
}

/// Result of a sweep that got past discovery and the build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub build_duration_ms: u64,
    /// One entry per unit, in registry order.
    pub outcomes: Vec<UnitOutcome>,
    pub transitions: Vec<TransitionRecord>,
}

impl SweepSummary {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.status.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitFailure> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            UnitStatus::Failed { failure } => Some(failure),
            UnitStatus::Succeeded { .. } => None,
        })
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_success()).count()
    }

    /// Process exit status: 0 only if every unit succeeded.
    pub fn exit_code(&self) -> i32 {
        if self.all_succeeded() {
            0
        } else {
            1
        }
    }
}

/// The orchestrator, generic over its three external collaborators.
pub struct Sweep<B, R, E> {
    registry: UnitRegistry,
    builder: B,
    runner: R,
    exporter: E,
    protocol: BenchmarkProtocol,
}

impl<B, R, E> Sweep<B, R, E>
where
    B: Builder,
    R: BenchRunner,
    E: ReportExporter,
{
    pub fn new(
        registry: UnitRegistry,
        builder: B,
        runner: R,
        exporter: E,
        protocol: BenchmarkProtocol,
    ) -> Self {
        Self {
            registry,
            builder,
            runner,
            exporter,
            protocol,
        }
    }

    /// Run the whole sweep.
    ///
    /// Returns `Err` only for fatal errors; per-unit failures are in the
    /// summary.
    pub async fn run(&self) -> SweepResult<SweepSummary> {
        let started_at = Utc::now();
        let mut sm = StateMachine::new();

        sm.advance(SweepState::Discovering, None)?;
        let units = match self.registry.list_units() {
            Ok(units) => units,
            Err(e) => {
                sm.abort(&e.to_string())?;
                return Err(e.into());
            }
        };
        info!(
            count = units.len(),
            manifest = %self.registry.manifest_path().display(),
            "Discovered units"
        );

        sm.advance(SweepState::Building, Some(&format!("{} units", units.len())))?;
        let build = match self.builder.build().await {
            Ok(build) => build,
            Err(e) => {
                sm.abort(&e.to_string())?;
                return Err(e.into());
            }
        };
        warn_missing_executables(&units, &build);

        info!(protocol = %self.protocol, "Benchmarking units");
        let mut outcomes = Vec::with_capacity(units.len());
        for unit in &units {
            sm.advance(SweepState::Benchmarking, Some(&unit.name))?;
            let status = self.benchmark_unit(unit).await;
            match &status {
                UnitStatus::Succeeded { report } => {
                    info!(unit = %unit.name, report = %report.path.display(), "Unit benchmarked");
                }
                UnitStatus::Failed { failure } => {
                    error!(unit = %unit.name, "{failure}");
                }
            }
            outcomes.push(UnitOutcome {
                unit: unit.name.clone(),
                status,
            });
        }

        let failed = outcomes.iter().filter(|o| !o.status.is_success()).count();
        sm.advance(SweepState::Done, Some(&format!("{failed} failed")))?;
        info!(summary = %sm.summary(), "Sweep finished");

        Ok(SweepSummary {
            started_at,
            finished_at: Utc::now(),
            build_duration_ms: build.duration.as_millis() as u64,
            outcomes,
            transitions: sm.into_transitions(),
        })
    }

    async fn benchmark_unit(&self, unit: &Unit) -> UnitStatus {
        let export_path = match self.exporter.prepare(unit) {
            Ok(path) => path,
            Err(failure) => return UnitStatus::Failed { failure },
        };

        let spec = BenchmarkSpec::new(unit, self.protocol, export_path);
        let result = match self.runner.run(&spec).await {
            Ok(report) => self.exporter.verify(unit).map(|_| report),
            Err(failure) => Err(failure),
        };

        match result {
            Ok(report) => UnitStatus::Succeeded { report },
            Err(failure) => UnitStatus::Failed { failure },
        }
    }
}

fn warn_missing_executables(units: &[Unit], build: &BuildOutput) {
    for unit in units {
        if !build.produced(&unit.executable_path) && !unit.executable_path.exists() {
            warn!(
                unit = %unit.name,
                expected = %unit.executable_path.display(),
                "Build produced no executable for unit"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MockBuilder;
    use crate::error::{BuildFailure, SweepError};
    use crate::exporter::{ReportFormat, UnitScopedExporter};
    use crate::modes::ExecutionMode;
    use crate::runner::{MockBenchRunner, OutputStyle};
    use tempfile::{tempdir, TempDir};

    fn protocol() -> BenchmarkProtocol {
        BenchmarkProtocol {
            warmup: 3,
            min_runs: 10,
            style: OutputStyle::Color,
            no_shell: true,
            format: ReportFormat::Markdown,
        }
    }

    fn project(members: &[&str]) -> (TempDir, UnitRegistry, UnitScopedExporter) {
        let dir = tempdir().unwrap();
        let members: Vec<String> = members.iter().map(|m| format!("\"{m}\"")).collect();
        std::fs::write(
            dir.path().join("Cargo.toml"),
            format!("[workspace]\nmembers = [{}]\n", members.join(", ")),
        )
        .unwrap();
        let registry = UnitRegistry::new(
            dir.path().join("Cargo.toml"),
            dir.path().join("target/release"),
        );
        let exporter = UnitScopedExporter::new(dir.path(), ReportFormat::Markdown);
        (dir, registry, exporter)
    }

    fn ok_builder() -> MockBuilder {
        let mut builder = MockBuilder::new();
        builder
            .expect_build()
            .times(1)
            .returning(|| Ok(BuildOutput::default()));
        builder
    }

    fn write_report(spec: &BenchmarkSpec) -> Result<BenchmarkReport, UnitFailure> {
        std::fs::write(&spec.export_path, "| Command | Mean [ms] |\n").unwrap();
        Ok(BenchmarkReport {
            unit: spec.unit.name.clone(),
            path: spec.export_path.clone(),
            timings: Vec::new(),
        })
    }

    #[tokio::test]
    async fn test_build_failure_skips_every_run() {
        let (_dir, registry, exporter) = project(&["day01", "day02"]);

        let mut builder = MockBuilder::new();
        builder.expect_build().times(1).returning(|| {
            Err(BuildFailure {
                program: "cargo".into(),
                exit_code: Some(101),
                stderr: "error: could not compile `day02`".into(),
            })
        });
        let mut runner = MockBenchRunner::new();
        runner.expect_run().times(0);

        let sweep = Sweep::new(registry, builder, runner, exporter, protocol());
        let err = sweep.run().await.unwrap_err();
        assert!(matches!(err, SweepError::Build(_)));
        assert_eq!(err.tool_output(), Some("error: could not compile `day02`"));
    }

    #[tokio::test]
    async fn test_configuration_error_skips_build() {
        let (_dir, registry, exporter) = project(&[]);

        let mut builder = MockBuilder::new();
        builder.expect_build().times(0);
        let mut runner = MockBenchRunner::new();
        runner.expect_run().times(0);

        let sweep = Sweep::new(registry, builder, runner, exporter, protocol());
        let err = sweep.run().await.unwrap_err();
        assert!(matches!(err, SweepError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_one_runner_call_per_unit_with_both_modes() {
        let (dir, registry, exporter) = project(&["day01", "day02", "day03"]);

        let mut runner = MockBenchRunner::new();
        runner
            .expect_run()
            .times(3)
            .withf(|spec| {
                spec.commands[0].mode == ExecutionMode::Primary
                    && spec.commands[1].mode == ExecutionMode::Secondary
                    && spec.protocol.no_shell
            })
            .returning(write_report);

        let sweep = Sweep::new(registry, ok_builder(), runner, exporter, protocol());
        let summary = sweep.run().await.unwrap();

        assert!(summary.all_succeeded());
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(summary.succeeded_count(), 3);
        let units: Vec<&str> = summary.outcomes.iter().map(|o| o.unit.as_str()).collect();
        assert_eq!(units, vec!["day01", "day02", "day03"]);
        assert!(dir.path().join("day03/bench.md").is_file());
        assert_eq!(
            summary.transitions.last().map(|t| t.to),
            Some(SweepState::Done)
        );
    }

    #[tokio::test]
    async fn test_missing_report_is_export_failure() {
        let (_dir, registry, exporter) = project(&["day01"]);

        let mut runner = MockBenchRunner::new();
        runner.expect_run().times(1).returning(|spec| {
            Ok(BenchmarkReport {
                unit: spec.unit.name.clone(),
                path: spec.export_path.clone(),
                timings: Vec::new(),
            })
        });

        let sweep = Sweep::new(registry, ok_builder(), runner, exporter, protocol());
        let summary = sweep.run().await.unwrap();

        assert_eq!(summary.exit_code(), 1);
        let failures: Vec<&UnitFailure> = summary.failures().collect();
        assert!(matches!(failures[0], UnitFailure::Export { .. }));
    }

    #[test]
    fn test_summary_serializes_status_tag() {
        let summary = SweepSummary {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            build_duration_ms: 1200,
            outcomes: vec![UnitOutcome {
                unit: "day04".into(),
                status: UnitStatus::Failed {
                    failure: UnitFailure::run("day04", Some(ExecutionMode::Primary), Some(1)),
                },
            }],
            transitions: Vec::new(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["outcomes"][0]["status"], "failed");
        assert_eq!(json["outcomes"][0]["failure"]["mode"], "primary");
        assert_eq!(json["outcomes"][0]["failure"]["exit_code"], 1);
    }
}
