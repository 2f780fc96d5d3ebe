//! Console and JSON rendering of a finished sweep.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use orchestration::{ExecutionMode, SweepSummary, UnitStatus};

/// Human-readable duration for a timing given in seconds.
fn format_seconds(secs: f64) -> String {
    if secs >= 1.0 {
        format!("{secs:.3} s")
    } else if secs >= 1e-3 {
        format!("{:.2} ms", secs * 1e3)
    } else {
        format!("{:.1} µs", secs * 1e6)
    }
}

/// Render the per-unit table printed after the sweep.
pub fn render(summary: &SweepSummary) -> String {
    let width = summary
        .outcomes
        .iter()
        .map(|o| o.unit.len())
        .max()
        .unwrap_or(0)
        .max("unit".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n{:<width$}  {:>12}  {:>12}  status",
        "unit", "part 1", "part 2"
    );
    for outcome in &summary.outcomes {
        let (part1, part2, status) = match &outcome.status {
            UnitStatus::Succeeded { report } => {
                let mean = |mode| {
                    report
                        .timing(mode)
                        .map(|t| format_seconds(t.mean))
                        .unwrap_or_else(|| "-".to_string())
                };
                (
                    mean(ExecutionMode::Primary),
                    mean(ExecutionMode::Secondary),
                    format!("ok ({})", report.path.display()),
                )
            }
            UnitStatus::Failed { failure } => {
                ("-".to_string(), "-".to_string(), format!("FAILED: {failure}"))
            }
        };
        let _ = writeln!(
            out,
            "{:<width$}  {:>12}  {:>12}  {}",
            outcome.unit, part1, part2, status
        );
    }

    let elapsed = summary.finished_at - summary.started_at;
    let _ = writeln!(
        out,
        "\n{} of {} units benchmarked (build {:.1}s, total {:.1}s, finished {})",
        summary.succeeded_count(),
        summary.outcomes.len(),
        summary.build_duration_ms as f64 / 1000.0,
        elapsed.num_milliseconds() as f64 / 1000.0,
        summary.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );
    out
}

/// Write the summary as pretty JSON, creating parent directories.
pub fn write_json(summary: &SweepSummary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
