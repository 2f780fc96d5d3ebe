//! bench-sweep: build every day of the workspace in release mode and
//! benchmark part 1 and part 2 of each with hyperfine.
//!
//! # Usage
//!
//! ```bash
//! # Benchmark every workspace member, reports in <day>/bench.md
//! bench-sweep
//!
//! # Only the day crates, JSON reports, more samples
//! bench-sweep --filter '^day\d+$' --format json --min-runs 50
//!
//! # Show what would be benchmarked
//! bench-sweep --list
//! ```

mod summary;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use orchestration::{
    CargoBuilder, HyperfineRunner, ReportFormat, Sweep, SweepConfig, SweepError, UnitRegistry,
    UnitScopedExporter,
};
use tracing::{error, info};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Workspace root (overrides BENCH_SWEEP_PROJECT_ROOT)
    #[arg(long)]
    project_root: Option<PathBuf>,

    /// Workspace manifest, relative to the project root (overrides BENCH_SWEEP_MANIFEST)
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Cargo target directory (overrides BENCH_SWEEP_TARGET_DIR / CARGO_TARGET_DIR)
    #[arg(long)]
    target_dir: Option<PathBuf>,

    /// Cargo profile for the optimized build (overrides BENCH_SWEEP_PROFILE)
    #[arg(long)]
    profile: Option<String>,

    /// Directory that receives <unit>/bench.<ext> (overrides BENCH_SWEEP_REPORT_DIR)
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Report format: markdown, json, csv, asciidoc, orgmode (overrides BENCH_SWEEP_FORMAT)
    #[arg(long)]
    format: Option<ReportFormat>,

    /// Warm-up runs per command (overrides BENCH_SWEEP_WARMUP)
    #[arg(long)]
    warmup: Option<u32>,

    /// Minimum measured runs per command (overrides BENCH_SWEEP_MIN_RUNS)
    #[arg(long)]
    min_runs: Option<u32>,

    /// Regex selecting which members to benchmark (overrides BENCH_SWEEP_FILTER)
    #[arg(long)]
    filter: Option<String>,

    /// Cargo executable (overrides BENCH_SWEEP_CARGO)
    #[arg(long)]
    cargo: Option<String>,

    /// hyperfine executable (overrides BENCH_SWEEP_HYPERFINE)
    #[arg(long)]
    hyperfine: Option<String>,

    /// Also write the sweep summary as JSON to this path
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// List the units that would be benchmarked and exit
    #[arg(long, default_value_t = false)]
    list: bool,
}

impl Args {
    /// Layer CLI flags over the environment-derived config
    fn apply(&self, config: &mut SweepConfig) {
        if let Some(root) = &self.project_root {
            config.project_root = root.clone();
        }
        if let Some(manifest) = &self.manifest {
            config.manifest_path = manifest.clone();
        }
        if let Some(dir) = &self.target_dir {
            config.target_dir = dir.clone();
        }
        if let Some(profile) = &self.profile {
            config.profile = profile.clone();
        }
        if let Some(dir) = &self.report_dir {
            config.report_root = dir.clone();
        }
        if let Some(format) = self.format {
            config.report_format = format;
        }
        if let Some(warmup) = self.warmup {
            config.warmup = warmup;
        }
        if let Some(min_runs) = self.min_runs {
            config.min_runs = min_runs;
        }
        if let Some(filter) = &self.filter {
            config.unit_filter = Some(filter.clone());
        }
        if let Some(cargo) = &self.cargo {
            config.cargo_program = cargo.clone();
        }
        if let Some(hyperfine) = &self.hyperfine {
            config.hyperfine_program = hyperfine.clone();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let mut config = SweepConfig::from_env();
    args.apply(&mut config);
    config.project_root = std::fs::canonicalize(&config.project_root).with_context(|| {
        format!(
            "Project root {} is not accessible",
            config.project_root.display()
        )
    })?;
    config.resolve_paths();

    info!(
        root = %config.project_root.display(),
        profile = %config.profile,
        format = %config.report_format,
        "bench-sweep starting"
    );

    let registry = match UnitRegistry::from_config(&config) {
        Ok(registry) => registry,
        Err(e) => return Ok(report_fatal(&SweepError::from(e))),
    };

    if args.list {
        return match registry.list_units() {
            Ok(units) => {
                for unit in &units {
                    println!("{}\t{}", unit.name, unit.executable_path.display());
                }
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => Ok(report_fatal(&SweepError::from(e))),
        };
    }

    let sweep = Sweep::new(
        registry,
        CargoBuilder::from_config(&config),
        HyperfineRunner::new(config.hyperfine_program.clone()),
        UnitScopedExporter::new(&config.report_root, config.report_format),
        config.protocol(),
    );

    let summary = match sweep.run().await {
        Ok(summary) => summary,
        Err(e) => return Ok(report_fatal(&e)),
    };

    print!("{}", summary::render(&summary));

    if let Some(path) = &args.summary_json {
        summary::write_json(&summary, path)?;
        info!(path = %path.display(), "Wrote sweep summary");
    }

    Ok(if summary.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Surface a fatal error, including the failing tool's output verbatim.
fn report_fatal(err: &SweepError) -> ExitCode {
    if let Some(output) = err.tool_output() {
        eprint!("{output}");
        if !output.ends_with('\n') {
            eprintln!();
        }
    }
    error!("{err}");
    if let SweepError::Configuration(config_err) = err {
        info!("{}", config_err.recovery_suggestion());
    }
    ExitCode::FAILURE
}
