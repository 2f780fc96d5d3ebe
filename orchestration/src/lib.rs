//! Benchmark sweep orchestration for multi-day Cargo workspaces
//!
//! This library provides:
//! - Unit discovery from the workspace manifest (`registry`)
//! - A single optimized `cargo build` for every unit (`builder`)
//! - Per-unit part 1 / part 2 command construction (`modes`)
//! - hyperfine invocation with a fixed protocol (`runner`)
//! - Per-unit report placement (`exporter`)
//! - The orchestrating loop and its state machine (`sweep`, `state_machine`)
//!
//! # Usage
//!
//! ```rust,ignore
//! use orchestration::{CargoBuilder, HyperfineRunner, Sweep, SweepConfig, UnitRegistry, UnitScopedExporter};
//!
//! let mut config = SweepConfig::from_env();
//! config.resolve_paths();
//!
//! let sweep = Sweep::new(
//!     UnitRegistry::from_config(&config)?,
//!     CargoBuilder::from_config(&config),
//!     HyperfineRunner::new(&config.hyperfine_program),
//!     UnitScopedExporter::new(&config.report_root, config.report_format),
//!     config.protocol(),
//! );
//! let summary = sweep.run().await?;
//! std::process::exit(summary.exit_code());
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod builder;
pub mod config;
pub mod error;
pub mod exporter;
pub mod modes;
pub mod registry;
pub mod runner;
pub mod state_machine;
pub mod sweep;

pub use builder::{BuildOutput, Builder, CargoBuilder};
pub use config::SweepConfig;
pub use error::{BuildFailure, ConfigurationError, SweepError, SweepResult, UnitFailure};
pub use exporter::{ReportExporter, ReportFormat, UnitScopedExporter};
pub use modes::{commands_for, ExecutionMode, ModeCommand};
pub use registry::{Unit, UnitRegistry};
pub use runner::{
    BenchRunner, BenchmarkProtocol, BenchmarkReport, BenchmarkSpec, HyperfineRunner, ModeTiming,
    OutputStyle,
};
pub use state_machine::{StateMachine, SweepState, TransitionRecord};
pub use sweep::{Sweep, SweepSummary, UnitOutcome, UnitStatus};
