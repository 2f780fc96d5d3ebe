//! Execution modes and per-unit command construction.
//!
//! Every unit executable understands two invocation forms: no arguments
//! (part 1 and part 2 together, the `Primary` mode) and
//! `--part2 --no-part1` (part 2 only, the `Secondary` mode).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::registry::Unit;

/// Flags passed to a unit in `Secondary` mode.
pub const SECONDARY_FLAGS: [&str; 2] = ["--part2", "--no-part1"];

/// How a unit executable is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Default invocation, no flags.
    Primary,
    /// Alternate code path selected by [`SECONDARY_FLAGS`].
    Secondary,
}

impl ExecutionMode {
    /// All modes in report order.
    pub const ALL: [ExecutionMode; 2] = [ExecutionMode::Primary, ExecutionMode::Secondary];

    /// Label suffix used to group results in reports.
    pub fn label_suffix(self) -> &'static str {
        match self {
            Self::Primary => "part 1",
            Self::Secondary => "part 2",
        }
    }

    /// Arguments appended after the executable path.
    pub fn extra_args(self) -> &'static [&'static str] {
        match self {
            Self::Primary => &[],
            Self::Secondary => &SECONDARY_FLAGS,
        }
    }

    /// Position of this mode in [`ExecutionMode::ALL`].
    pub fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "Primary"),
            Self::Secondary => write!(f, "Secondary"),
        }
    }
}

/// One labeled command handed to the benchmark runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeCommand {
    pub mode: ExecutionMode,
    /// Program followed by its arguments.
    pub argv: Vec<String>,
    /// Report label, e.g. `day07 part 2`.
    pub label: String,
}

/// Build both commands for `unit`, `Primary` first.
///
/// Pure string composition: the executable is not required to exist.
pub fn commands_for(unit: &Unit) -> [ModeCommand; 2] {
    ExecutionMode::ALL.map(|mode| command_for(unit, mode))
}

fn command_for(unit: &Unit, mode: ExecutionMode) -> ModeCommand {
    let mut argv = Vec::with_capacity(1 + mode.extra_args().len());
    argv.push(unit.executable_path.to_string_lossy().into_owned());
    argv.extend(mode.extra_args().iter().map(|arg| arg.to_string()));

    ModeCommand {
        mode,
        argv,
        label: format!("{} {}", unit.name, mode.label_suffix()),
    }
}
