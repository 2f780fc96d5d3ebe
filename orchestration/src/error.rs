//! Sweep error types
//!
//! Two fatal classes abort the whole sweep: [`ConfigurationError`] (nothing to
//! benchmark) and [`BuildFailure`] (nothing trustworthy to benchmark).
//! [`UnitFailure`] is recorded against a single unit and the sweep moves on.

use crate::modes::ExecutionMode;
use crate::state_machine::IllegalTransition;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fatal sweep operations
pub type SweepResult<T> = Result<T, SweepError>;

/// The workspace manifest cannot produce a usable unit list.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// Manifest file does not exist
    #[error("Workspace manifest not found at {path}")]
    ManifestNotFound { path: PathBuf },

    /// Manifest exists but could not be read
    #[error("Failed to read workspace manifest {path}: {source}")]
    ManifestUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest is not valid TOML or lacks the member list
    #[error("Malformed workspace manifest {path}: {message}")]
    MalformedManifest { path: PathBuf, message: String },

    /// Zero units survived exclusion and filtering
    #[error("Workspace manifest {path} declares no benchmarkable units")]
    NoUnits { path: PathBuf },

    /// A member cannot be used as a build target or path segment
    #[error("Invalid unit name '{name}': {reason}")]
    InvalidUnitName { name: String, reason: String },

    /// Two members resolve to the same unit name
    #[error("Unit '{name}' is declared more than once")]
    DuplicateUnit { name: String },

    /// The unit filter is not a valid regular expression
    #[error("Invalid unit filter '{pattern}': {message}")]
    InvalidFilter { pattern: String, message: String },
}

impl ConfigurationError {
    /// Create a malformed manifest error
    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::MalformedManifest {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid unit name error
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUnitName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Get recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ManifestNotFound { .. } => {
                "Pass --project-root (or --manifest) pointing at the workspace Cargo.toml."
            }
            Self::ManifestUnreadable { .. } => "Check file permissions on the workspace Cargo.toml.",
            Self::MalformedManifest { .. } => {
                "The manifest needs a [workspace] table with an explicit `members` array."
            }
            Self::NoUnits { .. } => {
                "Add day crates to [workspace] members, or loosen --filter / `exclude`."
            }
            Self::InvalidUnitName { .. } => {
                "Unit names may only contain ASCII letters, digits, '-' and '_'."
            }
            Self::DuplicateUnit { .. } => "Remove the duplicate entry from [workspace] members.",
            Self::InvalidFilter { .. } => "Fix the --filter regular expression.",
        }
    }
}

/// The single optimized build exited non-zero or could not be started.
///
/// Carries the builder's stderr verbatim so the operator sees exactly what
/// cargo reported.
#[derive(Debug, Clone)]
pub struct BuildFailure {
    /// Builder program that was invoked
    pub program: String,
    /// Exit code if the process ran to completion
    pub exit_code: Option<i32>,
    /// Captured stderr (or the spawn error)
    pub stderr: String,
}

impl BuildFailure {
    /// Create a failure for a builder process that could not be started
    pub fn spawn(program: impl Into<String>, error: &std::io::Error) -> Self {
        let program = program.into();
        Self {
            stderr: format!("Failed to run {program}: {error}"),
            program,
            exit_code: None,
        }
    }
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "Build failed: `{}` exited with code {code}", self.program),
            None => write!(f, "Build failed: `{}` did not complete", self.program),
        }
    }
}

impl std::error::Error for BuildFailure {}

/// A failure confined to one unit. Logged, recorded, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitFailure {
    /// A unit executable exited non-zero during measurement.
    ///
    /// `mode` and `exit_code` are `None` when hyperfine's output did not
    /// allow attributing the failure.
    Run {
        unit: String,
        mode: Option<ExecutionMode>,
        exit_code: Option<i32>,
    },
    /// Measurement may have succeeded but the report file is missing
    Export {
        unit: String,
        path: PathBuf,
        message: String,
    },
    /// The benchmark runner itself could not be started
    Runner { unit: String, message: String },
}

impl UnitFailure {
    /// Create a run failure
    pub fn run(
        unit: impl Into<String>,
        mode: Option<ExecutionMode>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::Run {
            unit: unit.into(),
            mode,
            exit_code,
        }
    }

    /// Create an export failure
    pub fn export(
        unit: impl Into<String>,
        path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self::Export {
            unit: unit.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Name of the unit this failure belongs to
    pub fn unit(&self) -> &str {
        match self {
            Self::Run { unit, .. } | Self::Export { unit, .. } | Self::Runner { unit, .. } => unit,
        }
    }
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run {
                unit,
                mode,
                exit_code,
            } => {
                write!(f, "{unit}: ")?;
                match mode {
                    Some(mode) => write!(f, "{} ", mode.label_suffix())?,
                    None => write!(f, "benchmark ")?,
                }
                match exit_code {
                    Some(code) => write!(f, "exited with code {code}"),
                    None => write!(f, "failed"),
                }
            }
            Self::Export {
                unit,
                path,
                message,
            } => write!(f, "{unit}: report {} not written: {message}", path.display()),
            Self::Runner { unit, message } => write!(f, "{unit}: runner unavailable: {message}"),
        }
    }
}

impl std::error::Error for UnitFailure {}

/// Fatal errors that terminate the sweep before or during setup.
#[derive(Error, Debug)]
pub enum SweepError {
    /// Unit discovery failed
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The optimized build failed
    #[error(transparent)]
    Build(#[from] BuildFailure),

    /// Orchestrator attempted an illegal state transition
    #[error(transparent)]
    State(#[from] IllegalTransition),
}

impl SweepError {
    /// Diagnostic output from the failing external tool, if any
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            Self::Build(failure) if !failure.stderr.is_empty() => Some(&failure.stderr),
            _ => None,
        }
    }
}
