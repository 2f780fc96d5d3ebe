//! Report placement: one report per unit at `<root>/<unit>/bench.<ext>`.
//!
//! The runner writes the file; the exporter decides where, makes sure the
//! directory exists beforehand, and checks the file landed afterwards.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnitFailure;
use crate::registry::Unit;

/// Report file stem inside each unit directory.
pub const REPORT_STEM: &str = "bench";

/// hyperfine export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
    Csv,
    Asciidoc,
    Orgmode,
}

impl ReportFormat {
    /// File extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Asciidoc => "adoc",
            Self::Orgmode => "org",
        }
    }

    /// hyperfine flag that writes this format.
    pub fn hyperfine_flag(self) -> &'static str {
        match self {
            Self::Markdown => "--export-markdown",
            Self::Json => "--export-json",
            Self::Csv => "--export-csv",
            Self::Asciidoc => "--export-asciidoc",
            Self::Orgmode => "--export-orgmode",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Asciidoc => "asciidoc",
            Self::Orgmode => "orgmode",
        };
        f.write_str(name)
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "asciidoc" | "adoc" => Ok(Self::Asciidoc),
            "orgmode" | "org" => Ok(Self::Orgmode),
            other => Err(format!(
                "unknown report format '{other}' (expected markdown, json, csv, asciidoc or orgmode)"
            )),
        }
    }
}

/// Decides where each unit's report goes.
pub trait ReportExporter: Send + Sync {
    /// Deterministic report location for `unit`.
    fn report_path(&self, unit: &Unit) -> PathBuf;

    /// Create the unit directory so the runner can write into it.
    fn prepare(&self, unit: &Unit) -> Result<PathBuf, UnitFailure> {
        let path = self.report_path(unit);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| UnitFailure::export(&unit.name, &path, e.to_string()))?;
        }
        Ok(path)
    }

    /// Confirm the runner actually wrote the report.
    fn verify(&self, unit: &Unit) -> Result<PathBuf, UnitFailure> {
        let path = self.report_path(unit);
        if path.is_file() {
            Ok(path)
        } else {
            Err(UnitFailure::export(
                &unit.name,
                &path,
                "runner finished but the report file is missing",
            ))
        }
    }
}

/// Writes `<root>/<unit>/bench.<ext>`.
#[derive(Debug, Clone)]
pub struct UnitScopedExporter {
    root: PathBuf,
    format: ReportFormat,
}

impl UnitScopedExporter {
    pub fn new(root: impl AsRef<Path>, format: ReportFormat) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            format,
        }
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }
}

impl ReportExporter for UnitScopedExporter {
    fn report_path(&self, unit: &Unit) -> PathBuf {
        self.root
            .join(&unit.name)
            .join(format!("{REPORT_STEM}.{}", self.format.extension()))
    }
}
