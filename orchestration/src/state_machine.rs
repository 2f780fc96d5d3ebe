//! Sweep state machine: explicit states and legal transition guards.
//!
//! Every sweep starts at `Init` and terminates at `Done` or `Aborted`.
//! Each transition is checked against the state graph and recorded, so a
//! finished sweep can report exactly which path it took.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// The set of sweep states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepState {
    /// Nothing has happened yet.
    Init,
    /// Reading the unit list from the manifest.
    Discovering,
    /// Running the single optimized build.
    Building,
    /// Benchmarking the unit at `unit_index`.
    Benchmarking,
    /// Every unit attempted. Terminal.
    Done,
    /// Configuration or build failure. Terminal.
    Aborted,
}

impl SweepState {
    /// Whether this is a terminal state (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl fmt::Display for SweepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "Init"),
            Self::Discovering => write!(f, "Discovering"),
            Self::Building => write!(f, "Building"),
            Self::Benchmarking => write!(f, "Benchmarking"),
            Self::Done => write!(f, "Done"),
            Self::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Legal transitions between sweep states.
///
/// ```text
/// Init → Discovering
/// Discovering → Building
/// Building → Benchmarking
/// Benchmarking → Benchmarking | Done
/// (any non-terminal) → Aborted
/// ```
fn is_legal_transition(from: SweepState, to: SweepState) -> bool {
    use SweepState::*;

    if to == Aborted && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (Init, Discovering)
            | (Discovering, Building)
            | (Building, Benchmarking)
            // Next unit
            | (Benchmarking, Benchmarking)
            | (Benchmarking, Done)
    )
}

/// A single recorded state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: SweepState,
    pub to: SweepState,
    /// Index of the unit being benchmarked after this transition, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_index: Option<usize>,
    /// Milliseconds since the state machine was created.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone)]
pub struct IllegalTransition {
    pub from: SweepState,
    pub to: SweepState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal state transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// The sweep state machine.
pub struct StateMachine {
    current: SweepState,
    unit_index: Option<usize>,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl StateMachine {
    /// Create a new state machine starting at `Init`.
    pub fn new() -> Self {
        Self {
            current: SweepState::Init,
            unit_index: None,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> SweepState {
        self.current
    }

    /// Index of the unit currently being benchmarked.
    pub fn unit_index(&self) -> Option<usize> {
        self.unit_index
    }

    /// Attempt to advance to the next state.
    pub fn advance(&mut self, to: SweepState, reason: Option<&str>) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        self.unit_index = match (self.current, to) {
            (SweepState::Benchmarking, SweepState::Benchmarking) => {
                self.unit_index.map(|i| i + 1)
            }
            (_, SweepState::Benchmarking) => Some(0),
            _ => None,
        };

        let record = TransitionRecord {
            from: self.current,
            to,
            unit_index: self.unit_index,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        };

        tracing::debug!(
            from = %self.current,
            to = %to,
            unit_index = ?self.unit_index,
            "State transition"
        );

        self.transitions.push(record);
        self.current = to;
        Ok(())
    }

    /// Transition to `Aborted` from any non-terminal state.
    pub fn abort(&mut self, reason: &str) -> Result<(), IllegalTransition> {
        self.advance(SweepState::Aborted, Some(reason))
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    /// Get the full transition log.
    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Consume the machine, keeping its log.
    pub fn into_transitions(self) -> Vec<TransitionRecord> {
        self.transitions
    }

    /// One-line history, e.g. `Init → Done (12ms, 5 transitions)`.
    pub fn summary(&self) -> String {
        format!(
            "{} → {} ({}ms, {} transitions)",
            SweepState::Init,
            self.current,
            self.created_at.elapsed().as_millis(),
            self.transitions.len(),
        )
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
