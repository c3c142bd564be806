//! Backend execution types and traits
//!
//! Defines the simulation backend interface shared by the statevector and
//! density-matrix engines, and the result they hand back.

use crate::mode::SimulatorMode;
use crate::stats::StatsTable;
use num_complex::Complex64;
use qexec_core::limits::DEFAULT_MAX_RETRIES;
use qexec_core::{Circuit, OutcomeKey, QexecResult};
use qexec_state::{MixedState, PureState};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// Options
// ============================================================================

/// Run options shared by every backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendOptions {
    /// Base seed; shot `i` uses `seed + i`. Drawn from entropy when `None`
    pub seed: Option<u64>,

    /// Run shots on the rayon thread pool
    pub parallel: bool,

    /// Extra attempts for a shot that hits a degenerate measurement
    pub max_retries: u32,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            seed: None,
            parallel: false,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl BackendOptions {
    /// Set base seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable or disable parallel shots
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set retry budget for degenerate shots
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

// ============================================================================
// Abort
// ============================================================================

/// Shared flag that stops a run between shots
///
/// Cloning yields a handle to the same flag. The flag stays raised until
/// [`AbortHandle::clear`] is called.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    /// New, lowered flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that running shots stop
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Lower the flag
    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Whether an abort was requested
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Final State
// ============================================================================

/// State left in the register by the last shot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FinalState {
    /// Statevector engine output
    Pure(PureState),

    /// Density-matrix engine output
    Mixed(MixedState),
}

impl FinalState {
    /// Register size
    pub fn num_qubits(&self) -> usize {
        match self {
            FinalState::Pure(s) => s.num_qubits(),
            FinalState::Mixed(s) => s.num_qubits(),
        }
    }

    /// Pure state, if any
    pub fn as_pure(&self) -> Option<&PureState> {
        match self {
            FinalState::Pure(s) => Some(s),
            FinalState::Mixed(_) => None,
        }
    }

    /// Density matrix, if any
    pub fn as_mixed(&self) -> Option<&MixedState> {
        match self {
            FinalState::Pure(_) => None,
            FinalState::Mixed(s) => Some(s),
        }
    }

    /// Amplitude list (statevector only)
    pub fn amplitudes(&self) -> Option<&[Complex64]> {
        self.as_pure().map(PureState::amplitudes)
    }

    /// Row-major matrix rows (density matrix only)
    pub fn rows(&self) -> Option<Vec<&[Complex64]>> {
        self.as_mixed().map(|s| s.rows().collect())
    }

    /// Computational-basis probabilities
    pub fn probabilities(&self) -> Vec<f64> {
        match self {
            FinalState::Pure(s) => s.probabilities(),
            FinalState::Mixed(s) => s.probabilities(),
        }
    }
}

// ============================================================================
// Execution Result
// ============================================================================

/// Result of circuit execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Measurement histogram
    pub stats: StatsTable,

    /// State after the last successful shot
    pub final_state: FinalState,

    /// Number of shots requested (after the 0 -> 1 adjustment)
    pub shots: u64,

    /// Execution metadata
    pub metadata: ExecutionMetadata,
}

/// Execution metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    /// Backend name
    pub backend: String,

    /// State representation
    pub mode: SimulatorMode,

    /// Base seed actually used
    pub seed: u64,

    /// Whether shots ran on the thread pool
    pub parallel: bool,

    /// Shots recorded in `stats`
    pub shots_completed: u64,

    /// Shots dropped after exhausting retries
    pub degenerate_shots: u64,

    /// Shots that needed at least one retry
    pub retried_shots: u64,

    /// Run stopped early by an [`AbortHandle`]
    pub aborted: bool,

    /// Wall-clock time in milliseconds
    pub execution_time_ms: Option<u64>,
}

impl ExecutionResult {
    /// Get total count (equals `shots` unless shots were dropped or aborted)
    pub fn total_counts(&self) -> u64 {
        self.stats.total()
    }

    /// Relative frequency of `key`
    pub fn probability(&self, key: &OutcomeKey) -> f64 {
        self.stats.probability(key)
    }

    /// Most frequent outcome
    pub fn most_frequent(&self) -> Option<(&OutcomeKey, u64)> {
        self.stats.most_frequent()
    }

    /// Split into the two output artifacts
    pub fn into_parts(self) -> (StatsTable, FinalState) {
        (self.stats, self.final_state)
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExecutionResult(mode={}, shots={}/{}, unique={}, degenerate={}{})",
            self.metadata.mode,
            self.metadata.shots_completed,
            self.shots,
            self.stats.len(),
            self.metadata.degenerate_shots,
            if self.metadata.aborted { ", aborted" } else { "" }
        )
    }
}

// ============================================================================
// Backend Trait
// ============================================================================

/// Simulation backend
pub trait Backend: Send + Sync {
    /// Get backend name
    fn name(&self) -> &str;

    /// State representation
    fn mode(&self) -> SimulatorMode;

    /// Largest register this backend accepts
    fn max_qubits(&self) -> usize;

    /// Flag checked between shots
    fn abort_handle(&self) -> AbortHandle;

    /// Run `shots` independent shots of `circuit` (0 is treated as 1)
    fn execute(&self, circuit: &Circuit, shots: u64) -> QexecResult<ExecutionResult>;

    /// Execute multiple circuits (batch)
    fn execute_batch(&self, circuits: &[Circuit], shots: u64) -> QexecResult<Vec<ExecutionResult>> {
        circuits.iter().map(|c| self.execute(c, shots)).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
