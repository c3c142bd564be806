//! Execution facade
//!
//! [`Executor`] turns a [`RunConfig`] into a backend once and runs circuits
//! against it; [`RunReport`] exposes the histogram and the final-state
//! artifact in the shape callers serialize.

use crate::config::RunConfig;
use num_complex::Complex64;
use qexec_backend::{
    create_backend, AbortHandle, Backend, ExecutionMetadata, ExecutionResult, FinalState, StatsTable,
};
use qexec_core::{Circuit, QexecError, QexecResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configured circuit runner
pub struct Executor {
    config: RunConfig,
    backend: Box<dyn Backend>,
}

impl Executor {
    /// Validate `config` and build its backend
    pub fn new(config: RunConfig) -> QexecResult<Self> {
        config.validate()?;

        let backend = create_backend(
            config.mode,
            config.to_backend_options(),
            config.effective_max_qubits(),
        );

        log::debug!("executor ready: {}", config);
        Ok(Self { config, backend })
    }

    /// Use a prepared backend (e.g. one with an initial state)
    ///
    /// The backend keeps its own seed, parallelism, retry budget and qubit
    /// cap; only `shots` is taken from `config`. Fails with
    /// [`QexecError::InvalidConfig`] if the backend runs a different mode.
    pub fn with_backend(config: RunConfig, backend: Box<dyn Backend>) -> QexecResult<Self> {
        config.validate()?;
        if backend.mode() != config.mode {
            return Err(QexecError::InvalidConfig(format!(
                "backend {} runs {} but the config selects {}",
                backend.name(),
                backend.mode(),
                config.mode
            )));
        }
        Ok(Self { config, backend })
    }

    /// Active configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Underlying backend
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Flag that stops the current and later runs between shots
    pub fn abort_handle(&self) -> AbortHandle {
        self.backend.abort_handle()
    }

    /// Execute `circuit` for the configured number of shots
    pub fn run(&self, circuit: &Circuit) -> QexecResult<RunReport> {
        let result = self.backend.execute(circuit, self.config.shots)?;
        let report = RunReport { result };
        log::info!("{}", report.summary());
        Ok(report)
    }

    /// Execute several circuits in order
    pub fn run_batch(&self, circuits: &[Circuit]) -> QexecResult<Vec<RunReport>> {
        circuits.iter().map(|c| self.run(c)).collect()
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// Outcome of one [`Executor::run`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    result: ExecutionResult,
}

impl RunReport {
    /// Measurement histogram
    pub fn stats(&self) -> &StatsTable {
        &self.result.stats
    }

    /// Final state of the last shot
    pub fn final_state(&self) -> &FinalState {
        &self.result.final_state
    }

    /// Amplitude list (statevector mode)
    pub fn amplitudes(&self) -> Option<&[Complex64]> {
        self.result.final_state.amplitudes()
    }

    /// Row-major density-matrix rows (density-matrix mode)
    pub fn state_rows(&self) -> Option<Vec<&[Complex64]>> {
        self.result.final_state.rows()
    }

    /// Run metadata
    pub fn metadata(&self) -> &ExecutionMetadata {
        &self.result.metadata
    }

    /// Shots requested (after the 0 -> 1 adjustment)
    pub fn shots(&self) -> u64 {
        self.result.shots
    }

    /// One-line description of the run
    pub fn summary(&self) -> String {
        let meta = &self.result.metadata;
        let top = self
            .result
            .most_frequent()
            .map_or_else(|| "-".to_string(), |(k, c)| format!("{}x{}", k, c));

        let mut line = format!(
            "{} {}q: {}/{} shots, {} outcomes, top {}, seed {}",
            meta.mode,
            self.result.final_state.num_qubits(),
            meta.shots_completed,
            self.result.shots,
            self.result.stats.len(),
            top,
            meta.seed
        );
        if meta.degenerate_shots > 0 {
            line.push_str(&format!(", {} degenerate", meta.degenerate_shots));
        }
        if meta.aborted {
            line.push_str(", aborted");
        }
        line
    }

    /// Underlying backend result
    pub fn into_result(self) -> ExecutionResult {
        self.result
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

// ============================================================================
// Tests
// ============================================================================
