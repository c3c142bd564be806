//! Run configuration
//!
//! One serde struct describing how a circuit is executed: which state
//! representation, how many shots, seeding, parallelism and the retry
//! budget for degenerate shots.

use qexec_backend::{BackendOptions, SimulatorMode};
use qexec_core::limits::DEFAULT_MAX_RETRIES;
use qexec_core::{QexecError, QexecResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default shot count for the presets
pub const DEFAULT_SHOTS: u64 = 1024;

/// Execution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// State representation
    pub mode: SimulatorMode,

    /// Number of shots (0 is run as 1)
    pub shots: u64,

    /// Base seed for reproducible runs
    pub seed: Option<u64>,

    /// Run shots on the rayon thread pool
    pub parallel: bool,

    /// Extra attempts for a degenerate shot before it is dropped
    pub max_retries: u32,

    /// Register cap override (mode default when `None`)
    pub max_qubits: Option<usize>,
}

impl RunConfig {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Statevector run with default shots
    pub fn statevector() -> Self {
        Self {
            mode: SimulatorMode::Statevector,
            shots: DEFAULT_SHOTS,
            seed: None,
            parallel: false,
            max_retries: DEFAULT_MAX_RETRIES,
            max_qubits: None,
        }
    }

    /// Density-matrix run with default shots
    pub fn density_matrix() -> Self {
        Self {
            mode: SimulatorMode::DensityMatrix,
            ..Self::statevector()
        }
    }

    /// Preset for `mode`
    pub fn for_mode(mode: SimulatorMode) -> Self {
        match mode {
            SimulatorMode::Statevector => Self::statevector(),
            SimulatorMode::DensityMatrix => Self::density_matrix(),
        }
    }

    /// Load from JSON
    ///
    /// An unknown `mode` selector is reported as
    /// [`QexecError::InvalidSimulatorMode`]; other shape errors as
    /// [`QexecError::JsonError`].
    pub fn from_json(json: &str) -> QexecResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if let Some(mode) = value.get("mode").and_then(serde_json::Value::as_str) {
            mode.parse::<SimulatorMode>()?;
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> QexecResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // ========================================================================
    // Builder Methods
    // ========================================================================

    /// Set mode
    pub fn with_mode(mut self, mode: SimulatorMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set shots
    pub fn with_shots(mut self, shots: u64) -> Self {
        self.shots = shots;
        self
    }

    /// Set seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable parallel shots
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Override the register cap
    pub fn with_max_qubits(mut self, max_qubits: usize) -> Self {
        self.max_qubits = Some(max_qubits);
        self
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// Register cap in effect
    pub fn effective_max_qubits(&self) -> usize {
        self.max_qubits
            .unwrap_or_else(|| self.mode.default_max_qubits())
    }

    /// Options handed to the backend
    pub fn to_backend_options(&self) -> BackendOptions {
        BackendOptions {
            seed: self.seed,
            parallel: self.parallel,
            max_retries: self.max_retries,
        }
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Validate configuration
    pub fn validate(&self) -> QexecResult<()> {
        if let Some(max) = self.max_qubits {
            if max == 0 {
                return Err(QexecError::InvalidConfig("max_qubits must be >= 1".to_string()));
            }

            let ceiling = self.mode.default_max_qubits();
            if max > ceiling {
                return Err(QexecError::InvalidConfig(format!(
                    "max_qubits {} exceeds the {} ceiling of {}",
                    max,
                    self.mode.name(),
                    ceiling
                )));
            }
        }

        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::statevector()
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RunConfig(mode={}, shots={}, seed={}, parallel={})",
            self.mode,
            self.shots,
            self.seed
                .map_or_else(|| "entropy".to_string(), |s| s.to_string()),
            self.parallel
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
