//! Simulator mode selection

use crate::density::DensityMatrixBackend;
use crate::execution::{Backend, BackendOptions};
use crate::statevector::StatevectorBackend;
use qexec_core::limits::{MAX_DENSITY_QUBITS, MAX_STATEVECTOR_QUBITS};
use qexec_core::QexecError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// State representation used by a run
///
/// Serializes as the short selector; deserializes through [`FromStr`], so an
/// unknown selector is an [`QexecError::InvalidSimulatorMode`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum SimulatorMode {
    /// Pure statevector, 2^n amplitudes
    #[default]
    #[serde(rename = "sv")]
    Statevector,

    /// Density matrix, 2^n x 2^n entries
    #[serde(rename = "dm")]
    DensityMatrix,
}

impl SimulatorMode {
    /// Short selector ("sv" / "dm")
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulatorMode::Statevector => "sv",
            SimulatorMode::DensityMatrix => "dm",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            SimulatorMode::Statevector => "statevector",
            SimulatorMode::DensityMatrix => "density_matrix",
        }
    }

    /// Default register cap for this representation
    pub fn default_max_qubits(&self) -> usize {
        match self {
            SimulatorMode::Statevector => MAX_STATEVECTOR_QUBITS,
            SimulatorMode::DensityMatrix => MAX_DENSITY_QUBITS,
        }
    }
}

impl FromStr for SimulatorMode {
    type Err = QexecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sv" | "statevector" => Ok(SimulatorMode::Statevector),
            "dm" | "density" | "density_matrix" => Ok(SimulatorMode::DensityMatrix),
            _ => Err(QexecError::InvalidSimulatorMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for SimulatorMode {
    type Error = QexecError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for SimulatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Build the backend for `mode` with a register cap of `max_qubits`
pub fn create_backend(
    mode: SimulatorMode,
    options: BackendOptions,
    max_qubits: usize,
) -> Box<dyn Backend> {
    match mode {
        SimulatorMode::Statevector => Box::new(
            StatevectorBackend::new()
                .with_options(options)
                .with_max_qubits(max_qubits),
        ),
        SimulatorMode::DensityMatrix => Box::new(
            DensityMatrixBackend::new()
                .with_options(options)
                .with_max_qubits(max_qubits),
        ),
    }
}

// ============================================================================
// Tests
// ============================================================================
