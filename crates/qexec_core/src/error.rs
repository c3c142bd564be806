//! Error types for qexec
//!
//! Errors fall into three families: structural (circuit construction),
//! configuration (before any shot runs) and numeric (per shot).

// Error variant fields are self-documenting via error messages
#![allow(missing_docs)]

use thiserror::Error;

/// Main error type for qexec
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QexecError {
    // ========================================================================
    // Structural Errors
    // ========================================================================
    /// Operation references a qubit outside the register
    #[error("Qubit {qubit} out of range: circuit has {num_qubits} qubits")]
    QubitOutOfRange { qubit: usize, num_qubits: usize },

    /// Gate matrix dimension does not match 2^(target count)
    #[error("Gate matrix dimension {actual} does not match expected {expected}")]
    MatrixDimensionMismatch { expected: usize, actual: usize },

    /// Gate matrix is not square
    #[error("Gate matrix is not square: {rows}x{cols}")]
    NonSquareMatrix { rows: usize, cols: usize },

    /// Same qubit listed twice among a gate's targets and controls
    #[error("Qubit {0} appears more than once in a single gate")]
    DuplicateQubit(usize),

    /// Gate without target qubits
    #[error("Gate has no target qubits")]
    EmptyTargets,

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Register size must be at least one qubit
    #[error("Invalid qubit count {0}: must be >= 1")]
    InvalidQubitCount(usize),

    /// Unknown simulator mode selector
    #[error("Invalid simulator mode '{0}': expected 'sv' or 'dm'")]
    InvalidSimulatorMode(String),

    /// Register too large for the selected representation
    #[error("{requested} qubits exceeds the {mode} limit of {max}")]
    TooManyQubits {
        requested: usize,
        max: usize,
        mode: String,
    },

    /// Supplied initial state is unusable
    #[error("Invalid initial state: {0}")]
    InvalidInitialState(String),

    /// Run configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Numeric Errors
    // ========================================================================
    /// Sampled measurement branch carries (near-)zero probability mass
    #[error(
        "Numeric degeneracy measuring qubit {qubit}: outcome {outcome} has probability {probability:e}"
    )]
    NumericDegeneracy {
        qubit: usize,
        outcome: u8,
        probability: f64,
    },

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(String),
}

/// Result type alias for qexec operations
pub type QexecResult<T> = Result<T, QexecError>;

impl From<serde_json::Error> for QexecError {
    fn from(err: serde_json::Error) -> Self {
        QexecError::JsonError(err.to_string())
    }
}

impl QexecError {
    /// Check if error is recoverable by retrying the shot
    pub fn is_recoverable(&self) -> bool {
        matches!(self, QexecError::NumericDegeneracy { .. })
    }

    /// Check if error is a structural (circuit construction) error
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            QexecError::QubitOutOfRange { .. }
                | QexecError::MatrixDimensionMismatch { .. }
                | QexecError::NonSquareMatrix { .. }
                | QexecError::DuplicateQubit(_)
                | QexecError::EmptyTargets
        )
    }

    /// Check if error is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            QexecError::InvalidQubitCount(_)
                | QexecError::InvalidSimulatorMode(_)
                | QexecError::TooManyQubits { .. }
                | QexecError::InvalidInitialState(_)
                | QexecError::InvalidConfig(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QexecError::QubitOutOfRange {
            qubit: 10,
            num_qubits: 3,
        };
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("3"));
    }

    #[test]
    fn test_taxonomy() {
        assert!(QexecError::EmptyTargets.is_structural());
        assert!(!QexecError::EmptyTargets.is_configuration());

        assert!(QexecError::InvalidSimulatorMode("gpu".into()).is_configuration());
        assert!(QexecError::InvalidQubitCount(0).is_configuration());

        let degenerate = QexecError::NumericDegeneracy {
            qubit: 0,
            outcome: 1,
            probability: 0.0,
        };
        assert!(degenerate.is_recoverable());
        assert!(!degenerate.is_structural());
    }

    #[test]
    fn test_json_conversion() {
        let err: QexecError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, QexecError::JsonError(_)));
    }
}
