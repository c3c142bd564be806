//! # qexec State
//!
//! Numeric state containers for the qexec engines: a pure statevector of
//! 2^n amplitudes and a 2^n x 2^n density matrix. Both use big-endian qubit
//! ordering (qubit 0 is the most significant bit of a basis index) and share
//! one subspace kernel for gate application.
//!
//! ## Quick Start
//!
//! ```rust
//! use qexec_core::prelude::*;
//! use qexec_state::prelude::*;
//!
//! let cnot = GateOp::controlled(StandardGate::X, vec![0], vec![1]);
//!
//! // |10⟩ -> |11⟩
//! let mut psi = PureState::basis(2, 0b10).unwrap();
//! psi.apply_gate(&cnot);
//! assert!((psi.amplitude(0b11).re - 1.0).abs() < 1e-12);
//!
//! // Same evolution on the density operator
//! let mut rho = MixedState::from_pure(&PureState::basis(2, 0b10).unwrap());
//! rho.apply_gate(&cnot);
//! assert!((rho.entry(0b11, 0b11).re - 1.0).abs() < 1e-12);
//! ```

#![warn(missing_docs)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Subspace operator kernel
pub mod kernel;

/// Pure statevector
pub mod pure;

/// Density matrix
pub mod mixed;

// ============================================================================
// Re-exports
// ============================================================================

pub use kernel::apply_operator;
pub use mixed::MixedState;
pub use pure::PureState;

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! ```rust
    //! use qexec_state::prelude::*;
    //! ```

    pub use crate::mixed::MixedState;
    pub use crate::pure::PureState;
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use approx::assert_abs_diff_eq;
    use qexec_core::{CircuitBuilder, Operation};

    fn evolve(circuit: &qexec_core::Circuit) -> (PureState, MixedState) {
        let mut psi = PureState::new(circuit.num_qubits());
        let mut rho = MixedState::new(circuit.num_qubits());
        for op in circuit {
            if let Operation::Gate(gate) = op {
                psi.apply_gate(gate);
                rho.apply_gate(gate);
            }
        }
        (psi, rho)
    }

    #[test]
    fn test_long_sequence_stays_normalized() {
        let mut builder = CircuitBuilder::new(4);
        for layer in 0..20 {
            builder = builder
                .h_layer()
                .rz(layer % 4, 0.1 * layer as f64)
                .cx_chain()
                .u(3, 0.3, -0.2, 0.9);
        }
        let circuit = builder.build().unwrap();
        let (psi, rho) = evolve(&circuit);

        assert_abs_diff_eq!(psi.norm_sqr(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(rho.trace(), 1.0, epsilon = 1e-9);
        assert!(rho.is_hermitian(1e-9));
        assert_abs_diff_eq!(rho.expectation_pure(&psi), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_probabilities_agree() {
        let circuit = CircuitBuilder::new(3)
            .h(0)
            .ry(1, 0.8)
            .ccx(0, 1, 2)
            .build()
            .unwrap();
        let (psi, rho) = evolve(&circuit);

        for (a, b) in psi.probabilities().iter().zip(rho.probabilities()) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
        }
        for q in 0..3 {
            assert_abs_diff_eq!(
                psi.probability_of_one(q),
                rho.probability_of_one(q),
                epsilon = 1e-12
            );
        }
    }
}
