//! # qexec Backend
//!
//! Shot engines for qexec: a statevector backend and a density-matrix
//! backend behind one [`Backend`] trait, selected at runtime by
//! [`SimulatorMode`]. Each run repeats the circuit for the requested number
//! of shots, records outcome keys into a [`StatsTable`] and reports the
//! register left by the last shot.
//!
//! ## Quick Start
//!
//! ```rust
//! use qexec_backend::prelude::*;
//! use qexec_core::{CircuitBuilder, OutcomeKey};
//!
//! let backend = StatevectorBackend::new().with_seed(42);
//!
//! let circuit = CircuitBuilder::new(2)
//!     .h(0)
//!     .cnot(0, 1)
//!     .measure_all()
//!     .build()
//!     .unwrap();
//!
//! let result = backend.execute(&circuit, 1000).unwrap();
//! let p00 = result.probability(&OutcomeKey::parse("00").unwrap());
//! println!("P(00) = {:.3}", p00);
//! ```
//!
//! ## Runtime Selection
//!
//! ```rust
//! use qexec_backend::prelude::*;
//! use qexec_core::CircuitBuilder;
//!
//! let mode: SimulatorMode = "dm".parse().unwrap();
//! let backend = create_backend(mode, BackendOptions::default().with_seed(7), mode.default_max_qubits());
//!
//! let circuit = CircuitBuilder::new(1).h(0).measure(0).build().unwrap();
//! let result = backend.execute(&circuit, 100).unwrap();
//! assert!(result.final_state.as_mixed().is_some());
//! ```

#![warn(missing_docs)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Execution types and backend trait
pub mod execution;

/// Measurement statistics
pub mod stats;

/// Simulator mode selection
pub mod mode;

/// Statevector backend
pub mod statevector;

/// Density-matrix backend
pub mod density;

mod shots;

// ============================================================================
// Re-exports
// ============================================================================

pub use density::DensityMatrixBackend;
pub use execution::{AbortHandle, Backend, BackendOptions, ExecutionMetadata, ExecutionResult, FinalState};
pub use mode::{create_backend, SimulatorMode};
pub use statevector::StatevectorBackend;
pub use stats::{StatsCollector, StatsTable};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! ```rust
    //! use qexec_backend::prelude::*;
    //! ```

    pub use crate::density::DensityMatrixBackend;
    pub use crate::execution::{
        AbortHandle, Backend, BackendOptions, ExecutionMetadata, ExecutionResult, FinalState,
    };
    pub use crate::mode::{create_backend, SimulatorMode};
    pub use crate::statevector::StatevectorBackend;
    pub use crate::stats::{StatsCollector, StatsTable};
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use approx::assert_abs_diff_eq;
    use qexec_core::{Circuit, CircuitBuilder, OutcomeKey};

    fn key(s: &str) -> OutcomeKey {
        OutcomeKey::parse(s).unwrap()
    }

    fn both_backends(seed: u64) -> Vec<Box<dyn Backend>> {
        [SimulatorMode::Statevector, SimulatorMode::DensityMatrix]
            .into_iter()
            .map(|mode| {
                create_backend(
                    mode,
                    BackendOptions::default().with_seed(seed),
                    mode.default_max_qubits(),
                )
            })
            .collect()
    }

    fn unitary_circuit() -> Circuit {
        CircuitBuilder::new(3)
            .h_layer()
            .t(0)
            .cnot(0, 1)
            .ry(2, 1.1)
            .ccx(0, 1, 2)
            .u(1, 0.4, 0.2, -0.7)
            .cswap(2, 0, 1)
            .build()
            .unwrap()
    }

    #[test]
    fn test_no_measurements_single_empty_entry() {
        for backend in both_backends(42) {
            let result = backend.execute(&unitary_circuit(), 37).unwrap();
            assert_eq!(result.stats.len(), 1, "{}", backend.name());
            assert_eq!(result.stats.get(&OutcomeKey::empty()), 37);
        }
    }

    #[test]
    fn test_empty_circuit_final_state() {
        let backend = StatevectorBackend::new().with_seed(42);
        let circuit = Circuit::empty(3).unwrap();

        let (stats, state) = backend.simulate(&circuit, 5).unwrap();
        assert_eq!(stats.get(&OutcomeKey::empty()), 5);
        assert_eq!(state.amplitude(0).re, 1.0);
        assert!(state.amplitudes()[1..].iter().all(|a| a.norm_sqr() == 0.0));
    }

    #[test]
    fn test_hadamard_frequencies() {
        let circuit = CircuitBuilder::new(1).h(0).measure(0).build().unwrap();

        for backend in both_backends(42) {
            let result = backend.execute(&circuit, 10_000).unwrap();
            assert_eq!(result.total_counts(), 10_000);

            // 3σ with σ = 0.005 for p = 0.5, N = 10 000
            let p0 = result.probability(&key("0"));
            let p1 = result.probability(&key("1"));
            assert!((p0 - 0.5).abs() < 0.015, "{}: P(0) = {}", backend.name(), p0);
            assert!((p1 - 0.5).abs() < 0.015, "{}: P(1) = {}", backend.name(), p1);
        }
    }

    #[test]
    fn test_unitary_circuit_preserves_norm() {
        let backend = StatevectorBackend::new().with_seed(42);
        let (_, state) = backend.simulate(&unitary_circuit(), 1).unwrap();
        assert_abs_diff_eq!(state.norm_sqr(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_density_trace_and_hermiticity() {
        let circuit = CircuitBuilder::new(3)
            .h(0)
            .cx_chain()
            .measure(1)
            .ry(0, 0.3)
            .reset(2)
            .crz(0, 2, 0.9)
            .measure(0)
            .build()
            .unwrap();

        let backend = DensityMatrixBackend::new();
        for seed in 0..20 {
            let (_, rho) = backend.clone().with_seed(seed).simulate(&circuit, 1).unwrap();
            assert_abs_diff_eq!(rho.trace(), 1.0, epsilon = 1e-9);
            assert!(rho.is_hermitian(1e-9));
        }
    }

    #[test]
    fn test_gate_inverse_round_trip() {
        let backend = StatevectorBackend::new().with_seed(42);
        let prepared = CircuitBuilder::new(2).ry(0, 0.7).cnot(0, 1).build().unwrap();
        let round_trip = CircuitBuilder::new(2)
            .ry(0, 0.7)
            .cnot(0, 1)
            .h(1)
            .h(1)
            .build()
            .unwrap();

        let (_, before) = backend.simulate(&prepared, 1).unwrap();
        let (_, after) = backend.simulate(&round_trip, 1).unwrap();
        for (a, b) in before.amplitudes().iter().zip(after.amplitudes()) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cnot_on_basis_states() {
        let from_10 = CircuitBuilder::new(2).x(0).cnot(0, 1).build().unwrap();
        let from_00 = CircuitBuilder::new(2).cnot(0, 1).build().unwrap();
        let backend = StatevectorBackend::new().with_seed(42);

        let (_, state) = backend.simulate(&from_10, 1).unwrap();
        assert_abs_diff_eq!(state.amplitude(0b11).re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(state.amplitude(0b10).norm(), 0.0, epsilon = 1e-12);

        let (_, state) = backend.simulate(&from_00, 1).unwrap();
        assert_abs_diff_eq!(state.amplitude(0b00).re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(state.amplitude(0b01).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_shots_runs_once() {
        let circuit = CircuitBuilder::new(1).x(0).measure(0).build().unwrap();
        for backend in both_backends(42) {
            let result = backend.execute(&circuit, 0).unwrap();
            assert_eq!(result.shots, 1);
            assert_eq!(result.stats.get(&key("1")), 1);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let circuit = CircuitBuilder::new(3).h_layer().cx_chain().measure_all().build().unwrap();

        let seq = StatevectorBackend::new().with_seed(11).execute(&circuit, 2000).unwrap();
        let par = StatevectorBackend::new()
            .with_seed(11)
            .with_parallel(true)
            .execute(&circuit, 2000)
            .unwrap();

        assert_eq!(seq.stats, par.stats);
        assert_eq!(seq.final_state, par.final_state);
        assert!(par.metadata.parallel);

        let seq = DensityMatrixBackend::new().with_seed(11).simulate(&circuit, 200).unwrap();
        let par = DensityMatrixBackend::new()
            .with_seed(11)
            .with_parallel(true)
            .simulate(&circuit, 200)
            .unwrap();
        assert_eq!(seq.0, par.0);
    }

    #[test]
    fn test_abort_between_shots() {
        let backend = StatevectorBackend::new().with_seed(42);
        let circuit = CircuitBuilder::new(1).h(0).measure(0).build().unwrap();

        backend.abort_handle().abort();
        let result = backend.execute(&circuit, 100).unwrap();
        assert!(result.metadata.aborted);
        assert_eq!(result.metadata.shots_completed, 0);
        assert!(result.stats.is_empty());

        backend.abort_handle().clear();
        let result = backend.execute(&circuit, 100).unwrap();
        assert!(!result.metadata.aborted);
        assert_eq!(result.metadata.shots_completed, 100);
    }

    #[test]
    fn test_batch_execution() {
        let mode = SimulatorMode::Statevector;
        let backend = create_backend(mode, BackendOptions::default().with_seed(42), mode.default_max_qubits());

        let circuits: Vec<_> = (0..5)
            .map(|i| {
                CircuitBuilder::new(2)
                    .h(0)
                    .rz(0, i as f64 * 0.2)
                    .measure_all()
                    .build()
                    .unwrap()
            })
            .collect();

        let results = backend.execute_batch(&circuits, 100).unwrap();
        assert_eq!(results.len(), 5);
        for result in &results {
            assert_eq!(result.shots, 100);
            assert_eq!(result.total_counts(), 100);
        }
    }

    #[test]
    fn test_engines_agree_on_distribution() {
        let circuit = CircuitBuilder::new(2).ry(0, 1.2).cnot(0, 1).measure_all().build().unwrap();

        let sv = StatevectorBackend::new().with_seed(5).execute(&circuit, 4000).unwrap();
        let dm = DensityMatrixBackend::new().with_seed(5).execute(&circuit, 4000).unwrap();

        // P(11) = sin²(0.6) ≈ 0.3188
        let expected = 0.6f64.sin().powi(2);
        for result in [&sv, &dm] {
            let p11 = result.probability(&key("11"));
            assert!((p11 - expected).abs() < 0.04, "{}: P(11) = {}", result.metadata.backend, p11);
        }
    }
}
