//! # qexec Engine
//!
//! Configuration and execution facade for qexec. A [`RunConfig`] selects the
//! state representation and shot policy; an [`Executor`] builds the matching
//! backend once and runs circuits, returning a [`RunReport`] with the
//! outcome histogram and the final-state artifact.
//!
//! ## Quick Start
//!
//! ```rust
//! use qexec_engine::prelude::*;
//! use qexec_core::CircuitBuilder;
//!
//! let executor = Executor::new(RunConfig::statevector().with_shots(500).with_seed(42)).unwrap();
//!
//! let circuit = CircuitBuilder::new(2)
//!     .h(0)
//!     .cnot(0, 1)
//!     .measure_all()
//!     .build()
//!     .unwrap();
//!
//! let report = executor.run(&circuit).unwrap();
//! println!("{}", report.summary());
//! print!("{}", report.stats());
//! ```
//!
//! ## Density-Matrix Mode
//!
//! ```rust
//! use qexec_engine::prelude::*;
//! use qexec_core::CircuitBuilder;
//!
//! let config = RunConfig::from_json(r#"{"mode": "dm", "shots": 100, "seed": 7}"#).unwrap();
//! let executor = Executor::new(config).unwrap();
//!
//! let circuit = CircuitBuilder::new(1).h(0).build().unwrap();
//! let report = executor.run(&circuit).unwrap();
//!
//! for row in report.state_rows().unwrap() {
//!     println!("{:?}", row);
//! }
//! ```

#![warn(missing_docs)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Run configuration
pub mod config;

/// Executor and run report
pub mod executor;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{RunConfig, DEFAULT_SHOTS};
pub use executor::{Executor, RunReport};

pub use qexec_backend::{AbortHandle, ExecutionMetadata, FinalState, SimulatorMode, StatsTable};

// ============================================================================
// Prelude
// ============================================================================

/// Convenient imports for common use cases
pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! ```rust
    //! use qexec_engine::prelude::*;
    //! ```

    pub use crate::config::RunConfig;
    pub use crate::executor::{Executor, RunReport};
    pub use qexec_backend::{AbortHandle, FinalState, SimulatorMode, StatsTable};
}

// ============================================================================
// Version Information
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use approx::assert_abs_diff_eq;
    use qexec_core::{Circuit, CircuitBuilder, OutcomeKey};

    fn teleport() -> Circuit {
        // Teleport Ry(0.9)|0⟩ from qubit 0 to qubit 2 with deferred correction
        CircuitBuilder::new(3)
            .ry(0, 0.9)
            .h(1)
            .cnot(1, 2)
            .cnot(0, 1)
            .h(0)
            .cnot(1, 2)
            .cz(0, 2)
            .measure(0)
            .measure(1)
            .build()
            .unwrap()
    }

    #[test]
    fn test_same_circuit_both_modes() {
        let circuit = teleport();
        let expected_p1 = 0.45f64.sin().powi(2);

        for mode in [SimulatorMode::Statevector, SimulatorMode::DensityMatrix] {
            let executor = Executor::new(RunConfig::for_mode(mode).with_shots(20).with_seed(3)).unwrap();
            let report = executor.run(&circuit).unwrap();

            assert_eq!(report.stats().total(), 20);
            assert!(report.stats().iter().all(|(k, _)| k.len() == 2));

            let probs = report.final_state().probabilities();
            let p1: f64 = probs.iter().enumerate().filter(|(i, _)| i & 1 == 1).map(|(_, p)| p).sum();
            assert_abs_diff_eq!(p1, expected_p1, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_teleport_outcomes_uniform() {
        let executor =
            Executor::new(RunConfig::statevector().with_shots(8000).with_seed(99).with_parallel(true)).unwrap();
        let report = executor.run(&teleport()).unwrap();

        assert_eq!(report.stats().len(), 4);
        for bits in ["00", "01", "10", "11"] {
            let p = report.stats().probability(&OutcomeKey::parse(bits).unwrap());
            assert!((p - 0.25).abs() < 0.03, "P({}) = {}", bits, p);
        }
    }

    #[test]
    fn test_reproducible_reports() {
        let config = RunConfig::density_matrix().with_shots(64).with_seed(5);
        let circuit = CircuitBuilder::new(2).h_layer().measure_all().build().unwrap();

        let a = Executor::new(config.clone()).unwrap().run(&circuit).unwrap();
        let b = Executor::new(config).unwrap().run(&circuit).unwrap();
        assert_eq!(a.stats(), b.stats());
        assert_eq!(a.final_state(), b.final_state());
    }

    #[test]
    fn test_report_json() {
        let executor = Executor::new(RunConfig::statevector().with_shots(4).with_seed(1)).unwrap();
        let circuit = CircuitBuilder::new(1).x(0).measure(0).build().unwrap();

        let report = executor.run(&circuit).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["result"]["stats"]["1"], 4);
        assert_eq!(json["result"]["metadata"]["mode"], "sv");
    }
}
