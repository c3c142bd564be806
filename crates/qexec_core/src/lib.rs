//! # qexec Core
//!
//! Circuit model for the qexec execution engine: register size, ordered gate
//! and measurement operations, the standard gate library and the error
//! taxonomy shared by every crate.
//!
//! ## Quick Start
//!
//! ```rust
//! use qexec_core::prelude::*;
//!
//! let circuit = CircuitBuilder::new(3)
//!     .h(0)
//!     .cnot(0, 1)
//!     .cnot(1, 2)
//!     .measure_all()
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 3);
//! assert_eq!(circuit.measurement_count(), 3);
//! println!("{}", circuit);
//! ```
//!
//! ## Custom Unitaries
//!
//! ```rust
//! use qexec_core::prelude::*;
//!
//! // A 2x2 matrix on two targets is a structural error
//! let result = CircuitBuilder::new(2)
//!     .unitary("bad", GateMatrix::identity(2), &[0, 1])
//!     .build();
//! assert!(result.unwrap_err().is_structural());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Core types
pub mod types;

/// Constants
pub mod constants;

/// Error types
pub mod error;

/// Gate library and gate operations
pub mod gate;

/// Circuit structure
pub mod circuit;

/// Circuit builder
pub mod builder;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::CircuitBuilder;
pub use circuit::{Circuit, MeasureTarget, Operation};
pub use constants::{limits, numerics};
pub use error::{QexecError, QexecResult};
pub use gate::{GateKind, GateMatrix, GateOp, StandardGate};
pub use types::{Amplitude, Angle, OutcomeKey, QubitId};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports for common use cases
    //!
    //! ```rust
    //! use qexec_core::prelude::*;
    //! ```

    pub use crate::builder::CircuitBuilder;
    pub use crate::circuit::{Circuit, MeasureTarget, Operation};
    pub use crate::constants::{limits, numerics};
    pub use crate::error::{QexecError, QexecResult};
    pub use crate::gate::{GateKind, GateMatrix, GateOp, StandardGate};
    pub use crate::types::{Amplitude, Angle, OutcomeKey, QubitId};
}

// ============================================================================
// Version Information
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

// ============================================================================
// Integration Tests
// ============================================================================
